//! Bakery fixture shared by the infra tests.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use bakeplan_catalog::{
    Assembly, Composition, FinishedUnit, Ingredient, PackagingLine, Recipe, RecipeLine,
};
use bakeplan_core::{AssemblyId, FinishedUnitId, IngredientId, MeasureUnit, RecipeId};
use bakeplan_inventory::{LotLedger, Purchase};

use crate::store::{InMemoryStore, UnitOfWork};

/// A small bakery.
///
/// Stock on hand:
/// - flour (g): 1000 @ 0.002 bought Jan 1, then 5000 @ 0.003 bought Feb 1
/// - sugar (kg): 2 @ 1.50
/// - butter (g): 5000 @ 0.01
/// - milk (L): 3 @ 1.20
/// - boxes (each): 10 @ 0.75
/// - ribbon (each): 5 @ 0.20
///
/// Cookie batch (24 items): 250 g flour, 100 g sugar, 125 g butter.
/// Brownie batch (16 items): 150 g flour, 100 g butter, 250 ml milk.
/// Gift box: 6 cookies + 4 brownies, one box.
/// Party tray: 2 gift boxes + 12 cookies, two ribbons.
pub(crate) struct Bakery {
    pub store: Arc<InMemoryStore>,
    pub flour: IngredientId,
    pub sugar: IngredientId,
    pub butter: IngredientId,
    pub milk: IngredientId,
    pub boxes: IngredientId,
    pub ribbon: IngredientId,
    pub cookie_recipe: RecipeId,
    pub brownie_recipe: RecipeId,
    pub cookie: FinishedUnitId,
    pub brownie: FinishedUnitId,
    pub gift_box: AssemblyId,
    pub party_tray: AssemblyId,
}

pub(crate) fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

fn ingredient(uow: &mut UnitOfWork<'_>, name: &str, unit: MeasureUnit) -> IngredientId {
    let id = IngredientId::new();
    uow.catalog_mut()
        .add_ingredient(Ingredient::new(id, name, "baking", unit).unwrap())
        .unwrap();
    id
}

pub(crate) fn buy(
    uow: &mut UnitOfWork<'_>,
    ingredient_id: IngredientId,
    purchase_date: NaiveDate,
    quantity: Decimal,
    cost_per_unit: Decimal,
) {
    uow.record_purchase(Purchase {
        ingredient_id,
        purchase_date,
        quantity,
        cost_per_unit,
        supplier: None,
    })
    .unwrap();
}

fn line(ingredient_id: IngredientId, quantity: Decimal, unit: MeasureUnit) -> RecipeLine {
    RecipeLine {
        ingredient_id,
        quantity,
        unit,
    }
}

impl Bakery {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let mut uow = store.begin().unwrap();

        let flour = ingredient(&mut uow, "Flour", MeasureUnit::Gram);
        let sugar = ingredient(&mut uow, "Sugar", MeasureUnit::Kilogram);
        let butter = ingredient(&mut uow, "Butter", MeasureUnit::Gram);
        let milk = ingredient(&mut uow, "Milk", MeasureUnit::Liter);
        let boxes = ingredient(&mut uow, "Gift box", MeasureUnit::Each);
        let ribbon = ingredient(&mut uow, "Ribbon", MeasureUnit::Each);

        buy(&mut uow, flour, date(1, 1), dec!(1000), dec!(0.002));
        buy(&mut uow, flour, date(2, 1), dec!(5000), dec!(0.003));
        buy(&mut uow, sugar, date(1, 15), dec!(2), dec!(1.50));
        buy(&mut uow, butter, date(1, 20), dec!(5000), dec!(0.01));
        buy(&mut uow, milk, date(3, 1), dec!(3), dec!(1.20));
        buy(&mut uow, boxes, date(1, 5), dec!(10), dec!(0.75));
        buy(&mut uow, ribbon, date(1, 5), dec!(5), dec!(0.20));

        let cookie_recipe = RecipeId::new();
        let brownie_recipe = RecipeId::new();
        let catalog = uow.catalog_mut();
        catalog
            .add_recipe(
                Recipe::new(
                    cookie_recipe,
                    "Sugar cookies",
                    vec![
                        line(flour, dec!(250), MeasureUnit::Gram),
                        line(sugar, dec!(100), MeasureUnit::Gram),
                        line(butter, dec!(125), MeasureUnit::Gram),
                    ],
                )
                .unwrap(),
            )
            .unwrap();
        catalog
            .add_recipe(
                Recipe::new(
                    brownie_recipe,
                    "Brownies",
                    vec![
                        line(flour, dec!(150), MeasureUnit::Gram),
                        line(butter, dec!(100), MeasureUnit::Gram),
                        line(milk, dec!(250), MeasureUnit::Milliliter),
                    ],
                )
                .unwrap(),
            )
            .unwrap();

        let cookie = FinishedUnitId::new();
        let brownie = FinishedUnitId::new();
        catalog
            .add_finished_unit(FinishedUnit::new(cookie, "Cookie", cookie_recipe, 24).unwrap())
            .unwrap();
        catalog
            .add_finished_unit(
                FinishedUnit::new(brownie, "Brownie", brownie_recipe, 16).unwrap(),
            )
            .unwrap();

        let gift_box = AssemblyId::new();
        let party_tray = AssemblyId::new();
        catalog
            .add_assembly(
                Assembly::new(gift_box, "Gift box")
                    .unwrap()
                    .with_packaging(PackagingLine {
                        ingredient_id: boxes,
                        quantity: dec!(1),
                        unit: MeasureUnit::Each,
                    })
                    .unwrap(),
            )
            .unwrap();
        catalog
            .add_assembly(
                Assembly::new(party_tray, "Party tray")
                    .unwrap()
                    .with_packaging(PackagingLine {
                        ingredient_id: ribbon,
                        quantity: dec!(2),
                        unit: MeasureUnit::Each,
                    })
                    .unwrap(),
            )
            .unwrap();
        for composition in [
            Composition::new(gift_box, cookie, dec!(6)),
            Composition::new(gift_box, brownie, dec!(4)),
            Composition::new(party_tray, gift_box, dec!(2)),
            Composition::new(party_tray, cookie, dec!(12)),
        ] {
            catalog.add_composition(composition.unwrap()).unwrap();
        }

        uow.commit();

        Self {
            store,
            flour,
            sugar,
            butter,
            milk,
            boxes,
            ribbon,
            cookie_recipe,
            brownie_recipe,
            cookie,
            brownie,
            gift_box,
            party_tray,
        }
    }

    pub fn on_hand(&self, ingredient: IngredientId) -> Decimal {
        self.store.read(|s| s.lots().on_hand(ingredient)).unwrap()
    }
}
