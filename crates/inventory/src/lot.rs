use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bakeplan_core::{Entity, IngredientId, LotId, MeasureUnit, PlanningError, PlanningResult};

/// A purchase to be recorded as a new lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub ingredient_id: IngredientId,
    pub purchase_date: NaiveDate,
    /// In the ingredient's purchase unit.
    pub quantity: Decimal,
    /// Cost of one purchase unit.
    pub cost_per_unit: Decimal,
    pub supplier: Option<String>,
}

/// One purchase-dated batch of an ingredient.
///
/// Everything except `quantity_remaining` is fixed at purchase time, and the
/// remaining quantity only ever goes down, never below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    id: LotId,
    ingredient_id: IngredientId,
    purchase_date: NaiveDate,
    quantity_purchased: Decimal,
    quantity_remaining: Decimal,
    cost_per_unit: Decimal,
    supplier: Option<String>,
}

impl Lot {
    pub fn purchase(id: LotId, purchase: Purchase) -> PlanningResult<Self> {
        if purchase.quantity <= Decimal::ZERO {
            return Err(PlanningError::validation(format!(
                "purchase of ingredient {}: quantity must be positive",
                purchase.ingredient_id
            )));
        }
        if purchase.cost_per_unit < Decimal::ZERO {
            return Err(PlanningError::validation(format!(
                "purchase of ingredient {}: cost cannot be negative",
                purchase.ingredient_id
            )));
        }
        Ok(Self {
            id,
            ingredient_id: purchase.ingredient_id,
            purchase_date: purchase.purchase_date,
            quantity_purchased: purchase.quantity,
            quantity_remaining: purchase.quantity,
            cost_per_unit: purchase.cost_per_unit,
            supplier: purchase.supplier,
        })
    }

    pub fn ingredient_id(&self) -> IngredientId {
        self.ingredient_id
    }

    pub fn purchase_date(&self) -> NaiveDate {
        self.purchase_date
    }

    pub fn quantity_purchased(&self) -> Decimal {
        self.quantity_purchased
    }

    pub fn quantity_remaining(&self) -> Decimal {
        self.quantity_remaining
    }

    pub fn cost_per_unit(&self) -> Decimal {
        self.cost_per_unit
    }

    pub fn supplier(&self) -> Option<&str> {
        self.supplier.as_deref()
    }

    pub fn is_depleted(&self) -> bool {
        self.quantity_remaining <= Decimal::ZERO
    }

    /// Consumption order: oldest purchase first, then lowest lot id.
    pub fn fifo_key(&self) -> (NaiveDate, LotId) {
        (self.purchase_date, self.id)
    }

    /// Value of what is left, at the purchase cost.
    pub fn remaining_value(&self) -> PlanningResult<Decimal> {
        self.quantity_remaining
            .checked_mul(self.cost_per_unit)
            .ok_or_else(|| {
                PlanningError::validation(format!("{}: remaining value overflows", self.id))
            })
    }

    pub fn draw(&mut self, amount: Decimal) -> PlanningResult<()> {
        if amount <= Decimal::ZERO {
            return Err(PlanningError::validation(format!(
                "{}: draw amount must be positive",
                self.id
            )));
        }
        if amount > self.quantity_remaining {
            return Err(PlanningError::validation(format!(
                "{}: cannot draw {amount}, only {} remaining",
                self.id, self.quantity_remaining
            )));
        }
        self.quantity_remaining -= amount;
        Ok(())
    }
}

impl Entity for Lot {
    type Id = LotId;

    fn id(&self) -> LotId {
        self.id
    }
}

/// The unit lots of an ingredient are held in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StockUnit {
    pub unit: MeasureUnit,
    pub density_g_per_ml: Option<Decimal>,
}

/// Lot ledger seam used by the FIFO engine.
pub trait LotLedger {
    /// Lot-native unit of `ingredient`; unknown ingredients are a validation error.
    fn stock_unit(&self, ingredient: IngredientId) -> PlanningResult<StockUnit>;

    /// Lots of `ingredient` that still have stock, oldest first.
    fn lots_for(&self, ingredient: IngredientId) -> Vec<&Lot>;

    fn decrement_lot(&mut self, lot: LotId, amount: Decimal) -> PlanningResult<()>;

    fn record_purchase(&mut self, purchase: Purchase) -> PlanningResult<LotId>;
}

/// Summed [`Lot::remaining_value`] of `lots`.
pub fn stock_value<'a>(lots: impl IntoIterator<Item = &'a Lot>) -> PlanningResult<Decimal> {
    lots.into_iter().try_fold(Decimal::ZERO, |total, lot| {
        total
            .checked_add(lot.remaining_value()?)
            .ok_or_else(|| PlanningError::validation("stock value overflows"))
    })
}

/// In-memory lot storage with insertion-ordered surrogate ids.
#[derive(Debug, Clone, Default)]
pub struct LotBook {
    lots: BTreeMap<LotId, Lot>,
    last_id: Option<LotId>,
}

impl LotBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, purchase: Purchase) -> PlanningResult<LotId> {
        let id = self.last_id.map(|id| id.next()).unwrap_or(LotId::new(1));
        let lot = Lot::purchase(id, purchase)?;
        self.lots.insert(id, lot);
        self.last_id = Some(id);
        Ok(id)
    }

    pub fn get(&self, id: LotId) -> Option<&Lot> {
        self.lots.get(&id)
    }

    /// Lots of `ingredient` with stock left, ordered by [`Lot::fifo_key`].
    pub fn available(&self, ingredient: IngredientId) -> Vec<&Lot> {
        let mut lots: Vec<&Lot> = self
            .lots
            .values()
            .filter(|lot| lot.ingredient_id() == ingredient && !lot.is_depleted())
            .collect();
        lots.sort_by_key(|lot| lot.fifo_key());
        lots
    }

    pub fn decrement(&mut self, id: LotId, amount: Decimal) -> PlanningResult<()> {
        self.lots
            .get_mut(&id)
            .ok_or_else(|| PlanningError::validation(format!("unknown {id}")))?
            .draw(amount)
    }

    /// Total remaining quantity of `ingredient`, in its purchase unit.
    ///
    /// Saturates at [`Decimal::MAX`].
    pub fn on_hand(&self, ingredient: IngredientId) -> Decimal {
        self.available(ingredient)
            .iter()
            .fold(Decimal::ZERO, |total, lot| total.saturating_add(lot.quantity_remaining()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lot> {
        self.lots.values()
    }
}
