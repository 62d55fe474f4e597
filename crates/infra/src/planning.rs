//! Event planning: from top-level selections to batches, ingredient totals and
//! a purchasing shortfall list.
//!
//! Nothing here mutates state; lot availability comes from FIFO dry runs.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bakeplan_catalog::{CatalogQuery, Decomposer, Selection};
use bakeplan_core::{
    Entity, FinishedUnitId, IngredientId, MeasureUnit, PlanningError, PlanningResult, RecipeId,
    units,
};
use bakeplan_inventory::{LotLedger, preview, stock_value};

use crate::config::PlanningConfig;

/// Batches to bake for one finished unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitBatchPlan {
    pub finished_unit_id: FinishedUnitId,
    pub recipe_id: RecipeId,
    pub items: i64,
    pub batches: i64,
    /// Items made beyond what was asked for because batches are whole.
    pub surplus: i64,
}

/// Batches per recipe, summed across the units that share it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeBatchPlan {
    pub recipe_id: RecipeId,
    pub items: i64,
    pub batches: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientNeed {
    pub ingredient_id: IngredientId,
    pub name: String,
    /// Lot-native unit of every quantity below.
    pub unit: MeasureUnit,
    pub required: Decimal,
    pub available: Decimal,
    pub shortfall: Decimal,
    /// FIFO cost of the part that stock covers.
    pub estimated_cost: Decimal,
    /// Purchase-cost value of all stock on hand before the event.
    pub stock_value: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPlan {
    pub units: Vec<UnitBatchPlan>,
    pub recipes: Vec<RecipeBatchPlan>,
    pub ingredients: Vec<IngredientNeed>,
}

impl EventPlan {
    /// Ingredients that must be bought before the event.
    pub fn shopping_list(&self) -> impl Iterator<Item = &IngredientNeed> {
        self.ingredients
            .iter()
            .filter(|need| need.shortfall > Decimal::ZERO)
    }

    pub fn is_covered(&self) -> bool {
        self.shopping_list().next().is_none()
    }

    /// Summed FIFO cost of the covered ingredients; `None` if it overflows.
    pub fn estimated_cost(&self) -> Option<Decimal> {
        self.ingredients
            .iter()
            .try_fold(Decimal::ZERO, |total, need| total.checked_add(need.estimated_cost))
    }
}

/// Plan production for a set of selections.
///
/// Batches are rounded up per finished unit, then each recipe is scaled by the
/// batches of all its units.
pub fn plan_event<S>(
    source: &S,
    config: &PlanningConfig,
    selections: &[Selection],
) -> PlanningResult<EventPlan>
where
    S: CatalogQuery + LotLedger + ?Sized,
{
    let unit_items = Decomposer::new(source)
        .with_max_depth(config.max_nesting_depth)
        .decompose_all_units(selections)?;

    let mut unit_plans = Vec::with_capacity(unit_items.len());
    let mut recipe_batches: BTreeMap<RecipeId, RecipeBatchPlan> = BTreeMap::new();
    for (unit_id, items) in unit_items {
        let unit = source
            .finished_unit(unit_id)
            .ok_or_else(|| PlanningError::validation(format!("unknown finished unit {unit_id}")))?;
        let recipe_id = unit.recipe_id().ok_or_else(|| {
            PlanningError::validation(format!("finished unit {} has no recipe", unit.name()))
        })?;
        let overflow = || {
            PlanningError::validation(format!(
                "{items} items of {} overflow the batch plan",
                unit.name()
            ))
        };
        let batches = unit.batches_for(items);
        let surplus = batches
            .checked_mul(i64::from(unit.items_per_batch()))
            .and_then(|made| made.checked_sub(items))
            .ok_or_else(overflow)?;
        unit_plans.push(UnitBatchPlan {
            finished_unit_id: unit.id(),
            recipe_id,
            items,
            batches,
            surplus,
        });

        let plan = recipe_batches.entry(recipe_id).or_insert(RecipeBatchPlan {
            recipe_id,
            items: 0,
            batches: 0,
        });
        plan.items = plan.items.checked_add(items).ok_or_else(overflow)?;
        plan.batches = plan.batches.checked_add(batches).ok_or_else(overflow)?;
    }

    let mut required: BTreeMap<IngredientId, Decimal> = BTreeMap::new();
    for plan in recipe_batches.values() {
        let recipe = source
            .recipe(plan.recipe_id)
            .ok_or_else(|| PlanningError::validation(format!("unknown recipe {}", plan.recipe_id)))?;
        for req in recipe.requirements(Decimal::from(plan.batches))? {
            let stock = source.stock_unit(req.ingredient_id)?;
            let native = units::convert_with_density(
                req.quantity,
                req.unit,
                stock.unit,
                stock.density_g_per_ml,
            )?;
            let total = required.entry(req.ingredient_id).or_insert(Decimal::ZERO);
            *total = total.checked_add(native).ok_or_else(|| {
                PlanningError::validation(format!(
                    "required quantity of ingredient {} overflows",
                    req.ingredient_id
                ))
            })?;
        }
    }

    let mut ingredients = Vec::with_capacity(required.len());
    for (ingredient_id, quantity) in required {
        let stock = source.stock_unit(ingredient_id)?;
        let dry_run = preview(source, ingredient_id, quantity, stock.unit)?;
        let on_hand_value = stock_value(source.lots_for(ingredient_id))?;
        let name = source
            .ingredient(ingredient_id)
            .map(|i| i.name().to_string())
            .unwrap_or_default();
        ingredients.push(IngredientNeed {
            ingredient_id,
            name,
            unit: dry_run.unit,
            required: dry_run.requested,
            available: dry_run.consumed,
            shortfall: dry_run.shortfall,
            estimated_cost: dry_run.total_cost,
            stock_value: on_hand_value,
        });
    }

    let plan = EventPlan {
        units: unit_plans,
        recipes: recipe_batches.into_values().collect(),
        ingredients,
    };
    tracing::debug!(
        selections = selections.len(),
        recipes = plan.recipes.len(),
        short = plan.shopping_list().count(),
        "event planned"
    );
    Ok(plan)
}
