//! FIFO consumption over the lot ledger.
//!
//! Requests are converted into the ingredient's lot-native unit, then lots are
//! drawn oldest purchase first (lowest lot id on equal dates) until the request
//! is covered or stock runs out. The realized cost is the sum of each draw at
//! its own lot's purchase price.
//!
//! `Apply` mutates lots and is therefore not idempotent; `DryRun` runs exactly the
//! same selection without touching the ledger, so it can be repeated freely.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bakeplan_core::{Entity, IngredientId, LotId, MeasureUnit, PlanningError, PlanningResult, units};

use crate::lot::{Lot, LotLedger};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionMode {
    /// Compute the draws without decrementing any lot.
    DryRun,
    /// Compute the draws and decrement the lots.
    Apply,
}

/// Quantity taken from a single lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotDraw {
    pub lot_id: LotId,
    pub purchase_date: NaiveDate,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionResult {
    pub ingredient_id: IngredientId,
    /// Lot-native unit all quantities below are expressed in.
    pub unit: MeasureUnit,
    /// The request after conversion.
    pub requested: Decimal,
    pub consumed: Decimal,
    pub breakdown: Vec<LotDraw>,
    pub shortfall: Decimal,
    pub satisfied: bool,
    pub total_cost: Decimal,
}

/// Consume `quantity` (measured in `unit`) of `ingredient`.
pub fn consume<L>(
    ledger: &mut L,
    ingredient: IngredientId,
    quantity: Decimal,
    unit: MeasureUnit,
    mode: ConsumptionMode,
) -> PlanningResult<ConsumptionResult>
where
    L: LotLedger + ?Sized,
{
    let result = preview(&*ledger, ingredient, quantity, unit)?;

    if mode == ConsumptionMode::Apply {
        for draw in &result.breakdown {
            ledger.decrement_lot(draw.lot_id, draw.quantity)?;
            tracing::debug!(
                ingredient = %ingredient,
                lot = %draw.lot_id,
                quantity = %draw.quantity,
                cost = %draw.cost,
                "lot drawn"
            );
        }
    }

    Ok(result)
}

/// Dry-run consumption over a shared reference.
pub fn preview<L>(
    ledger: &L,
    ingredient: IngredientId,
    quantity: Decimal,
    unit: MeasureUnit,
) -> PlanningResult<ConsumptionResult>
where
    L: LotLedger + ?Sized,
{
    let stock = ledger.stock_unit(ingredient)?;
    let requested = units::convert_with_density(quantity, unit, stock.unit, stock.density_g_per_ml)?;

    let mut lots = ledger.lots_for(ingredient);
    lots.retain(|lot| lot.ingredient_id() == ingredient && !lot.is_depleted());
    lots.sort_by_key(|lot| lot.fifo_key());

    let (breakdown, shortfall) = select_draws(ingredient, &lots, requested)?;
    let consumed = breakdown.iter().map(|d| d.quantity).sum();
    let total_cost = breakdown
        .iter()
        .try_fold(Decimal::ZERO, |acc, d| acc.checked_add(d.cost))
        .ok_or_else(|| cost_overflow(ingredient))?;

    Ok(ConsumptionResult {
        ingredient_id: ingredient,
        unit: stock.unit,
        requested,
        consumed,
        breakdown,
        shortfall,
        satisfied: shortfall.is_zero(),
        total_cost,
    })
}

/// Greedy oldest-first selection; `lots` must already be in FIFO order.
fn select_draws(
    ingredient: IngredientId,
    lots: &[&Lot],
    needed: Decimal,
) -> PlanningResult<(Vec<LotDraw>, Decimal)> {
    let mut remaining = needed;
    let mut draws = Vec::new();

    for lot in lots {
        if remaining <= Decimal::ZERO {
            break;
        }
        let take = remaining.min(lot.quantity_remaining());
        if take > Decimal::ZERO {
            draws.push(LotDraw {
                lot_id: lot.id(),
                purchase_date: lot.purchase_date(),
                quantity: take,
                unit_cost: lot.cost_per_unit(),
                cost: take
                    .checked_mul(lot.cost_per_unit())
                    .ok_or_else(|| cost_overflow(ingredient))?,
            });
            remaining -= take;
        }
    }

    Ok((draws, remaining.max(Decimal::ZERO)))
}

fn cost_overflow(ingredient: IngredientId) -> PlanningError {
    PlanningError::validation(format!("cost of ingredient {ingredient} overflows"))
}
