//! Production and assembly recording.
//!
//! Each recorder runs inside a caller-provided [`UnitOfWork`] and moves through
//! the stages of [`RecorderStage`]. Through the service, a failed recording
//! has its staged changes undone, so it never leaves partial lot decrements
//! behind.

mod assembly;
mod production;

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bakeplan_core::{IngredientId, MeasureUnit, PlanningError, PlanningResult};
use bakeplan_inventory::{ConsumptionMode, ConsumptionResult, LotDraw, consume};

use crate::store::UnitOfWork;

pub use assembly::{AssemblyRequest, AssemblyRun, ComponentUsage, record_assembly};
pub use production::{ProductionRequest, ProductionRun, record_production};

/// What to do when lots cannot cover an ingredient.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortfallPolicy {
    /// Fail with `InsufficientInventory`; nothing is recorded.
    #[default]
    Abort,
    /// Consume what exists and record the shortfall on the run.
    Tolerate,
}

impl ShortfallPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShortfallPolicy::Abort => "abort",
            ShortfallPolicy::Tolerate => "tolerate",
        }
    }
}

impl fmt::Display for ShortfallPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShortfallPolicy {
    type Err = PlanningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(ShortfallPolicy::Abort),
            "tolerate" => Ok(ShortfallPolicy::Tolerate),
            other => Err(PlanningError::validation(format!(
                "unknown shortfall policy '{other}'"
            ))),
        }
    }
}

/// Recording lifecycle, attached to log events.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RecorderStage {
    Validating,
    Decomposing,
    Consuming,
    Persisting,
    Committed,
    RolledBack,
}

impl RecorderStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecorderStage::Validating => "validating",
            RecorderStage::Decomposing => "decomposing",
            RecorderStage::Consuming => "consuming",
            RecorderStage::Persisting => "persisting",
            RecorderStage::Committed => "committed",
            RecorderStage::RolledBack => "rolled_back",
        }
    }
}

impl fmt::Display for RecorderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cost snapshot of one ingredient consumed by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientUsage {
    pub ingredient_id: IngredientId,
    /// Lot-native unit of the quantities below.
    pub unit: MeasureUnit,
    pub required: Decimal,
    pub consumed: Decimal,
    pub shortfall: Decimal,
    pub cost: Decimal,
    pub draws: Vec<LotDraw>,
}

impl From<ConsumptionResult> for IngredientUsage {
    fn from(result: ConsumptionResult) -> Self {
        Self {
            ingredient_id: result.ingredient_id,
            unit: result.unit,
            required: result.requested,
            consumed: result.consumed,
            shortfall: result.shortfall,
            cost: result.total_cost,
            draws: result.breakdown,
        }
    }
}

/// A quantity of an ingredient to draw from lots.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Draw {
    pub ingredient_id: IngredientId,
    pub quantity: Decimal,
    pub unit: MeasureUnit,
}

/// Apply FIFO consumption for every draw in order.
///
/// Under [`ShortfallPolicy::Abort`] the first uncovered ingredient stops the
/// whole recording.
pub(crate) fn consume_all(
    uow: &mut UnitOfWork<'_>,
    draws: &[Draw],
    policy: ShortfallPolicy,
) -> PlanningResult<Vec<IngredientUsage>> {
    let mut usage = Vec::with_capacity(draws.len());
    for draw in draws {
        let result = consume(
            &mut *uow,
            draw.ingredient_id,
            draw.quantity,
            draw.unit,
            ConsumptionMode::Apply,
        )?;
        if !result.satisfied {
            match policy {
                ShortfallPolicy::Abort => {
                    return Err(PlanningError::InsufficientInventory {
                        ingredient: result.ingredient_id,
                        needed: result.requested,
                        shortfall: result.shortfall,
                    });
                }
                ShortfallPolicy::Tolerate => {
                    tracing::warn!(
                        ingredient = %result.ingredient_id,
                        shortfall = %result.shortfall,
                        "recording with uncovered ingredient"
                    );
                }
            }
        }
        usage.push(IngredientUsage::from(result));
    }
    Ok(usage)
}

pub(crate) fn total_cost(usage: &[IngredientUsage]) -> PlanningResult<Decimal> {
    sum_costs(usage.iter().map(|u| u.cost))
}

pub(crate) fn sum_costs(costs: impl IntoIterator<Item = Decimal>) -> PlanningResult<Decimal> {
    costs
        .into_iter()
        .try_fold(Decimal::ZERO, Decimal::checked_add)
        .ok_or_else(|| PlanningError::validation("run cost overflows"))
}

/// Cost per item, when anything was produced.
pub(crate) fn per_item(total: Decimal, items: i64) -> Option<Decimal> {
    (items > 0).then(|| total / Decimal::from(items))
}
