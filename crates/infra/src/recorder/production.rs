use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bakeplan_catalog::CatalogQuery;
use bakeplan_core::{Entity, FinishedUnitId, PlanningError, PlanningResult, RecipeId, RunId};

use super::{Draw, IngredientUsage, RecorderStage, ShortfallPolicy, consume_all, per_item, total_cost};
use crate::config::PlanningConfig;
use crate::store::UnitOfWork;

/// Request to record `batches` of a finished unit as produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionRequest {
    pub finished_unit_id: FinishedUnitId,
    pub batches: u32,
    /// Items actually obtained; defaults to the theoretical yield.
    pub actual_yield: Option<i64>,
    /// Falls back to [`PlanningConfig::shortfall_policy`].
    pub shortfall_policy: Option<ShortfallPolicy>,
    pub produced_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl ProductionRequest {
    pub fn new(finished_unit_id: FinishedUnitId, batches: u32) -> Self {
        Self {
            finished_unit_id,
            batches,
            actual_yield: None,
            shortfall_policy: None,
            produced_at: Utc::now(),
            notes: None,
        }
    }

    pub fn with_actual_yield(mut self, items: i64) -> Self {
        self.actual_yield = Some(items);
        self
    }

    pub fn with_policy(mut self, policy: ShortfallPolicy) -> Self {
        self.shortfall_policy = Some(policy);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// A recorded production run with its cost snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionRun {
    pub id: RunId,
    pub finished_unit_id: FinishedUnitId,
    pub recipe_id: RecipeId,
    pub batches: u32,
    pub expected_yield: i64,
    pub actual_yield: i64,
    pub ingredients: Vec<IngredientUsage>,
    pub total_cost: Decimal,
    /// `None` when the run yielded nothing.
    pub cost_per_item: Option<Decimal>,
    pub produced_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl ProductionRun {
    /// True when some ingredient could not be fully covered.
    pub fn has_shortfall(&self) -> bool {
        self.ingredients.iter().any(|u| u.shortfall > Decimal::ZERO)
    }
}

/// Record a production run.
///
/// Consumes every recipe ingredient FIFO, adds the yield to finished stock at
/// the run's cost and appends the run to history, all inside `uow`.
#[tracing::instrument(
    skip_all,
    fields(unit = %request.finished_unit_id, batches = request.batches, uow = %uow.id())
)]
pub fn record_production(
    uow: &mut UnitOfWork<'_>,
    config: &PlanningConfig,
    request: &ProductionRequest,
) -> PlanningResult<ProductionRun> {
    tracing::debug!(stage = %RecorderStage::Validating);
    let unit = uow
        .finished_unit(request.finished_unit_id)
        .cloned()
        .ok_or_else(|| {
            PlanningError::validation(format!(
                "unknown finished unit {}",
                request.finished_unit_id
            ))
        })?;
    if request.batches == 0 {
        return Err(PlanningError::validation("batches must be positive"));
    }
    let recipe_id = unit.recipe_id().ok_or_else(|| {
        PlanningError::validation(format!("finished unit {} has no recipe", unit.name()))
    })?;
    let recipe = uow
        .recipe(recipe_id)
        .cloned()
        .ok_or_else(|| PlanningError::validation(format!("unknown recipe {recipe_id}")))?;

    let expected_yield = unit.theoretical_yield(request.batches)?;
    let actual_yield = request.actual_yield.unwrap_or(expected_yield);
    if !(0..=expected_yield).contains(&actual_yield) {
        return Err(PlanningError::validation(format!(
            "actual yield {actual_yield} must be between 0 and {expected_yield}"
        )));
    }
    let policy = request.shortfall_policy.unwrap_or(config.shortfall_policy);

    tracing::debug!(stage = %RecorderStage::Decomposing, recipe = %recipe_id);
    let draws: Vec<Draw> = recipe
        .requirements(Decimal::from(request.batches))?
        .into_iter()
        .map(|req| Draw {
            ingredient_id: req.ingredient_id,
            quantity: req.quantity,
            unit: req.unit,
        })
        .collect();

    tracing::debug!(stage = %RecorderStage::Consuming, ingredients = draws.len(), %policy);
    let ingredients = consume_all(uow, &draws, policy)?;
    let total = total_cost(&ingredients)?;

    tracing::debug!(stage = %RecorderStage::Persisting, total_cost = %total);
    uow.unit_stock_mut(unit.id()).receive(actual_yield, total)?;
    let run = ProductionRun {
        id: RunId::new(),
        finished_unit_id: unit.id(),
        recipe_id,
        batches: request.batches,
        expected_yield,
        actual_yield,
        ingredients,
        total_cost: total,
        cost_per_item: per_item(total, actual_yield),
        produced_at: request.produced_at,
        notes: request.notes.clone(),
    };
    uow.push_production_run(run.clone());

    tracing::info!(run = %run.id, actual_yield, total_cost = %total, "production recorded");
    Ok(run)
}
