//! Planning facade.
//!
//! Every operation takes `Option<&mut UnitOfWork>`:
//!
//! ```text
//! None            -> open a unit of work, run, commit on Ok / roll back on Err
//! Some(&mut uow)  -> run inside the caller's unit of work; caller commits
//! ```
//!
//! Handing the same unit of work to several calls makes them one atomic piece,
//! e.g. producing the units an assembly needs and then recording the assembly.
//! A call that fails on a shared unit of work undoes only its own staged
//! changes; the work staged by earlier calls stays for the caller to commit.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;

use bakeplan_catalog::{Decomposer, Selection};
use bakeplan_core::{IngredientId, LotId, MeasureUnit, NodeId, PlanningResult, RecipeId};
use bakeplan_inventory::{ConsumptionMode, ConsumptionResult, LotLedger, Purchase, consume};

use crate::config::PlanningConfig;
use crate::planning::{EventPlan, plan_event};
use crate::recorder::{
    AssemblyRequest, AssemblyRun, ProductionRequest, ProductionRun, RecorderStage,
    record_assembly, record_production,
};
use crate::store::{InMemoryStore, UnitOfWork};

#[derive(Debug, Clone)]
pub struct PlanningService {
    store: Arc<InMemoryStore>,
    config: PlanningConfig,
}

impl PlanningService {
    pub fn new(store: Arc<InMemoryStore>, config: PlanningConfig) -> Self {
        Self { store, config }
    }

    /// Service configured from `BAKEPLAN_*` environment variables.
    pub fn from_env(store: Arc<InMemoryStore>) -> Self {
        Self::new(store, PlanningConfig::from_env())
    }

    pub fn store(&self) -> &Arc<InMemoryStore> {
        &self.store
    }

    pub fn config(&self) -> &PlanningConfig {
        &self.config
    }

    /// `{recipe -> items}` for `quantity` of `root`.
    pub fn decompose(
        &self,
        root: NodeId,
        quantity: i64,
        uow: Option<&mut UnitOfWork<'_>>,
    ) -> PlanningResult<BTreeMap<RecipeId, i64>> {
        self.decompose_selections(&[Selection { node: root, quantity }], uow)
    }

    pub fn decompose_selections(
        &self,
        selections: &[Selection],
        uow: Option<&mut UnitOfWork<'_>>,
    ) -> PlanningResult<BTreeMap<RecipeId, i64>> {
        let max_depth = self.config.max_nesting_depth;
        self.store.run_in_unit_of_work(uow, |uow| {
            Decomposer::new(&*uow)
                .with_max_depth(max_depth)
                .decompose_all(selections)
        })
    }

    /// FIFO consumption of a single ingredient.
    ///
    /// A shortfall is reported in the result, not raised; with `Apply` and no
    /// caller unit of work, whatever could be drawn is committed.
    pub fn consume(
        &self,
        ingredient: IngredientId,
        quantity: Decimal,
        unit: MeasureUnit,
        mode: ConsumptionMode,
        uow: Option<&mut UnitOfWork<'_>>,
    ) -> PlanningResult<ConsumptionResult> {
        self.store
            .run_in_unit_of_work(uow, |uow| consume(uow, ingredient, quantity, unit, mode))
    }

    pub fn record_purchase(
        &self,
        purchase: Purchase,
        uow: Option<&mut UnitOfWork<'_>>,
    ) -> PlanningResult<LotId> {
        self.store
            .run_in_unit_of_work(uow, |uow| uow.record_purchase(purchase))
    }

    pub fn record_production(
        &self,
        request: &ProductionRequest,
        uow: Option<&mut UnitOfWork<'_>>,
    ) -> PlanningResult<ProductionRun> {
        let owned = uow.is_none();
        let result = self
            .store
            .run_in_unit_of_work(uow, |uow| record_production(uow, &self.config, request));
        log_outcome("production", owned, &result);
        result
    }

    pub fn record_assembly(
        &self,
        request: &AssemblyRequest,
        uow: Option<&mut UnitOfWork<'_>>,
    ) -> PlanningResult<AssemblyRun> {
        let owned = uow.is_none();
        let result = self
            .store
            .run_in_unit_of_work(uow, |uow| record_assembly(uow, &self.config, request));
        log_outcome("assembly", owned, &result);
        result
    }

    pub fn plan_event(
        &self,
        selections: &[Selection],
        uow: Option<&mut UnitOfWork<'_>>,
    ) -> PlanningResult<EventPlan> {
        self.store
            .run_in_unit_of_work(uow, |uow| plan_event(&*uow, &self.config, selections))
    }
}

/// Final stage of a recording. A caller-owned unit of work is still open, so it
/// has neither committed nor rolled back yet.
fn log_outcome<T>(kind: &str, owned: bool, result: &PlanningResult<T>) {
    match (result, owned) {
        (Ok(_), true) => tracing::info!(kind = kind, stage = %RecorderStage::Committed),
        (Ok(_), false) => tracing::debug!(
            kind = kind,
            stage = %RecorderStage::Persisting,
            "awaiting caller commit"
        ),
        (Err(err), true) => {
            tracing::warn!(kind = kind, stage = %RecorderStage::RolledBack, error = %err)
        }
        (Err(err), false) => tracing::warn!(
            kind = kind,
            stage = %RecorderStage::RolledBack,
            error = %err,
            "recording undone inside caller's unit of work"
        ),
    }
}
