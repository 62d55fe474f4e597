//! Infrastructure layer: transactional store, recorders, event planning and
//! the service facade tying them together.

pub mod config;
pub mod planning;
pub mod recorder;
pub mod service;
pub mod store;


#[cfg(test)]
mod testing;

pub use config::PlanningConfig;
pub use planning::{EventPlan, IngredientNeed, RecipeBatchPlan, UnitBatchPlan, plan_event};
pub use recorder::{
    AssemblyRequest, AssemblyRun, ComponentUsage, IngredientUsage, ProductionRequest,
    ProductionRun, RecorderStage, ShortfallPolicy, record_assembly, record_production,
};
pub use service::PlanningService;
pub use store::{FinishedStock, InMemoryStore, StoreState, UnitOfWork};
