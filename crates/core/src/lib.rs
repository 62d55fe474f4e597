//! `bakeplan-core`: ids, errors and units shared by every planning crate.
//!
//! This crate contains **pure domain** primitives shared by the catalog, the lot
//! ledger and the orchestration layer (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod units;

pub use entity::Entity;
pub use error::{PlanningError, PlanningResult};
pub use id::{AssemblyId, FinishedUnitId, IngredientId, LotId, NodeId, RecipeId, RunId};
pub use units::{ConversionError, Dimension, MeasureUnit};
