//! Planning error model.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::id::{IngredientId, NodeId};
use crate::units::ConversionError;

/// Result type used across the planning engines.
pub type PlanningResult<T> = Result<T, PlanningError>;

/// Planning-level error.
///
/// Engines raise these upward unchanged; only the unit-of-work owner decides
/// whether a failure rolls the orchestration back.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanningError {
    /// Malformed input, a missing referenced entity or a missing required linkage.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A node reappeared in its own ancestry while walking the composition graph.
    #[error("circular reference at {node} (path: {})", display_path(.path))]
    CircularReference { node: NodeId, path: Vec<NodeId> },

    /// The composition graph is nested deeper than the configured bound.
    #[error("maximum nesting depth {max_depth} exceeded at {node} (depth {depth})")]
    MaxDepthExceeded {
        node: NodeId,
        depth: usize,
        max_depth: usize,
    },

    /// Lots on hand cannot cover a real (non dry-run) consumption.
    #[error("insufficient inventory for ingredient {ingredient}: needed {needed}, short {shortfall}")]
    InsufficientInventory {
        ingredient: IngredientId,
        needed: Decimal,
        shortfall: Decimal,
    },

    /// Finished goods on hand cannot cover an assembly.
    #[error("insufficient stock of {item}: needed {needed}, available {available}")]
    InsufficientStock {
        item: NodeId,
        needed: i64,
        available: i64,
    },

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The backing store could not be accessed (poisoned lock, unit of work already open).
    #[error("storage failure: {0}")]
    Storage(String),
}

impl PlanningError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

fn display_path(path: &[NodeId]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
