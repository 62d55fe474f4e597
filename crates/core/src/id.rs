//! Strongly-typed identifiers used across the planning domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PlanningError;

/// Identifier of a raw-material ingredient.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IngredientId(Uuid);

/// Identifier of a recipe.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeId(Uuid);

/// Identifier of a finished (atomic) unit produced from a recipe.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinishedUnitId(Uuid);

/// Identifier of an assembly (bundle).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssemblyId(Uuid);

/// Identifier of a recorded production or assembly run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

macro_rules! impl_uuid_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = PlanningError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| PlanningError::validation(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

impl_uuid_newtype!(IngredientId, "IngredientId");
impl_uuid_newtype!(RecipeId, "RecipeId");
impl_uuid_newtype!(FinishedUnitId, "FinishedUnitId");
impl_uuid_newtype!(AssemblyId, "AssemblyId");
impl_uuid_newtype!(RunId, "RunId");

/// Identifier of a purchased inventory lot.
///
/// Lot ids are surrogate integers assigned by the ledger in insertion order, so
/// comparing two ids tells which lot was recorded first.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LotId(u64);

impl LotId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// The id following this one in allocation order.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl core::fmt::Display for LotId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "lot-{}", self.0)
    }
}

/// A node of the composition graph: either a finished unit (leaf) or an assembly.
///
/// Being an enum, a composition child is always exactly one of the two.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum NodeId {
    Unit(FinishedUnitId),
    Assembly(AssemblyId),
}

impl From<FinishedUnitId> for NodeId {
    fn from(value: FinishedUnitId) -> Self {
        NodeId::Unit(value)
    }
}

impl From<AssemblyId> for NodeId {
    fn from(value: AssemblyId) -> Self {
        NodeId::Assembly(value)
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            NodeId::Unit(id) => write!(f, "unit:{id}"),
            NodeId::Assembly(id) => write!(f, "assembly:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_uuid_identifiers() {
        let id = RecipeId::new();
        let parsed: RecipeId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn rejects_malformed_identifier() {
        let err = "not-a-uuid".parse::<IngredientId>().unwrap_err();
        match err {
            PlanningError::Validation(msg) => assert!(msg.starts_with("IngredientId")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn lot_ids_order_by_allocation() {
        let first = LotId::new(1);
        assert!(first < first.next());
        assert_eq!(first.next().to_string(), "lot-2");
    }

    #[test]
    fn node_id_display_names_the_kind() {
        let unit = FinishedUnitId::from_uuid(Uuid::nil());
        assert_eq!(
            NodeId::from(unit).to_string(),
            "unit:00000000-0000-0000-0000-000000000000"
        );
    }
}
