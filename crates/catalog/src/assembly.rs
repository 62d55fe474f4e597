use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bakeplan_core::{AssemblyId, Entity, IngredientId, MeasureUnit, NodeId, PlanningError, PlanningResult};

/// Packaging material consumed once per assembled item (boxes, ribbon, tissue).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingLine {
    pub ingredient_id: IngredientId,
    pub quantity: Decimal,
    pub unit: MeasureUnit,
}

/// A composite product (gift box, sampler tray) built from units and other assemblies.
///
/// Its children live in [`Composition`] edges held by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assembly {
    id: AssemblyId,
    name: String,
    packaging: Vec<PackagingLine>,
}

impl Assembly {
    pub fn new(id: AssemblyId, name: impl Into<String>) -> PlanningResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PlanningError::validation("assembly name cannot be empty"));
        }
        Ok(Self {
            id,
            name,
            packaging: Vec::new(),
        })
    }

    pub fn with_packaging(mut self, line: PackagingLine) -> PlanningResult<Self> {
        if line.quantity <= Decimal::ZERO {
            return Err(PlanningError::validation(format!(
                "assembly {}: packaging quantity must be positive",
                self.name
            )));
        }
        self.packaging.push(line);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn packaging(&self) -> &[PackagingLine] {
        &self.packaging
    }
}

impl Entity for Assembly {
    type Id = AssemblyId;

    fn id(&self) -> AssemblyId {
        self.id
    }
}

/// Edge of the composition graph: `quantity` of `child` per one `parent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composition {
    pub parent: AssemblyId,
    pub child: NodeId,
    pub quantity: Decimal,
}

impl Composition {
    pub fn new(parent: AssemblyId, child: impl Into<NodeId>, quantity: Decimal) -> PlanningResult<Self> {
        let child = child.into();
        if quantity <= Decimal::ZERO {
            return Err(PlanningError::validation(format!(
                "composition {parent} -> {child}: quantity must be positive"
            )));
        }
        if child == NodeId::Assembly(parent) {
            return Err(PlanningError::CircularReference {
                node: child,
                path: vec![child],
            });
        }
        Ok(Self {
            parent,
            child,
            quantity,
        })
    }
}
