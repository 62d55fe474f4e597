//! Read-only access to catalog definitions.
//!
//! The decomposition engine and the recorders only ever see the catalog through
//! this trait, so they cannot alter compositions.

use rust_decimal::Decimal;

use bakeplan_core::{AssemblyId, FinishedUnitId, IngredientId, NodeId, RecipeId};

use crate::assembly::Assembly;
use crate::ingredient::Ingredient;
use crate::recipe::Recipe;
use crate::unit::FinishedUnit;

/// Shape of a composition graph node as seen by a traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogNode {
    Unit {
        id: FinishedUnitId,
        recipe_id: Option<RecipeId>,
    },
    Assembly {
        id: AssemblyId,
        /// `(child, quantity per parent)` in insertion order.
        components: Vec<(NodeId, Decimal)>,
    },
}

pub trait CatalogQuery {
    fn node(&self, id: NodeId) -> Option<CatalogNode>;

    fn ingredient(&self, id: IngredientId) -> Option<&Ingredient>;

    fn recipe(&self, id: RecipeId) -> Option<&Recipe>;

    fn finished_unit(&self, id: FinishedUnitId) -> Option<&FinishedUnit>;

    fn assembly(&self, id: AssemblyId) -> Option<&Assembly>;
}

impl<C> CatalogQuery for &C
where
    C: CatalogQuery + ?Sized,
{
    fn node(&self, id: NodeId) -> Option<CatalogNode> {
        (**self).node(id)
    }

    fn ingredient(&self, id: IngredientId) -> Option<&Ingredient> {
        (**self).ingredient(id)
    }

    fn recipe(&self, id: RecipeId) -> Option<&Recipe> {
        (**self).recipe(id)
    }

    fn finished_unit(&self, id: FinishedUnitId) -> Option<&FinishedUnit> {
        (**self).finished_unit(id)
    }

    fn assembly(&self, id: AssemblyId) -> Option<&Assembly> {
        (**self).assembly(id)
    }
}
