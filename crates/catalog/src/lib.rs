//! Catalog domain module: ingredients, recipes, finished units, assemblies and
//! the composition graph linking them, plus bundle decomposition over that graph.
//!
//! Everything here is deterministic domain logic (no IO, no storage backend).

pub mod assembly;
pub mod decompose;
pub mod ingredient;
pub mod query;
pub mod recipe;
pub mod store;
pub mod unit;

pub use assembly::{Assembly, Composition, PackagingLine};
pub use decompose::{DEFAULT_MAX_DEPTH, DecompositionVisitor, Decomposer, Selection};
pub use ingredient::Ingredient;
pub use query::{CatalogNode, CatalogQuery};
pub use recipe::{IngredientRequirement, Recipe, RecipeLine};
pub use store::InMemoryCatalog;
pub use unit::FinishedUnit;
