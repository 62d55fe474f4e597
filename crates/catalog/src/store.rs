//! In-memory catalog store (catalog maintenance lives here, not in the engines).

use std::collections::HashMap;

use bakeplan_core::{
    AssemblyId, Entity, FinishedUnitId, IngredientId, NodeId, PlanningError, PlanningResult, RecipeId,
};

use crate::assembly::{Assembly, Composition};
use crate::ingredient::Ingredient;
use crate::query::{CatalogNode, CatalogQuery};
use crate::recipe::Recipe;
use crate::unit::FinishedUnit;

/// Catalog definitions plus the composition graph.
///
/// Every mutation validates references, and [`InMemoryCatalog::add_composition`]
/// refuses an edge that would close a cycle, so the stored graph stays a DAG.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    ingredients: HashMap<IngredientId, Ingredient>,
    recipes: HashMap<RecipeId, Recipe>,
    units: HashMap<FinishedUnitId, FinishedUnit>,
    assemblies: HashMap<AssemblyId, Assembly>,
    compositions: HashMap<AssemblyId, Vec<Composition>>,
}

fn insert_unique<E: Entity>(map: &mut HashMap<E::Id, E>, entity: E, kind: &str) -> PlanningResult<()> {
    let id = entity.id();
    if map.contains_key(&id) {
        return Err(PlanningError::validation(format!("{kind} {id:?} already exists")));
    }
    map.insert(id, entity);
    Ok(())
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_ingredient(&mut self, ingredient: Ingredient) -> PlanningResult<()> {
        insert_unique(&mut self.ingredients, ingredient, "ingredient")
    }

    pub fn add_recipe(&mut self, recipe: Recipe) -> PlanningResult<()> {
        for line in recipe.lines() {
            if !self.ingredients.contains_key(&line.ingredient_id) {
                return Err(PlanningError::validation(format!(
                    "recipe {}: unknown ingredient {}",
                    recipe.name(),
                    line.ingredient_id
                )));
            }
        }
        insert_unique(&mut self.recipes, recipe, "recipe")
    }

    pub fn add_finished_unit(&mut self, unit: FinishedUnit) -> PlanningResult<()> {
        if let Some(recipe_id) = unit.recipe_id() {
            if !self.recipes.contains_key(&recipe_id) {
                return Err(PlanningError::validation(format!(
                    "finished unit {}: unknown recipe {recipe_id}",
                    unit.name()
                )));
            }
        }
        insert_unique(&mut self.units, unit, "finished unit")
    }

    pub fn add_assembly(&mut self, assembly: Assembly) -> PlanningResult<()> {
        for line in assembly.packaging() {
            if !self.ingredients.contains_key(&line.ingredient_id) {
                return Err(PlanningError::validation(format!(
                    "assembly {}: unknown packaging ingredient {}",
                    assembly.name(),
                    line.ingredient_id
                )));
            }
        }
        insert_unique(&mut self.assemblies, assembly, "assembly")
    }

    /// Link `composition.child` under `composition.parent`.
    ///
    /// Adding the same child twice to one parent is rejected; adjust the quantity
    /// with [`InMemoryCatalog::remove_composition`] + re-add instead.
    pub fn add_composition(&mut self, composition: Composition) -> PlanningResult<()> {
        let parent = composition.parent;
        if !self.assemblies.contains_key(&parent) {
            return Err(PlanningError::validation(format!("unknown assembly {parent}")));
        }
        if !self.contains_node(composition.child) {
            return Err(PlanningError::validation(format!(
                "unknown catalog node {}",
                composition.child
            )));
        }
        if self
            .components_of(parent)
            .iter()
            .any(|c| c.child == composition.child)
        {
            return Err(PlanningError::validation(format!(
                "{} is already a component of assembly {parent}",
                composition.child
            )));
        }

        // The new edge closes a cycle iff the parent is reachable from the child.
        if let NodeId::Assembly(child) = composition.child {
            if let Some(mut path) = self.path_between(child, parent) {
                path.push(composition.child);
                return Err(PlanningError::CircularReference {
                    node: composition.child,
                    path,
                });
            }
        }

        tracing::debug!(
            %parent,
            child = %composition.child,
            quantity = %composition.quantity,
            "composition added"
        );
        self.compositions.entry(parent).or_default().push(composition);
        Ok(())
    }

    pub fn remove_composition(&mut self, parent: AssemblyId, child: NodeId) -> bool {
        let Some(edges) = self.compositions.get_mut(&parent) else {
            return false;
        };
        let before = edges.len();
        edges.retain(|c| c.child != child);
        let removed = before != edges.len();
        if removed {
            tracing::debug!(%parent, %child, "composition removed");
        }
        removed
    }

    pub fn components_of(&self, parent: AssemblyId) -> &[Composition] {
        self.compositions.get(&parent).map(Vec::as_slice).unwrap_or(&[])
    }

    fn contains_node(&self, node: NodeId) -> bool {
        match node {
            NodeId::Unit(id) => self.units.contains_key(&id),
            NodeId::Assembly(id) => self.assemblies.contains_key(&id),
        }
    }

    /// Path of assembly nodes leading from `from` down to `to`, if any.
    fn path_between(&self, from: AssemblyId, to: AssemblyId) -> Option<Vec<NodeId>> {
        let mut stack = vec![(from, vec![NodeId::Assembly(from)])];
        let mut seen = std::collections::HashSet::new();
        while let Some((current, path)) = stack.pop() {
            if current == to {
                return Some(path);
            }
            if !seen.insert(current) {
                continue;
            }
            for edge in self.components_of(current) {
                if let NodeId::Assembly(next) = edge.child {
                    let mut next_path = path.clone();
                    next_path.push(edge.child);
                    stack.push((next, next_path));
                }
            }
        }
        None
    }
}

impl CatalogQuery for InMemoryCatalog {
    fn node(&self, id: NodeId) -> Option<CatalogNode> {
        match id {
            NodeId::Unit(unit_id) => self.units.get(&unit_id).map(|unit| CatalogNode::Unit {
                id: unit_id,
                recipe_id: unit.recipe_id(),
            }),
            NodeId::Assembly(assembly_id) => {
                self.assemblies.get(&assembly_id)?;
                Some(CatalogNode::Assembly {
                    id: assembly_id,
                    components: self
                        .components_of(assembly_id)
                        .iter()
                        .map(|c| (c.child, c.quantity))
                        .collect(),
                })
            }
        }
    }

    fn ingredient(&self, id: IngredientId) -> Option<&Ingredient> {
        self.ingredients.get(&id)
    }

    fn recipe(&self, id: RecipeId) -> Option<&Recipe> {
        self.recipes.get(&id)
    }

    fn finished_unit(&self, id: FinishedUnitId) -> Option<&FinishedUnit> {
        self.units.get(&id)
    }

    fn assembly(&self, id: AssemblyId) -> Option<&Assembly> {
        self.assemblies.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bakeplan_core::MeasureUnit;
    use rust_decimal_macros::dec;

    use crate::recipe::RecipeLine;

    fn catalog_with_unit() -> (InMemoryCatalog, FinishedUnitId) {
        let mut catalog = InMemoryCatalog::new();
        let flour = Ingredient::new(IngredientId::new(), "Flour", "baking", MeasureUnit::Gram).unwrap();
        let recipe = Recipe::new(
            RecipeId::new(),
            "Sugar cookie",
            vec![RecipeLine {
                ingredient_id: flour.id(),
                quantity: dec!(300),
                unit: MeasureUnit::Gram,
            }],
        )
        .unwrap();
        let unit = FinishedUnit::new(FinishedUnitId::new(), "Sugar cookie", recipe.id(), 24).unwrap();
        let unit_id = unit.id();
        catalog.add_ingredient(flour).unwrap();
        catalog.add_recipe(recipe).unwrap();
        catalog.add_finished_unit(unit).unwrap();
        (catalog, unit_id)
    }

    fn add_assembly(catalog: &mut InMemoryCatalog, name: &str) -> AssemblyId {
        let assembly = Assembly::new(AssemblyId::new(), name).unwrap();
        let id = assembly.id();
        catalog.add_assembly(assembly).unwrap();
        id
    }

    #[test]
    fn rejects_recipe_with_unknown_ingredient() {
        let mut catalog = InMemoryCatalog::new();
        let recipe = Recipe::new(
            RecipeId::new(),
            "Mystery",
            vec![RecipeLine {
                ingredient_id: IngredientId::new(),
                quantity: dec!(1),
                unit: MeasureUnit::Gram,
            }],
        )
        .unwrap();
        assert!(matches!(
            catalog.add_recipe(recipe),
            Err(PlanningError::Validation(msg)) if msg.contains("unknown ingredient")
        ));
    }

    #[test]
    fn node_lists_components_in_insertion_order() {
        let (mut catalog, cookie) = catalog_with_unit();
        let inner = add_assembly(&mut catalog, "Inner");
        let outer = add_assembly(&mut catalog, "Outer");
        catalog.add_composition(Composition::new(inner, cookie, dec!(6)).unwrap()).unwrap();
        catalog.add_composition(Composition::new(outer, inner, dec!(2)).unwrap()).unwrap();
        catalog.add_composition(Composition::new(outer, cookie, dec!(1)).unwrap()).unwrap();

        match catalog.node(NodeId::Assembly(outer)).unwrap() {
            CatalogNode::Assembly { components, .. } => {
                assert_eq!(
                    components,
                    vec![(NodeId::Assembly(inner), dec!(2)), (NodeId::Unit(cookie), dec!(1))]
                );
            }
            other => panic!("expected assembly node, got {other:?}"),
        }
    }

    #[test]
    fn rejects_edge_that_closes_a_cycle() {
        let (mut catalog, _) = catalog_with_unit();
        let a = add_assembly(&mut catalog, "A");
        let b = add_assembly(&mut catalog, "B");
        let c = add_assembly(&mut catalog, "C");
        catalog.add_composition(Composition::new(a, b, dec!(1)).unwrap()).unwrap();
        catalog.add_composition(Composition::new(b, c, dec!(1)).unwrap()).unwrap();

        let err = catalog
            .add_composition(Composition::new(c, a, dec!(1)).unwrap())
            .unwrap_err();
        match err {
            PlanningError::CircularReference { node, path } => {
                assert_eq!(node, NodeId::Assembly(a));
                assert_eq!(
                    path,
                    vec![
                        NodeId::Assembly(a),
                        NodeId::Assembly(b),
                        NodeId::Assembly(c),
                        NodeId::Assembly(a)
                    ]
                );
            }
            other => panic!("expected circular reference, got {other:?}"),
        }
        assert!(catalog.components_of(c).is_empty());
    }

    #[test]
    fn allows_shared_children() {
        let (mut catalog, cookie) = catalog_with_unit();
        let x = add_assembly(&mut catalog, "X");
        let y = add_assembly(&mut catalog, "Y");
        let top = add_assembly(&mut catalog, "Top");
        catalog.add_composition(Composition::new(x, cookie, dec!(3)).unwrap()).unwrap();
        catalog.add_composition(Composition::new(y, cookie, dec!(5)).unwrap()).unwrap();
        catalog.add_composition(Composition::new(top, x, dec!(2)).unwrap()).unwrap();
        catalog.add_composition(Composition::new(top, y, dec!(4)).unwrap()).unwrap();
        assert_eq!(catalog.components_of(top).len(), 2);
    }

    #[test]
    fn rejects_duplicate_child_and_removes_edges() {
        let (mut catalog, cookie) = catalog_with_unit();
        let tin = add_assembly(&mut catalog, "Tin");
        catalog.add_composition(Composition::new(tin, cookie, dec!(12)).unwrap()).unwrap();
        assert!(catalog.add_composition(Composition::new(tin, cookie, dec!(1)).unwrap()).is_err());

        assert!(catalog.remove_composition(tin, NodeId::Unit(cookie)));
        assert!(!catalog.remove_composition(tin, NodeId::Unit(cookie)));
        assert!(catalog.components_of(tin).is_empty());
    }
}
