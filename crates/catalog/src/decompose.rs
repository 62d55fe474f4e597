//! Bundle decomposition: flatten an assembly hierarchy into recipe quantities.
//!
//! The walk is depth-first. Quantities multiply down each branch and are floored
//! to whole items only when they reach a finished unit. Cycle detection uses the
//! ancestry of the node being visited, not a global visited set: a unit shared by
//! two sibling branches is reached twice and both contributions count, while a
//! node that reappears under itself is rejected.

use std::collections::{BTreeMap, HashSet};
use std::ops::{Deref, DerefMut};

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use bakeplan_core::{AssemblyId, FinishedUnitId, NodeId, PlanningError, PlanningResult, RecipeId};

use crate::query::{CatalogNode, CatalogQuery};

/// Nesting bound used when the caller does not configure one.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// A request for `quantity` of a top-level assembly or finished unit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub node: NodeId,
    pub quantity: i64,
}

impl Selection {
    pub fn new(node: impl Into<NodeId>, quantity: i64) -> Self {
        Self {
            node: node.into(),
            quantity,
        }
    }
}

/// Receives the nodes reached by [`Decomposer::walk`].
pub trait DecompositionVisitor {
    /// Called once per assembly occurrence with the number of that assembly needed.
    fn assembly(&mut self, _id: AssemblyId, _multiplier: Decimal) -> PlanningResult<()> {
        Ok(())
    }

    /// Called for every finished unit occurrence with a positive item count.
    fn unit(
        &mut self,
        id: FinishedUnitId,
        recipe_id: Option<RecipeId>,
        quantity: i64,
    ) -> PlanningResult<()>;
}

/// Nodes on the current DFS path.
#[derive(Debug, Default)]
struct Ancestry {
    members: HashSet<NodeId>,
    order: Vec<NodeId>,
}

impl Ancestry {
    fn enter(&mut self, node: NodeId) -> PlanningResult<AncestryGuard<'_>> {
        if !self.members.insert(node) {
            let mut path = self.order.clone();
            path.push(node);
            return Err(PlanningError::CircularReference { node, path });
        }
        self.order.push(node);
        Ok(AncestryGuard { ancestry: self })
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty() && self.members.is_empty()
    }
}

/// Removes the entered node when dropped, whether the visit succeeded or failed.
struct AncestryGuard<'a> {
    ancestry: &'a mut Ancestry,
}

impl Deref for AncestryGuard<'_> {
    type Target = Ancestry;

    fn deref(&self) -> &Ancestry {
        &*self.ancestry
    }
}

impl DerefMut for AncestryGuard<'_> {
    fn deref_mut(&mut self) -> &mut Ancestry {
        &mut *self.ancestry
    }
}

impl Drop for AncestryGuard<'_> {
    fn drop(&mut self) {
        if let Some(node) = self.ancestry.order.pop() {
            self.ancestry.members.remove(&node);
        }
    }
}

/// Read-only traversal over a catalog.
#[derive(Debug)]
pub struct Decomposer<'c, C: ?Sized> {
    catalog: &'c C,
    max_depth: usize,
}

impl<'c, C> Decomposer<'c, C>
where
    C: CatalogQuery + ?Sized,
{
    pub fn new(catalog: &'c C) -> Self {
        Self {
            catalog,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// `{recipe -> items}` needed for `quantity` of `root`.
    pub fn decompose(&self, root: NodeId, quantity: i64) -> PlanningResult<BTreeMap<RecipeId, i64>> {
        self.decompose_all(&[Selection { node: root, quantity }])
    }

    /// Merge several independent selections, summing per recipe.
    pub fn decompose_all(&self, selections: &[Selection]) -> PlanningResult<BTreeMap<RecipeId, i64>> {
        let mut totals = RecipeTotals::default();
        for selection in selections {
            self.walk(selection.node, selection.quantity, &mut totals)?;
        }
        Ok(totals.0)
    }

    /// `{finished unit -> items}` needed for `quantity` of `root`.
    pub fn decompose_units(
        &self,
        root: NodeId,
        quantity: i64,
    ) -> PlanningResult<BTreeMap<FinishedUnitId, i64>> {
        self.decompose_all_units(&[Selection { node: root, quantity }])
    }

    pub fn decompose_all_units(
        &self,
        selections: &[Selection],
    ) -> PlanningResult<BTreeMap<FinishedUnitId, i64>> {
        let mut totals = UnitTotals::default();
        for selection in selections {
            self.walk(selection.node, selection.quantity, &mut totals)?;
        }
        Ok(totals.0)
    }

    /// Walk one top-level selection with a fresh ancestry.
    pub fn walk<V>(&self, root: NodeId, quantity: i64, visitor: &mut V) -> PlanningResult<()>
    where
        V: DecompositionVisitor + ?Sized,
    {
        let mut ancestry = Ancestry::default();
        let result = self.visit(root, Decimal::from(quantity), 0, &mut ancestry, visitor);
        debug_assert!(ancestry.is_empty());
        result
    }

    fn visit<V>(
        &self,
        node: NodeId,
        multiplier: Decimal,
        depth: usize,
        ancestry: &mut Ancestry,
        visitor: &mut V,
    ) -> PlanningResult<()>
    where
        V: DecompositionVisitor + ?Sized,
    {
        let mut guard = ancestry.enter(node)?;
        if depth > self.max_depth {
            return Err(PlanningError::MaxDepthExceeded {
                node,
                depth,
                max_depth: self.max_depth,
            });
        }

        let shape = self
            .catalog
            .node(node)
            .ok_or_else(|| PlanningError::validation(format!("unknown catalog node {node}")))?;

        match shape {
            CatalogNode::Unit { id, recipe_id } => {
                let items = whole_items(multiplier, node)?;
                if items <= 0 {
                    tracing::trace!(%node, %multiplier, "skipping non-positive contribution");
                    return Ok(());
                }
                visitor.unit(id, recipe_id, items)
            }
            CatalogNode::Assembly { id, components } => {
                visitor.assembly(id, multiplier)?;
                for (child, quantity) in components {
                    let scaled = quantity.checked_mul(multiplier).ok_or_else(|| {
                        PlanningError::validation(format!("quantity overflow below {node}"))
                    })?;
                    self.visit(child, scaled, depth + 1, &mut guard, visitor)?;
                }
                Ok(())
            }
        }
    }
}

fn whole_items(multiplier: Decimal, node: NodeId) -> PlanningResult<i64> {
    multiplier
        .floor()
        .to_i64()
        .ok_or_else(|| PlanningError::validation(format!("quantity overflow at {node}")))
}

fn add_count<K: Ord>(map: &mut BTreeMap<K, i64>, key: K, quantity: i64) -> PlanningResult<()> {
    let slot = map.entry(key).or_insert(0);
    *slot = slot
        .checked_add(quantity)
        .ok_or_else(|| PlanningError::validation("quantity overflow while aggregating"))?;
    Ok(())
}

#[derive(Debug, Default)]
struct RecipeTotals(BTreeMap<RecipeId, i64>);

impl DecompositionVisitor for RecipeTotals {
    fn unit(
        &mut self,
        id: FinishedUnitId,
        recipe_id: Option<RecipeId>,
        quantity: i64,
    ) -> PlanningResult<()> {
        let recipe_id = recipe_id.ok_or_else(|| {
            PlanningError::validation(format!("finished unit {id} has no linked recipe"))
        })?;
        add_count(&mut self.0, recipe_id, quantity)
    }
}

#[derive(Debug, Default)]
struct UnitTotals(BTreeMap<FinishedUnitId, i64>);

impl DecompositionVisitor for UnitTotals {
    fn unit(
        &mut self,
        id: FinishedUnitId,
        _recipe_id: Option<RecipeId>,
        quantity: i64,
    ) -> PlanningResult<()> {
        add_count(&mut self.0, id, quantity)
    }
}
