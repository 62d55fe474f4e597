use serde::{Deserialize, Serialize};

use bakeplan_core::{Entity, FinishedUnitId, PlanningError, PlanningResult, RecipeId};

/// A produced item (a cookie, a loaf) made by exactly one recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishedUnit {
    id: FinishedUnitId,
    name: String,
    /// `None` only for legacy rows whose recipe link was lost; such units cannot
    /// be decomposed.
    recipe_id: Option<RecipeId>,
    items_per_batch: u32,
}

impl FinishedUnit {
    pub fn new(
        id: FinishedUnitId,
        name: impl Into<String>,
        recipe_id: RecipeId,
        items_per_batch: u32,
    ) -> PlanningResult<Self> {
        Self::build(id, name.into(), Some(recipe_id), items_per_batch)
    }

    /// A unit without a recipe link.
    pub fn unlinked(
        id: FinishedUnitId,
        name: impl Into<String>,
        items_per_batch: u32,
    ) -> PlanningResult<Self> {
        Self::build(id, name.into(), None, items_per_batch)
    }

    fn build(
        id: FinishedUnitId,
        name: String,
        recipe_id: Option<RecipeId>,
        items_per_batch: u32,
    ) -> PlanningResult<Self> {
        if name.trim().is_empty() {
            return Err(PlanningError::validation("finished unit name cannot be empty"));
        }
        if items_per_batch == 0 {
            return Err(PlanningError::validation(format!(
                "finished unit {name}: items per batch must be positive"
            )));
        }
        Ok(Self {
            id,
            name,
            recipe_id,
            items_per_batch,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn recipe_id(&self) -> Option<RecipeId> {
        self.recipe_id
    }

    pub fn items_per_batch(&self) -> u32 {
        self.items_per_batch
    }

    /// Batches needed to make at least `items`.
    pub fn batches_for(&self, items: i64) -> i64 {
        if items <= 0 {
            return 0;
        }
        let per_batch = i64::from(self.items_per_batch);
        items / per_batch + i64::from(items % per_batch != 0)
    }

    pub fn theoretical_yield(&self, batches: u32) -> PlanningResult<i64> {
        i64::from(batches)
            .checked_mul(i64::from(self.items_per_batch))
            .ok_or_else(|| {
                PlanningError::validation(format!(
                    "{}: {batches} batches of {} overflow the item count",
                    self.name, self.items_per_batch
                ))
            })
    }
}

impl Entity for FinishedUnit {
    type Id = FinishedUnitId;

    fn id(&self) -> FinishedUnitId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_batches_up() {
        let unit = FinishedUnit::new(FinishedUnitId::new(), "Cookie", RecipeId::new(), 24).unwrap();
        assert_eq!(unit.batches_for(0), 0);
        assert_eq!(unit.batches_for(24), 1);
        assert_eq!(unit.batches_for(25), 2);
        assert_eq!(unit.theoretical_yield(3).unwrap(), 72);
    }

    #[test]
    fn extreme_counts_do_not_wrap() {
        let unit = FinishedUnit::new(FinishedUnitId::new(), "Cookie", RecipeId::new(), 24).unwrap();
        assert_eq!(unit.batches_for(i64::MAX), i64::MAX / 24 + 1);
        assert_eq!(unit.batches_for(-5), 0);

        let wide = FinishedUnit::new(FinishedUnitId::new(), "Crumb", RecipeId::new(), u32::MAX).unwrap();
        assert_eq!(wide.batches_for(i64::MAX), i64::MAX / i64::from(u32::MAX) + 1);
        let err = wide.theoretical_yield(u32::MAX).unwrap_err();
        assert!(matches!(err, PlanningError::Validation(_)));
    }

    #[test]
    fn rejects_zero_yield() {
        let err = FinishedUnit::new(FinishedUnitId::new(), "Loaf", RecipeId::new(), 0).unwrap_err();
        assert!(matches!(err, PlanningError::Validation(_)));
    }
}
