use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bakeplan_core::{Entity, IngredientId, MeasureUnit, PlanningError, PlanningResult, RecipeId};

/// One ingredient line of a recipe, per batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeLine {
    pub ingredient_id: IngredientId,
    pub quantity: Decimal,
    pub unit: MeasureUnit,
}

/// Ingredient quantity for a number of batches, still in the recipe's unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientRequirement {
    pub ingredient_id: IngredientId,
    pub quantity: Decimal,
    pub unit: MeasureUnit,
}

/// A formula consuming ingredients in fixed ratios.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    id: RecipeId,
    name: String,
    lines: Vec<RecipeLine>,
}

impl Recipe {
    pub fn new(id: RecipeId, name: impl Into<String>, lines: Vec<RecipeLine>) -> PlanningResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PlanningError::validation("recipe name cannot be empty"));
        }

        let mut seen = HashSet::new();
        for line in &lines {
            if line.quantity <= Decimal::ZERO {
                return Err(PlanningError::validation(format!(
                    "recipe {name}: quantity for ingredient {} must be positive",
                    line.ingredient_id
                )));
            }
            if !seen.insert(line.ingredient_id) {
                return Err(PlanningError::validation(format!(
                    "recipe {name}: ingredient {} listed more than once",
                    line.ingredient_id
                )));
            }
        }

        Ok(Self { id, name, lines })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lines(&self) -> &[RecipeLine] {
        &self.lines
    }

    /// Scale every line by `batches`.
    pub fn requirements(&self, batches: Decimal) -> PlanningResult<Vec<IngredientRequirement>> {
        self.lines
            .iter()
            .map(|line| {
                let quantity = line.quantity.checked_mul(batches).ok_or_else(|| {
                    PlanningError::validation(format!(
                        "recipe {}: {batches} batches of ingredient {} overflow",
                        self.name, line.ingredient_id
                    ))
                })?;
                Ok(IngredientRequirement {
                    ingredient_id: line.ingredient_id,
                    quantity,
                    unit: line.unit,
                })
            })
            .collect()
    }
}

impl Entity for Recipe {
    type Id = RecipeId;

    fn id(&self) -> RecipeId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(ingredient_id: IngredientId, quantity: Decimal) -> RecipeLine {
        RecipeLine {
            ingredient_id,
            quantity,
            unit: MeasureUnit::Gram,
        }
    }

    #[test]
    fn scales_lines_by_batches() {
        let flour = IngredientId::new();
        let sugar = IngredientId::new();
        let recipe = Recipe::new(
            RecipeId::new(),
            "Shortbread",
            vec![line(flour, dec!(250)), line(sugar, dec!(80.5))],
        )
        .unwrap();

        let reqs = recipe.requirements(dec!(3)).unwrap();
        assert_eq!(reqs[0].quantity, dec!(750));
        assert_eq!(reqs[1].quantity, dec!(241.5));
        assert_eq!(reqs[1].ingredient_id, sugar);
    }

    #[test]
    fn scaling_overflow_is_a_validation_error() {
        let recipe = Recipe::new(RecipeId::new(), "Vat", vec![line(IngredientId::new(), dec!(1000))])
            .unwrap();
        let err = recipe.requirements(Decimal::MAX / dec!(10)).unwrap_err();
        assert!(matches!(err, PlanningError::Validation(msg) if msg.contains("overflow")));
    }

    #[test]
    fn rejects_non_positive_quantities() {
        let err = Recipe::new(RecipeId::new(), "Bad", vec![line(IngredientId::new(), dec!(0))])
            .unwrap_err();
        assert!(matches!(err, PlanningError::Validation(msg) if msg.contains("must be positive")));
    }

    #[test]
    fn rejects_duplicate_ingredient_lines() {
        let flour = IngredientId::new();
        let err = Recipe::new(
            RecipeId::new(),
            "Twice floured",
            vec![line(flour, dec!(1)), line(flour, dec!(2))],
        )
        .unwrap_err();
        assert!(matches!(err, PlanningError::Validation(msg) if msg.contains("more than once")));
    }
}
