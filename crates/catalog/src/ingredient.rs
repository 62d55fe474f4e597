use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bakeplan_core::{Entity, IngredientId, MeasureUnit, PlanningError, PlanningResult};

/// Atomic raw-material type (flour, butter, gift boxes...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    id: IngredientId,
    name: String,
    category: String,
    /// Unit that lots of this ingredient are purchased and costed in.
    purchase_unit: MeasureUnit,
    /// Grams per millilitre; lets recipes measure by volume when lots are by weight.
    density_g_per_ml: Option<Decimal>,
}

impl Ingredient {
    pub fn new(
        id: IngredientId,
        name: impl Into<String>,
        category: impl Into<String>,
        purchase_unit: MeasureUnit,
    ) -> PlanningResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PlanningError::validation("ingredient name cannot be empty"));
        }
        Ok(Self {
            id,
            name,
            category: category.into(),
            purchase_unit,
            density_g_per_ml: None,
        })
    }

    pub fn with_density(mut self, density_g_per_ml: Decimal) -> PlanningResult<Self> {
        if density_g_per_ml <= Decimal::ZERO {
            return Err(PlanningError::validation(format!(
                "density must be positive (ingredient {})",
                self.name
            )));
        }
        self.density_g_per_ml = Some(density_g_per_ml);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn purchase_unit(&self) -> MeasureUnit {
        self.purchase_unit
    }

    pub fn density_g_per_ml(&self) -> Option<Decimal> {
        self.density_g_per_ml
    }
}

impl Entity for Ingredient {
    type Id = IngredientId;

    fn id(&self) -> IngredientId {
        self.id
    }
}
