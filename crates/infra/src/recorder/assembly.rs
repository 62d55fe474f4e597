use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bakeplan_catalog::{CatalogQuery, DecompositionVisitor, Decomposer, InMemoryCatalog};
use bakeplan_core::{
    AssemblyId, FinishedUnitId, NodeId, PlanningError, PlanningResult, RecipeId, RunId,
};

use super::{
    Draw, IngredientUsage, RecorderStage, ShortfallPolicy, consume_all, per_item, sum_costs,
    total_cost,
};
use crate::config::PlanningConfig;
use crate::store::UnitOfWork;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyRequest {
    pub assembly_id: AssemblyId,
    pub quantity: i64,
    pub shortfall_policy: Option<ShortfallPolicy>,
    pub assembled_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl AssemblyRequest {
    pub fn new(assembly_id: AssemblyId, quantity: i64) -> Self {
        Self {
            assembly_id,
            quantity,
            shortfall_policy: None,
            assembled_at: Utc::now(),
            notes: None,
        }
    }

    pub fn with_policy(mut self, policy: ShortfallPolicy) -> Self {
        self.shortfall_policy = Some(policy);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Finished goods drawn into an assembly run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentUsage {
    pub finished_unit_id: FinishedUnitId,
    pub quantity: i64,
    /// Average cost of the unit at the time of assembly.
    pub unit_cost: Decimal,
    pub cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyRun {
    pub id: RunId,
    pub assembly_id: AssemblyId,
    pub quantity: i64,
    pub components: Vec<ComponentUsage>,
    pub packaging: Vec<IngredientUsage>,
    pub component_cost: Decimal,
    pub packaging_cost: Decimal,
    pub total_cost: Decimal,
    pub cost_per_item: Option<Decimal>,
    pub assembled_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Finished units and packaging reached from one assembly.
struct BillOfMaterials<'c> {
    catalog: &'c InMemoryCatalog,
    units: BTreeMap<FinishedUnitId, i64>,
    packaging: Vec<Draw>,
}

impl<'c> BillOfMaterials<'c> {
    fn new(catalog: &'c InMemoryCatalog) -> Self {
        Self {
            catalog,
            units: BTreeMap::new(),
            packaging: Vec::new(),
        }
    }
}

impl DecompositionVisitor for BillOfMaterials<'_> {
    fn assembly(&mut self, id: AssemblyId, multiplier: Decimal) -> PlanningResult<()> {
        let assembly = self
            .catalog
            .assembly(id)
            .ok_or_else(|| PlanningError::validation(format!("unknown assembly {id}")))?;
        for line in assembly.packaging() {
            let overflow = || {
                PlanningError::validation(format!(
                    "packaging of assembly {id}: quantity of ingredient {} overflows",
                    line.ingredient_id
                ))
            };
            let quantity = line.quantity.checked_mul(multiplier).ok_or_else(overflow)?;
            if quantity <= Decimal::ZERO {
                continue;
            }
            match self
                .packaging
                .iter_mut()
                .find(|d| d.ingredient_id == line.ingredient_id && d.unit == line.unit)
            {
                Some(draw) => {
                    draw.quantity = draw.quantity.checked_add(quantity).ok_or_else(overflow)?
                }
                None => self.packaging.push(Draw {
                    ingredient_id: line.ingredient_id,
                    quantity,
                    unit: line.unit,
                }),
            }
        }
        Ok(())
    }

    fn unit(
        &mut self,
        id: FinishedUnitId,
        _recipe_id: Option<RecipeId>,
        quantity: i64,
    ) -> PlanningResult<()> {
        let total = self.units.entry(id).or_insert(0);
        *total = total
            .checked_add(quantity)
            .ok_or_else(|| PlanningError::validation(format!("item count overflow for unit {id}")))?;
        Ok(())
    }
}

/// Record assembling `request.quantity` of an assembly.
///
/// Nested assemblies are flattened to finished units, which are drawn from
/// finished stock; packaging from every level is consumed FIFO.
#[tracing::instrument(
    skip_all,
    fields(assembly = %request.assembly_id, quantity = request.quantity, uow = %uow.id())
)]
pub fn record_assembly(
    uow: &mut UnitOfWork<'_>,
    config: &PlanningConfig,
    request: &AssemblyRequest,
) -> PlanningResult<AssemblyRun> {
    tracing::debug!(stage = %RecorderStage::Validating);
    if uow.assembly(request.assembly_id).is_none() {
        return Err(PlanningError::validation(format!(
            "unknown assembly {}",
            request.assembly_id
        )));
    }
    if request.quantity <= 0 {
        return Err(PlanningError::validation("assembly quantity must be positive"));
    }
    let policy = request.shortfall_policy.unwrap_or(config.shortfall_policy);

    tracing::debug!(stage = %RecorderStage::Decomposing);
    let (units, packaging) = {
        let mut bill = BillOfMaterials::new(uow.catalog());
        Decomposer::new(uow.catalog())
            .with_max_depth(config.max_nesting_depth)
            .walk(NodeId::Assembly(request.assembly_id), request.quantity, &mut bill)?;
        (bill.units, bill.packaging)
    };

    tracing::debug!(
        stage = %RecorderStage::Consuming,
        units = units.len(),
        packaging = packaging.len(),
        %policy
    );
    let mut components = Vec::with_capacity(units.len());
    for (unit_id, quantity) in units {
        let cost = uow
            .unit_stock_mut(unit_id)
            .issue(NodeId::Unit(unit_id), quantity)?;
        components.push(ComponentUsage {
            finished_unit_id: unit_id,
            quantity,
            unit_cost: cost / Decimal::from(quantity),
            cost,
        });
    }
    let packaging = consume_all(uow, &packaging, policy)?;

    let component_cost = sum_costs(components.iter().map(|c| c.cost))?;
    let packaging_cost = total_cost(&packaging)?;
    let total = sum_costs([component_cost, packaging_cost])?;

    tracing::debug!(stage = %RecorderStage::Persisting, total_cost = %total);
    uow.assembly_stock_mut(request.assembly_id)
        .receive(request.quantity, total)?;
    let run = AssemblyRun {
        id: RunId::new(),
        assembly_id: request.assembly_id,
        quantity: request.quantity,
        components,
        packaging,
        component_cost,
        packaging_cost,
        total_cost: total,
        cost_per_item: per_item(total, request.quantity),
        assembled_at: request.assembled_at,
        notes: request.notes.clone(),
    };
    uow.push_assembly_run(run.clone());

    tracing::info!(run = %run.id, total_cost = %total, "assembly recorded");
    Ok(run)
}
