use std::sync::{RwLock, RwLockWriteGuard, TryLockError};

use rust_decimal::Decimal;
use uuid::Uuid;

use bakeplan_catalog::{
    Assembly, CatalogNode, CatalogQuery, FinishedUnit, InMemoryCatalog, Ingredient, Recipe,
};
use bakeplan_core::{
    AssemblyId, FinishedUnitId, IngredientId, LotId, NodeId, PlanningError, PlanningResult,
    RecipeId,
};
use bakeplan_inventory::{Lot, LotBook, LotLedger, Purchase, StockUnit};

use super::state::{FinishedStock, StoreState};
use crate::recorder::{AssemblyRun, ProductionRun};

/// In-memory store with single-writer units of work.
///
/// A [`UnitOfWork`] holds the write lock for its whole lifetime and works on a
/// staged copy of the state; nothing is visible to other readers until
/// [`UnitOfWork::commit`].
#[derive(Debug)]
pub struct InMemoryStore {
    id: Uuid,
    state: RwLock<StoreState>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_state(StoreState::default())
    }

    pub fn with_state(state: StoreState) -> Self {
        Self {
            id: Uuid::now_v7(),
            state: RwLock::new(state),
        }
    }

    /// Open a unit of work.
    ///
    /// Fails instead of waiting when another unit of work is open, which also
    /// catches an accidental nested `begin` on the same thread.
    ///
    /// A lock poisoned by a panicking unit of work is recovered: the committed
    /// state only changes in [`UnitOfWork::commit`], so it is never half written.
    pub fn begin(&self) -> PlanningResult<UnitOfWork<'_>> {
        let guard = match self.state.try_write() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                return Err(PlanningError::storage(
                    "a unit of work is already open on this store",
                ));
            }
            Err(TryLockError::Poisoned(poisoned)) => {
                tracing::warn!(store = %self.id, "recovering store lock poisoned by a panic");
                self.state.clear_poison();
                poisoned.into_inner()
            }
        };
        let staged = guard.clone();
        let uow = UnitOfWork {
            id: Uuid::now_v7(),
            store_id: self.id,
            guard,
            staged,
            closed: false,
        };
        tracing::debug!(unit_of_work = %uow.id, "unit of work opened");
        Ok(uow)
    }

    /// Run `f` inside a unit of work.
    ///
    /// With `Some(uow)` the caller's unit of work is reused and left open: the
    /// caller decides whether to commit. If `f` fails, the staged state goes
    /// back to what it was before the call, so earlier work on the same unit of
    /// work survives and no partial changes remain. With `None` a fresh one is
    /// opened, committed when `f` succeeds and rolled back when it fails.
    pub fn run_in_unit_of_work<T, F>(
        &self,
        uow: Option<&mut UnitOfWork<'_>>,
        f: F,
    ) -> PlanningResult<T>
    where
        F: FnOnce(&mut UnitOfWork<'_>) -> PlanningResult<T>,
    {
        match uow {
            Some(uow) => {
                if uow.store_id != self.id {
                    return Err(PlanningError::validation(
                        "unit of work belongs to a different store",
                    ));
                }
                let checkpoint = uow.staged.clone();
                f(&mut *uow).inspect_err(|_| {
                    uow.staged = checkpoint;
                    tracing::debug!(unit_of_work = %uow.id, "failed call undone");
                })
            }
            None => {
                let mut uow = self.begin()?;
                let value = f(&mut uow)?;
                uow.commit();
                Ok(value)
            }
        }
    }

    /// Read the committed state.
    ///
    /// Waits for an open unit of work to finish, so it must not be called by
    /// the thread holding one.
    pub fn read<T>(&self, f: impl FnOnce(&StoreState) -> T) -> PlanningResult<T> {
        let state = self.state.read().unwrap_or_else(|poisoned| {
            tracing::warn!(store = %self.id, "reading through a store lock poisoned by a panic");
            poisoned.into_inner()
        });
        Ok(f(&state))
    }
}

/// Exclusive, staged access to an [`InMemoryStore`].
///
/// Dropping it without calling [`commit`](Self::commit) discards every change,
/// the same as [`rollback`](Self::rollback).
pub struct UnitOfWork<'s> {
    id: Uuid,
    store_id: Uuid,
    guard: RwLockWriteGuard<'s, StoreState>,
    staged: StoreState,
    closed: bool,
}

impl std::fmt::Debug for UnitOfWork<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("id", &self.id)
            .field("store_id", &self.store_id)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl<'s> UnitOfWork<'s> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn commit(mut self) {
        std::mem::swap(&mut *self.guard, &mut self.staged);
        self.closed = true;
        tracing::info!(unit_of_work = %self.id, "unit of work committed");
    }

    /// Discard staged changes.
    pub fn rollback(mut self) {
        self.closed = true;
        tracing::debug!(unit_of_work = %self.id, "unit of work rolled back");
    }

    /// Staged state, including uncommitted changes.
    pub fn state(&self) -> &StoreState {
        &self.staged
    }

    pub fn catalog(&self) -> &InMemoryCatalog {
        &self.staged.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut InMemoryCatalog {
        &mut self.staged.catalog
    }

    pub fn lots(&self) -> &LotBook {
        &self.staged.lots
    }

    pub(crate) fn unit_stock_mut(&mut self, id: FinishedUnitId) -> &mut FinishedStock {
        self.staged.unit_stock.entry(id).or_default()
    }

    pub(crate) fn assembly_stock_mut(&mut self, id: AssemblyId) -> &mut FinishedStock {
        self.staged.assembly_stock.entry(id).or_default()
    }

    pub(crate) fn push_production_run(&mut self, run: ProductionRun) {
        self.staged.production_runs.push(run);
    }

    pub(crate) fn push_assembly_run(&mut self, run: AssemblyRun) {
        self.staged.assembly_runs.push(run);
    }
}

impl Drop for UnitOfWork<'_> {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!(unit_of_work = %self.id, "unit of work dropped without commit; rolled back");
        }
    }
}

impl CatalogQuery for UnitOfWork<'_> {
    fn node(&self, id: NodeId) -> Option<CatalogNode> {
        self.staged.catalog.node(id)
    }

    fn ingredient(&self, id: IngredientId) -> Option<&Ingredient> {
        self.staged.catalog.ingredient(id)
    }

    fn recipe(&self, id: RecipeId) -> Option<&Recipe> {
        self.staged.catalog.recipe(id)
    }

    fn finished_unit(&self, id: FinishedUnitId) -> Option<&FinishedUnit> {
        self.staged.catalog.finished_unit(id)
    }

    fn assembly(&self, id: AssemblyId) -> Option<&Assembly> {
        self.staged.catalog.assembly(id)
    }
}

impl LotLedger for UnitOfWork<'_> {
    fn stock_unit(&self, ingredient: IngredientId) -> PlanningResult<StockUnit> {
        let ingredient = self
            .staged
            .catalog
            .ingredient(ingredient)
            .ok_or_else(|| PlanningError::validation(format!("unknown ingredient {ingredient}")))?;
        Ok(StockUnit {
            unit: ingredient.purchase_unit(),
            density_g_per_ml: ingredient.density_g_per_ml(),
        })
    }

    fn lots_for(&self, ingredient: IngredientId) -> Vec<&Lot> {
        self.staged.lots.available(ingredient)
    }

    fn decrement_lot(&mut self, lot: LotId, amount: Decimal) -> PlanningResult<()> {
        self.staged.lots.decrement(lot, amount)
    }

    fn record_purchase(&mut self, purchase: Purchase) -> PlanningResult<LotId> {
        if self.staged.catalog.ingredient(purchase.ingredient_id).is_none() {
            return Err(PlanningError::validation(format!(
                "unknown ingredient {}",
                purchase.ingredient_id
            )));
        }
        let ingredient = purchase.ingredient_id;
        let id = self.staged.lots.insert(purchase)?;
        tracing::debug!(ingredient = %ingredient, lot = %id, "purchase recorded");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bakeplan_core::MeasureUnit;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn store_with_flour() -> (InMemoryStore, IngredientId) {
        let store = InMemoryStore::new();
        let flour = IngredientId::new();
        let mut uow = store.begin().unwrap();
        uow.catalog_mut()
            .add_ingredient(Ingredient::new(flour, "Flour", "dry", MeasureUnit::Gram).unwrap())
            .unwrap();
        uow.commit();
        (store, flour)
    }

    fn flour_purchase(flour: IngredientId) -> Purchase {
        Purchase {
            ingredient_id: flour,
            purchase_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            quantity: dec!(1000),
            cost_per_unit: dec!(0.002),
            supplier: Some("Mill".to_string()),
        }
    }

    #[test]
    fn commit_publishes_staged_changes() {
        let (store, flour) = store_with_flour();
        let mut uow = store.begin().unwrap();
        uow.record_purchase(flour_purchase(flour)).unwrap();
        assert_eq!(uow.lots().on_hand(flour), dec!(1000));
        uow.commit();

        let on_hand = store.read(|s| s.lots().on_hand(flour)).unwrap();
        assert_eq!(on_hand, dec!(1000));
    }

    #[test]
    fn drop_without_commit_discards_changes() {
        let (store, flour) = store_with_flour();
        {
            let mut uow = store.begin().unwrap();
            uow.record_purchase(flour_purchase(flour)).unwrap();
        }
        assert_eq!(store.read(|s| s.lots().iter().count()).unwrap(), 0);
    }

    #[test]
    fn nested_begin_is_rejected() {
        let store = InMemoryStore::new();
        let _outer = store.begin().unwrap();
        assert!(matches!(store.begin(), Err(PlanningError::Storage(_))));
    }

    #[test]
    fn run_in_unit_of_work_rolls_back_owned_work_on_error() {
        let (store, flour) = store_with_flour();
        let result: PlanningResult<()> = store.run_in_unit_of_work(None, |uow| {
            uow.record_purchase(flour_purchase(flour))?;
            Err(PlanningError::validation("boom"))
        });
        assert!(result.is_err());
        assert_eq!(store.read(|s| s.lots().iter().count()).unwrap(), 0);
    }

    #[test]
    fn run_in_unit_of_work_leaves_supplied_work_open() {
        let (store, flour) = store_with_flour();
        let mut uow = store.begin().unwrap();
        store
            .run_in_unit_of_work(Some(&mut uow), |uow| uow.record_purchase(flour_purchase(flour)))
            .unwrap();
        store
            .run_in_unit_of_work(Some(&mut uow), |uow| uow.record_purchase(flour_purchase(flour)))
            .unwrap();
        assert_eq!(uow.lots().on_hand(flour), dec!(2000));
        uow.rollback();

        assert_eq!(store.read(|s| s.lots().on_hand(flour)).unwrap(), dec!(0));
    }

    #[test]
    fn failed_call_on_supplied_work_restores_its_staged_state() {
        let (store, flour) = store_with_flour();
        let mut uow = store.begin().unwrap();
        store
            .run_in_unit_of_work(Some(&mut uow), |uow| uow.record_purchase(flour_purchase(flour)))
            .unwrap();

        let result: PlanningResult<()> = store.run_in_unit_of_work(Some(&mut uow), |uow| {
            uow.record_purchase(flour_purchase(flour))?;
            Err(PlanningError::validation("boom"))
        });
        assert!(result.is_err());
        assert_eq!(uow.lots().on_hand(flour), dec!(1000));
        uow.commit();

        assert_eq!(store.read(|s| s.lots().on_hand(flour)).unwrap(), dec!(1000));
    }

    #[test]
    fn panic_inside_a_unit_of_work_does_not_brick_the_store() {
        let (store, flour) = store_with_flour();
        std::thread::scope(|scope| {
            let crashed = scope
                .spawn(|| {
                    let mut uow = store.begin().unwrap();
                    uow.record_purchase(flour_purchase(flour)).unwrap();
                    panic!("crash while holding the unit of work");
                })
                .join();
            assert!(crashed.is_err());
        });

        assert_eq!(store.read(|s| s.lots().on_hand(flour)).unwrap(), dec!(0));
        let mut uow = store.begin().unwrap();
        uow.record_purchase(flour_purchase(flour)).unwrap();
        uow.commit();
        assert_eq!(store.read(|s| s.lots().on_hand(flour)).unwrap(), dec!(1000));
    }

    #[test]
    fn foreign_unit_of_work_is_rejected() {
        let (store, _) = store_with_flour();
        let other = InMemoryStore::new();
        let mut foreign = other.begin().unwrap();
        let err = store
            .run_in_unit_of_work(Some(&mut foreign), |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, PlanningError::Validation(_)));
    }

    #[test]
    fn purchases_of_unknown_ingredients_are_rejected() {
        let store = InMemoryStore::new();
        let mut uow = store.begin().unwrap();
        let err = uow.record_purchase(flour_purchase(IngredientId::new())).unwrap_err();
        assert!(matches!(err, PlanningError::Validation(_)));
    }
}
