use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bakeplan_catalog::InMemoryCatalog;
use bakeplan_core::{AssemblyId, FinishedUnitId, NodeId, PlanningError, PlanningResult};
use bakeplan_inventory::LotBook;

use crate::recorder::{AssemblyRun, ProductionRun};

/// On-hand count and weighted-average cost of a produced item.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishedStock {
    pub on_hand: i64,
    pub average_cost: Decimal,
}

impl FinishedStock {
    /// Add `quantity` items that cost `total_cost` together.
    ///
    /// On overflow the stock is left as it was.
    pub fn receive(&mut self, quantity: i64, total_cost: Decimal) -> PlanningResult<()> {
        if quantity <= 0 {
            return Ok(());
        }
        let overflow = || PlanningError::validation(format!("receiving {quantity} items overflows stock"));
        let on_hand = self.on_hand.checked_add(quantity).ok_or_else(overflow)?;
        let held = Decimal::from(self.on_hand.max(0));
        let incoming = Decimal::from(quantity);
        let average_cost = held
            .checked_mul(self.average_cost)
            .and_then(|value| value.checked_add(total_cost))
            .and_then(|value| value.checked_div(held + incoming))
            .ok_or_else(overflow)?;
        self.average_cost = average_cost;
        self.on_hand = on_hand;
        Ok(())
    }

    /// Take `quantity` items out; returns their cost at the current average.
    pub fn issue(&mut self, item: NodeId, quantity: i64) -> PlanningResult<Decimal> {
        if quantity > self.on_hand {
            return Err(PlanningError::InsufficientStock {
                item,
                needed: quantity,
                available: self.on_hand,
            });
        }
        let cost = Decimal::from(quantity)
            .checked_mul(self.average_cost)
            .ok_or_else(|| PlanningError::validation(format!("cost of {quantity} {item} overflows")))?;
        self.on_hand -= quantity;
        Ok(cost)
    }
}

/// Everything a unit of work stages and commits as one piece.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub(crate) catalog: InMemoryCatalog,
    pub(crate) lots: LotBook,
    pub(crate) unit_stock: HashMap<FinishedUnitId, FinishedStock>,
    pub(crate) assembly_stock: HashMap<AssemblyId, FinishedStock>,
    pub(crate) production_runs: Vec<ProductionRun>,
    pub(crate) assembly_runs: Vec<AssemblyRun>,
}

impl StoreState {
    pub fn catalog(&self) -> &InMemoryCatalog {
        &self.catalog
    }

    pub fn lots(&self) -> &LotBook {
        &self.lots
    }

    pub fn unit_stock(&self, id: FinishedUnitId) -> FinishedStock {
        self.unit_stock.get(&id).copied().unwrap_or_default()
    }

    pub fn assembly_stock(&self, id: AssemblyId) -> FinishedStock {
        self.assembly_stock.get(&id).copied().unwrap_or_default()
    }

    /// Production history, oldest first.
    pub fn production_runs(&self) -> &[ProductionRun] {
        &self.production_runs
    }

    pub fn assembly_runs(&self) -> &[AssemblyRun] {
        &self.assembly_runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn receive_keeps_a_weighted_average() {
        let mut stock = FinishedStock::default();
        stock.receive(10, dec!(5.00)).unwrap();
        assert_eq!(stock.average_cost, dec!(0.5));

        stock.receive(30, dec!(27.00)).unwrap();
        assert_eq!(stock.on_hand, 40);
        assert_eq!(stock.average_cost, dec!(0.8));

        stock.receive(0, dec!(99)).unwrap();
        assert_eq!(stock.on_hand, 40);
        assert_eq!(stock.average_cost, dec!(0.8));
    }

    #[test]
    fn issue_refuses_to_go_negative() {
        let item = NodeId::Unit(FinishedUnitId::new());
        let mut stock = FinishedStock::default();
        stock.receive(4, dec!(2)).unwrap();

        let err = stock.issue(item, 5).unwrap_err();
        assert_eq!(
            err,
            PlanningError::InsufficientStock {
                item,
                needed: 5,
                available: 4
            }
        );
        assert_eq!(stock.issue(item, 3).unwrap(), dec!(1.5));
        assert_eq!(stock.on_hand, 1);
    }

    #[test]
    fn overflowing_receipts_leave_stock_untouched() {
        let mut stock = FinishedStock::default();
        stock.receive(2, Decimal::MAX).unwrap();
        let before = stock;

        let err = stock.receive(1, Decimal::MAX).unwrap_err();
        assert!(matches!(err, PlanningError::Validation(_)), "{err:?}");
        assert_eq!(stock, before);

        let err = stock.receive(i64::MAX, dec!(1)).unwrap_err();
        assert!(matches!(err, PlanningError::Validation(_)), "{err:?}");
        assert_eq!(stock, before);
    }
}
