//! Inventory domain module: purchased ingredient lots and FIFO consumption.
//!
//! Pure domain logic; storage is reached through the [`LotLedger`] trait.

pub mod fifo;
pub mod lot;

pub use fifo::{ConsumptionMode, ConsumptionResult, LotDraw, consume, preview};
pub use lot::{Lot, LotBook, LotLedger, Purchase, StockUnit, stock_value};
