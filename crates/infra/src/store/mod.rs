//! Transactional in-memory store for catalog, lots, stock and run history.

mod state;
mod unit_of_work;

pub use state::{FinishedStock, StoreState};
pub use unit_of_work::{InMemoryStore, UnitOfWork};
