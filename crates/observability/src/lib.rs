//! Tracing setup shared by binaries, benches and tests.

/// Subscriber installation (filters, formatting).
pub mod subscriber;

pub use subscriber::{DEFAULT_FILTER, init, init_for_tests};
