//! `tracing-subscriber` installation.
//!
//! Events are written as JSON lines. The filter comes from `RUST_LOG` and falls
//! back to a fixed default when it is unset or invalid.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info";

const TEST_FILTER: &str = "warn,bakeplan_infra=debug,bakeplan_inventory=debug";

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the process-wide JSON subscriber.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(DEFAULT_FILTER))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

/// Like [`init`], but writes through the test harness so output is captured per
/// test, and shows recorder stages and lot draws.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(TEST_FILTER))
        .json()
        .with_test_writer()
        .try_init();
}
