//! Test fixtures shared by the integration suites.

use std::sync::Once;

pub mod planner;

pub use planner::{date, dt, operation, RecordingPort, TestPlanner};

static INIT: Once = Once::new();

/// Install a test-friendly tracing subscriber once per process. Honors
/// `RUST_LOG` so a failing suite can be rerun with engine logs visible.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
