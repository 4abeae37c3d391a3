//! Integration tests for the sensitivity engine
//!
//! Tests are organized by topic:
//! - `scenarios` - End-to-end reference scenarios with known answers
//! - `sobol_accuracy` - Index estimates against analytic values
//! - `pipeline` - Row order, determinism and failure isolation across stages
//! - `reporting` - Report views and their serialized form

mod pipeline;
mod scenarios;

use std::sync::Once;

use tracing_subscriber::EnvFilter;

use crate::model::ImpactDef;

static LOGGING: Once = Once::new();

/// Route library logs through the test harness writer.
///
/// `RUST_LOG` overrides the default `lca_sensitivity=debug` filter.
pub(crate) fn init_test_logging() {
    LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("lca_sensitivity=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

pub(crate) fn impacts(ids: &[&str]) -> Vec<ImpactDef> {
    ids.iter()
        .map(|id| ImpactDef::new(*id, format!("{id} impact"), "u"))
        .collect()
}

/// Absolute tolerance check with a readable failure message
pub(crate) fn assert_close(actual: f64, expected: f64, tol: f64, what: &str) {
    assert!(
        (actual - expected).abs() < tol,
        "{what}: expected {expected} ± {tol}, got {actual}"
    );
}
