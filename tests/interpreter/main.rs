//! Integration tests for the engine, organized by feature
//!
//! These tests exercise the engine through the public API.
//!
//! ## Aggressive Test Defaults
//!
//! Tests use aggressive defaults to catch bugs early:
//! - `GC_INTERVAL_MS=0` - collect whenever the engine checks its schedule
//!
//! Override via environment variables:
//!
//! ```bash
//! cargo test                           # Default: aggressive settings
//! GC_INTERVAL_MS=30 cargo test         # Production schedule, faster runs
//! ```

mod array;
mod basics;
mod control_flow;
mod date;
mod error;
mod eval;
mod exceptions;
mod function;
mod gc;
mod host;
mod json;
mod math;
mod number;
mod object;
mod properties;
mod regexp;
mod string;
mod typeinfo;
mod weakmap;

use std::time::Duration;

use jscore::{Engine, EngineConfig, JsError, JsValue};

/// Create a new engine with aggressive defaults for testing:
/// - GC_INTERVAL_MS=0 (collect at every scheduling check) to catch GC bugs
pub fn create_test_engine() -> Engine {
    // GC_INTERVAL_MS=30 cargo test  # Production schedule
    let interval = std::env::var("GC_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);
    Engine::with_config(EngineConfig {
        gc_interval: Duration::from_millis(interval),
        ..EngineConfig::default()
    })
}

/// An engine whose collector only runs when asked to
pub fn create_manual_gc_engine() -> Engine {
    Engine::with_config(EngineConfig {
        gc_interval: Duration::from_secs(3600),
        ..EngineConfig::default()
    })
}

/// Evaluate script source; the result is the value of the last expression
/// statement. Only primitive results should be inspected after the engine
/// is gone.
#[allow(clippy::expect_used)]
pub fn eval(source: &str) -> JsValue {
    eval_result(source).expect("eval failed")
}

/// Evaluate and return the Result for error testing
pub fn eval_result(source: &str) -> Result<JsValue, JsError> {
    let mut engine = create_test_engine();
    engine.eval(source)
}

/// Helper to check if evaluation fails with an error containing a message
pub fn throws_error(source: &str, error_contains: &str) -> bool {
    match eval_result(source) {
        Err(e) => e.to_string().contains(error_contains),
        Ok(_) => false,
    }
}
