//! In-process probe runtime.
//!
//! Holds the concurrent hit table and the process-wide runtime
//! configuration, and exposes the entry points instrumented code calls
//! on the application's own threads. Those entry points stay
//! allocation-light: counter updates are plain atomics, configuration
//! reads take a short read lock over one small struct.

use once_cell::sync::Lazy;
use probe_protocol::RuntimeMode;
use std::sync::Arc;

mod hit_table;
mod runtime;

pub use hit_table::{HitRecord, HitTable};
pub use runtime::{ProbeRuntime, RuntimeConfig};

static GLOBAL: Lazy<Arc<ProbeRuntime>> = Lazy::new(|| Arc::new(ProbeRuntime::new()));

/// The process-global runtime instance. Instrumented code and the
/// control plane both go through this; tests construct their own
/// [`ProbeRuntime`] instances instead.
pub fn global() -> Arc<ProbeRuntime> {
    GLOBAL.clone()
}

/// Milliseconds since the Unix epoch.
pub fn epoch_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

// Free-function entry points for instrumented code, delegating to the
// global instance.

pub fn hit_by_class_method(class: &str, method: &str) {
    GLOBAL.hit_by_class_method(class, method);
}

pub fn hit_line_by_class_method(class: &str, method: &str, line: i64) {
    GLOBAL.hit_line_by_class_method(class, method, line);
}

pub fn should_actuate_boolean_return(class: &str, method: &str) -> bool {
    GLOBAL.should_actuate_boolean_return(class, method)
}

pub fn actuate_return_boolean() -> bool {
    GLOBAL.config().actuate_return_boolean
}

pub fn branch_decision_by_class_method_line(class: &str, method: &str, line: i64) -> i32 {
    GLOBAL.branch_decision_by_class_method_line(class, method, line)
}

pub fn configure(mode: RuntimeMode, actuator_id: &str, target_key: &str, return_boolean: bool) {
    GLOBAL.configure(mode, actuator_id, target_key, return_boolean);
}
