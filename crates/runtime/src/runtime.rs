//! Runtime configuration and the probe entry points.

use crate::hit_table::HitTable;
use crate::epoch_ms;
use probe_protocol::RuntimeMode;
use std::sync::RwLock;

/// Process-wide actuation state. All four fields publish together;
/// leaving `actuate` clears the dependent fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub mode: RuntimeMode,
    pub actuator_id: String,
    pub actuate_target_key: String,
    pub actuate_return_boolean: bool,
}

/// The probe runtime: one hit table plus one configuration cell.
///
/// The global instance backs the free functions in the crate root; the
/// struct itself is instance-constructible so tests and embedded hosts
/// can run isolated runtimes.
#[derive(Debug, Default)]
pub struct ProbeRuntime {
    hits: HitTable,
    config: RwLock<RuntimeConfig>,
}

impl ProbeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomic update of the full configuration. Any non-`actuate` mode
    /// normalizes to observe and clears actuator id, target key, and
    /// the forced boolean.
    pub fn configure(
        &self,
        mode: RuntimeMode,
        actuator_id: &str,
        target_key: &str,
        return_boolean: bool,
    ) {
        let next = match mode {
            RuntimeMode::Actuate => RuntimeConfig {
                mode: RuntimeMode::Actuate,
                actuator_id: actuator_id.trim().to_string(),
                actuate_target_key: target_key.trim().to_string(),
                actuate_return_boolean: return_boolean,
            },
            RuntimeMode::Observe => RuntimeConfig::default(),
        };
        *self.config.write().expect("runtime config poisoned") = next;
    }

    /// Consistent snapshot of all four configuration fields.
    pub fn config(&self) -> RuntimeConfig {
        self.config.read().expect("runtime config poisoned").clone()
    }

    pub fn hit(&self, key: &str) {
        if key.is_empty() {
            return;
        }
        self.hits.record(key, epoch_ms());
    }

    pub fn hit_by_class_method(&self, class: &str, method: &str) {
        if class.is_empty() || method.is_empty() {
            return;
        }
        self.hit(&format!("{class}#{method}"));
    }

    /// Line hits ignore non-positive line numbers.
    pub fn hit_line_by_class_method(&self, class: &str, method: &str, line: i64) {
        if class.is_empty() || method.is_empty() || line <= 0 {
            return;
        }
        self.hit(&format!("{class}#{method}:{line}"));
    }

    pub fn get_count(&self, key: &str) -> u64 {
        self.hits.count(key)
    }

    pub fn get_last_hit_epoch_ms(&self, key: &str) -> i64 {
        self.hits.last_hit_epoch_ms(key)
    }

    pub fn reset(&self, key: &str) {
        self.hits.reset(key);
    }

    /// True iff actuation is armed for exactly `class#method`.
    pub fn should_actuate_boolean_return(&self, class: &str, method: &str) -> bool {
        let config = self.config.read().expect("runtime config poisoned");
        if config.mode != RuntimeMode::Actuate || config.actuate_target_key.is_empty() {
            return false;
        }
        let key = format!("{class}#{method}");
        config.actuate_target_key == key
    }

    /// Branch decision for the conditional jump at
    /// `class#method:line`: `-1` use the original condition, `1` force
    /// the jump taken, `0` force fallthrough.
    pub fn branch_decision_by_class_method_line(
        &self,
        class: &str,
        method: &str,
        line: i64,
    ) -> i32 {
        if class.is_empty() || method.is_empty() || line <= 0 {
            return -1;
        }
        let config = self.config.read().expect("runtime config poisoned");
        if config.mode != RuntimeMode::Actuate || config.actuate_target_key.is_empty() {
            return -1;
        }
        let key = format!("{class}#{method}:{line}");
        if config.actuate_target_key != key {
            return -1;
        }
        if config.actuate_return_boolean {
            1
        } else {
            0
        }
    }
}
