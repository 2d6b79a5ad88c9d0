//! Shared types for the path-probe runtime and planner.
//!
//! Everything that crosses a process boundary lives here: probe keys,
//! the control-plane wire format, and the planner's structured results
//! (inferred targets, request candidates, auth resolutions, execution
//! plans, verifier outcomes).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub mod key;
pub mod plan;
pub mod redact;
pub mod wire;

pub use key::{is_strict_line_key, ProbeKey, ProbeKeyError};
pub use plan::{
    AuthRequired, AuthResolution, AuthStatus, AuthStrategy, ExecutionPlan, HttpMethod,
    InferredTarget, LoginHint, PlanMode, PlanPhase, PlanStep, ReportStatus, RequestCandidate,
    RequestedPlanMode, WaitOutcome, WaitSnapshot,
};
pub use redact::{redact_header, redact_secret};
pub use wire::{ActuateRequest, ActuateResponse, ErrorBody, ResetResponse, StatusResponse};

/// Probe-side runtime mode. Anything that is not `actuate` normalizes
/// to `observe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    #[default]
    Observe,
    Actuate,
}

impl RuntimeMode {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("actuate") {
            RuntimeMode::Actuate
        } else {
            RuntimeMode::Observe
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RuntimeMode::Observe => "observe",
            RuntimeMode::Actuate => "actuate",
        }
    }
}

impl std::fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::RuntimeMode;

    #[test]
    fn mode_parse_normalizes_unknown_to_observe() {
        assert_eq!(RuntimeMode::parse("actuate"), RuntimeMode::Actuate);
        assert_eq!(RuntimeMode::parse(" ACTUATE "), RuntimeMode::Actuate);
        assert_eq!(RuntimeMode::parse("observe"), RuntimeMode::Observe);
        assert_eq!(RuntimeMode::parse("debug"), RuntimeMode::Observe);
        assert_eq!(RuntimeMode::parse(""), RuntimeMode::Observe);
    }
}
