//! Planner result types: inferred targets, request candidates, auth
//! resolutions, execution plans, and verifier outcomes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Planner-side plan mode. Kept as a separate enumeration from
/// [`crate::RuntimeMode`]: the two coincide semantically today but may
/// diverge as actuators are added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PlanMode {
    Natural,
    Actuated,
}

/// Mode requested by the caller; `Auto` lets the plan builder pick
/// natural when a route was resolved and fall back to actuated
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum RequestedPlanMode {
    #[default]
    Auto,
    Natural,
    Actuated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PlanPhase {
    Prepare,
    Execute,
    Verify,
    Cleanup,
}

/// One ordered step of an execution plan.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlanStep {
    pub phase: PlanPhase,
    pub title: String,
    pub instruction: String,
}

impl PlanStep {
    pub fn new(phase: PlanPhase, title: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            phase,
            title: title.into(),
            instruction: instruction.into(),
        }
    }
}

/// Deterministic two-mode execution plan. Exactly one of the step
/// lists is populated, according to `mode`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPlan {
    pub mode: PlanMode,
    pub mode_reason: String,
    pub natural_steps: Vec<PlanStep>,
    pub actuated_steps: Vec<PlanStep>,
}

/// A method candidate ranked against the caller's textual hints.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InferredTarget {
    /// Source file the method was found in.
    pub file: String,
    /// Simple class name (primary type of the file).
    pub class: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Raw declaration line as indexed.
    pub signature: String,
    /// Whether the declared return type is the primitive boolean.
    pub returns_boolean: bool,
    /// Canonical probe key (`fq.Class#method`, line appended by the
    /// caller when strict line verification is wanted).
    pub key: String,
    /// Non-linear match score in `[0, 100]`.
    pub confidence: u32,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum HttpMethod {
    #[serde(rename = "GET")]
    Get,
    #[serde(rename = "POST")]
    Post,
    #[serde(rename = "PUT")]
    Put,
    #[serde(rename = "PATCH")]
    Patch,
    #[serde(rename = "DELETE")]
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reconstructed HTTP request that should exercise the target path.
/// Only emitted when the route was resolved from controller
/// annotations or an OpenAPI document, never fabricated.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestCandidate {
    pub method: HttpMethod,
    pub path: String,
    pub query_template: String,
    pub full_url_hint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_template: Option<serde_json::Value>,
    pub rationale: Vec<String>,
}

/// Tri-state answer to "does this endpoint require authentication".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum AuthRequired {
    #[serde(rename = "true")]
    Yes,
    #[serde(rename = "false")]
    No,
    #[serde(rename = "unknown")]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    NotRequired,
    AutoResolved,
    NeedsUserInput,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AuthStrategy {
    None,
    Bearer,
    Basic,
    Cookie,
    Unknown,
}

/// Discovered login endpoint, offered when credentials are missing.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginHint {
    pub method: HttpMethod,
    pub path: String,
    pub body_template: serde_json::Value,
}

/// Outcome of combining OpenAPI security, controller annotations, and
/// user-supplied credentials.
///
/// Invariants: `status == AutoResolved` implies `request_headers` is
/// present; `status == NeedsUserInput` implies `missing` is non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResolution {
    pub required: AuthRequired,
    pub status: AuthStatus,
    pub strategy: AuthStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_headers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_hint: Option<LoginHint>,
    pub next_action: String,
    pub notes: Vec<String>,
}

impl AuthResolution {
    pub fn not_required() -> Self {
        Self {
            required: AuthRequired::No,
            status: AuthStatus::NotRequired,
            strategy: AuthStrategy::None,
            request_headers: None,
            missing: None,
            login_hint: None,
            next_action: "No authentication needed; execute the request as-is.".to_string(),
            notes: Vec::new(),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, AuthStatus::NeedsUserInput)
    }
}

/// Terminal status of a planner report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Ok,
    TargetNotInferred,
    UnreachableNatural,
    ActuatedBlocked,
    LineKeyRequired,
}

/// One observation of a key's counters during a verifier poll.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WaitSnapshot {
    pub hit_count: u64,
    pub last_hit_epoch_ms: i64,
    /// Count delta relative to the baseline captured at wait start.
    pub delta: u64,
}

/// Result of `wait_for_inline_hit`. A success requires both a count
/// delta and a timestamp at or after the inline-start epoch; a stale
/// candidate is surfaced for diagnostics only.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WaitOutcome {
    pub key: String,
    pub hit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub attempts: u32,
    pub inline_start_epoch_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<WaitSnapshot>,
    pub stale_candidate: Option<WaitSnapshot>,
}
