//! Reproducibility planning over static sources.
//!
//! Given coarse textual hints, rank indexed methods into probe
//! targets, reconstruct the HTTP request that would exercise a target
//! naturally, resolve the authentication it needs, and compose a
//! deterministic execution plan for the natural/actuated state
//! machine. Everything here is regex-grade heuristics by design: the
//! source index over-approximates, the scoring step and the
//! cross-class guardrail compensate.

pub mod auth;
mod controller;
pub mod openapi;
pub mod plan;
pub mod request;
pub mod target;

pub use auth::{resolve_auth, AuthInput, Credentials};
pub use openapi::OpenApiDoc;
pub use plan::{build_execution_plan, PlanInput, FALLBACK_ACTUATOR_ID};
pub use request::{infer_request_candidates, resolve_request, RequestContext, ResolvedRequest};
pub use target::{infer_targets, TargetHints};
