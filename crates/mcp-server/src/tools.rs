//! Planner tools exposed over MCP.
//!
//! Every tool answers with machine-consumable `structured_content`
//! plus a human text variant rendered by placeholder substitution.

use crate::config::PlannerConfig;
use probe_client::{Checked, ClientError, LineKeyRefusal, ProbeClient, Verifier, WaitOptions};
use probe_inference::{
    build_execution_plan, infer_targets, resolve_auth, resolve_request, AuthInput, Credentials,
    PlanInput, RequestContext, TargetHints,
};
use probe_protocol::{PlanMode, ReportStatus, RequestedPlanMode};
use probe_source_index::SourceIndex;
use rmcp::handler::server::tool::{Parameters, ToolRouter};
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::schemars;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::Deserialize;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

pub mod catalog;
mod discover;
mod render;

use render::render;

/// Path-probe planner MCP service.
#[derive(Clone)]
pub struct PathProbeService {
    config: PlannerConfig,
    verifier: Arc<Verifier>,
    tool_router: ToolRouter<Self>,
}

impl PathProbeService {
    pub fn new(config: PlannerConfig) -> anyhow::Result<Self> {
        let client = ProbeClient::new(config.probe_base_url.clone())?;
        let verifier = Arc::new(Verifier::new(client, config.strict_line_keys));
        Ok(Self {
            config,
            verifier,
            tool_router: Self::tool_router(),
        })
    }
}

#[tool_handler]
impl ServerHandler for PathProbeService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Path-probe makes individual code paths observable and steerable. Use \
                 'target_infer' to turn coarse hints into a probe key, 'recipe_generate' for a \
                 full reproduction plan, and the probe_* tools to reset, poll, and actuate the \
                 in-process probe."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}

fn ok_result(text: String, structured: serde_json::Value) -> CallToolResult {
    let mut result = CallToolResult::success(vec![Content::text(text)]);
    result.structured_content = Some(structured);
    result
}

fn error_result(message: String) -> CallToolResult {
    CallToolResult::error(vec![Content::text(message)])
}

fn refusal_result(refusal: &LineKeyRefusal) -> CallToolResult {
    let structured = serde_json::to_value(refusal).unwrap_or_default();
    ok_result(
        render(
            "refused: {{key}} is a method-only key; strict line mode requires class#method:line",
            &[("key", refusal.key.clone())],
        ),
        structured,
    )
}

fn parse_requested_mode(raw: Option<&str>) -> RequestedPlanMode {
    match raw.map(|m| m.trim().to_ascii_lowercase()).as_deref() {
        Some("natural") => RequestedPlanMode::Natural,
        Some("actuated") => RequestedPlanMode::Actuated,
        _ => RequestedPlanMode::Auto,
    }
}

// ============================================================================
// Tool Input Schemas
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DebugPingRequest {
    /// Text echoed back unchanged.
    pub echo: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectsDiscoverRequest {
    /// Workspace directory to scan for build files.
    pub workspace_root: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProbeDiagnoseRequest {
    /// Probe key to sample; a synthetic key is used when omitted.
    pub key: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetInferRequest {
    /// Repository root to index.
    pub project_root: String,
    /// Class name hint, e.g. `CatalogSpecs`.
    pub class_hint: Option<String>,
    /// Method name hint, e.g. `finalPriceLte`.
    pub method_hint: Option<String>,
    /// 1-based source line hint.
    pub line_hint: Option<u32>,
    /// Maximum candidates to return (1-20, default 5).
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeGenerateRequest {
    pub project_root: String,
    pub workspace_root: Option<String>,
    pub class_hint: Option<String>,
    pub method_hint: Option<String>,
    pub line_hint: Option<u32>,
    /// `natural`, `actuated`, or `auto` (default).
    pub mode: Option<String>,
    /// Credentials are only ever taken from these explicit fields.
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth_token: Option<String>,
    /// Look for a login endpoint in OpenAPI when credentials are
    /// missing.
    pub discover_login: Option<bool>,
    /// Actuated plans force the branch taken (true, default) or the
    /// fallthrough (false).
    pub forced_taken: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProbeKeyRequest {
    /// Probe key, `fq.Class#method:line` in strict line mode.
    pub key: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProbeWaitHitRequest {
    pub key: String,
    /// Per-attempt poll budget in milliseconds (default 8000).
    pub timeout_ms: Option<u64>,
    /// Poll interval in milliseconds (default 300).
    pub poll_interval_ms: Option<u64>,
    /// Number of attempts (default 1).
    pub max_retries: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProbeActuateRequest {
    /// `observe` or `actuate`; omitted fields inherit current state.
    pub mode: Option<String>,
    pub actuator_id: Option<String>,
    pub target_key: Option<String>,
    pub return_boolean: Option<bool>,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl PathProbeService {
    #[tool(description = "Liveness echo: planner version and configured probe base URL.")]
    pub async fn debug_ping(
        &self,
        Parameters(request): Parameters<DebugPingRequest>,
    ) -> Result<CallToolResult, McpError> {
        let echo = request.echo.unwrap_or_default();
        let structured = serde_json::json!({
            "ok": true,
            "echo": echo,
            "version": env!("CARGO_PKG_VERSION"),
            "probeBaseUrl": self.config.probe_base_url,
        });
        Ok(ok_result(
            render(
                "pong ({{version}}), probe at {{base}}{{echo}}",
                &[
                    ("version", env!("CARGO_PKG_VERSION").to_string()),
                    ("base", self.config.probe_base_url.clone()),
                    (
                        "echo",
                        if echo.is_empty() {
                            String::new()
                        } else {
                            format!(": {echo}")
                        },
                    ),
                ],
            ),
            structured,
        ))
    }

    #[tool(
        description = "Discover candidate Maven/Gradle project roots under a workspace directory."
    )]
    pub async fn projects_discover(
        &self,
        Parameters(request): Parameters<ProjectsDiscoverRequest>,
    ) -> Result<CallToolResult, McpError> {
        let workspace = PathBuf::from(&request.workspace_root);
        if !workspace.is_dir() {
            return Ok(error_result(format!(
                "workspaceRoot is not a directory: {}",
                workspace.display()
            )));
        }
        let roots: Vec<String> = discover::discover_project_roots(&workspace)
            .into_iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect();
        let structured = serde_json::json!({ "roots": roots, "count": roots.len() });
        Ok(ok_result(
            render(
                "{{count}} project root(s) under {{workspace}}",
                &[
                    ("count", roots.len().to_string()),
                    ("workspace", request.workspace_root.clone()),
                ],
            ),
            structured,
        ))
    }

    #[tool(
        description = "Check probe connectivity and report the runtime's current mode and \
                       actuation state."
    )]
    pub async fn probe_diagnose(
        &self,
        Parameters(request): Parameters<ProbeDiagnoseRequest>,
    ) -> Result<CallToolResult, McpError> {
        let key = request.key.unwrap_or_else(|| "probe.Diagnose#ping".to_string());
        // Diagnosis bypasses strict line mode: it samples connectivity,
        // not line-level evidence.
        match self.verifier.client().status(&key).await {
            Ok(status) => {
                let structured = serde_json::json!({
                    "reachable": true,
                    "probeBaseUrl": self.config.probe_base_url,
                    "mode": status.mode,
                    "actuatorId": status.actuator_id,
                    "actuateTargetKey": status.actuate_target_key,
                    "actuateReturnBoolean": status.actuate_return_boolean,
                });
                Ok(ok_result(
                    render(
                        "probe reachable at {{base}} (mode={{mode}})",
                        &[
                            ("base", self.config.probe_base_url.clone()),
                            ("mode", status.mode.to_string()),
                        ],
                    ),
                    structured,
                ))
            }
            Err(err @ ClientError::Unreachable { .. }) => {
                let structured = serde_json::json!({
                    "reachable": false,
                    "probeBaseUrl": self.config.probe_base_url,
                    "error": err.to_string(),
                });
                Ok(ok_result(err.to_string(), structured))
            }
            Err(err) => Ok(error_result(err.to_string())),
        }
    }

    #[tool(
        description = "Rank repository methods against class/method/line hints and return probe \
                       keys with confidence scores."
    )]
    pub async fn target_infer(
        &self,
        Parameters(request): Parameters<TargetInferRequest>,
    ) -> Result<CallToolResult, McpError> {
        let root = PathBuf::from(&request.project_root);
        if !root.is_dir() {
            return Ok(error_result(format!(
                "projectRoot is not a directory: {}",
                root.display()
            )));
        }
        let limit = request.limit.unwrap_or(5).clamp(1, 20);
        let hints = TargetHints {
            class_hint: request.class_hint,
            method_hint: request.method_hint,
            line_hint: request.line_hint,
        };
        let index = SourceIndex::build(&root);
        let candidates = infer_targets(&index, &hints, limit);

        let summary = match candidates.first() {
            Some(best) => format!("best: {} (confidence {})", best.key, best.confidence),
            None => "no candidate matched the hints".to_string(),
        };
        let structured = serde_json::json!({
            "candidates": candidates,
            "count": candidates.len(),
        });
        Ok(ok_result(
            render(
                "{{count}} target candidate(s); {{summary}}",
                &[
                    ("count", candidates.len().to_string()),
                    ("summary", summary),
                ],
            ),
            structured,
        ))
    }

    #[tool(
        description = "Compose a full reproduction recipe: inferred target, natural request \
                       candidate, auth resolution, and a natural/actuated execution plan."
    )]
    pub async fn recipe_generate(
        &self,
        Parameters(request): Parameters<RecipeGenerateRequest>,
    ) -> Result<CallToolResult, McpError> {
        let project_root = PathBuf::from(&request.project_root);
        if !project_root.is_dir() {
            return Ok(error_result(format!(
                "projectRoot is not a directory: {}",
                project_root.display()
            )));
        }
        let workspace_root = request.workspace_root.as_ref().map(PathBuf::from);
        let requested = parse_requested_mode(request.mode.as_deref());

        let hints = TargetHints {
            class_hint: request.class_hint,
            method_hint: request.method_hint,
            line_hint: request.line_hint,
        };
        let index = SourceIndex::build(&project_root);
        let targets = infer_targets(&index, &hints, 5);
        let target = targets.first().cloned();

        let resolved = target.as_ref().and_then(|target| {
            let ctx = RequestContext {
                project_root: &project_root,
                workspace_root: workspace_root.as_deref(),
            };
            resolve_request(&ctx, target)
        });
        let candidate = resolved.as_ref().map(|r| r.candidate.clone());

        let controller_text = resolved
            .as_ref()
            .and_then(|r| r.controller_file.as_ref())
            .and_then(|path| std::fs::read_to_string(path).ok());
        let credentials = Credentials {
            username: request.username,
            password: request.password,
            auth_token: request.auth_token,
        };
        let auth = resolve_auth(&AuthInput {
            project_root: &project_root,
            endpoint_method: candidate.as_ref().map(|c| c.method),
            endpoint_path: candidate.as_ref().map(|c| c.path.as_str()),
            controller_text: controller_text.as_deref(),
            credentials: &credentials,
            discover_login: request.discover_login.unwrap_or(false),
        });

        let plan = build_execution_plan(&PlanInput {
            requested,
            target: target.as_ref(),
            line_hint: hints.line_hint,
            candidate: candidate.as_ref(),
            auth: &auth,
            forced_taken: request.forced_taken.unwrap_or(true),
        });

        let status = if target.is_none() {
            if requested == RequestedPlanMode::Actuated {
                ReportStatus::ActuatedBlocked
            } else {
                ReportStatus::TargetNotInferred
            }
        } else if plan.mode == PlanMode::Natural && (candidate.is_none() || auth.is_pending()) {
            ReportStatus::UnreachableNatural
        } else {
            ReportStatus::Ok
        };
        let next_action = match status {
            ReportStatus::Ok => "Follow the execution plan steps in order.",
            ReportStatus::TargetNotInferred => {
                "No method matched the hints; refine classHint/methodHint (and lineHint) and \
                 re-run."
            }
            ReportStatus::UnreachableNatural => {
                "The path is not reachable naturally yet; supply credentials or confirm actuated \
                 mode."
            }
            ReportStatus::ActuatedBlocked => {
                "Actuated mode needs an inferred target key; provide hints that match a method \
                 first."
            }
            ReportStatus::LineKeyRequired => "Supply a line hint for strict line verification.",
        };

        let request_candidates: Vec<_> = candidate.iter().cloned().collect();
        let structured = serde_json::json!({
            "status": status,
            "target": target,
            "requestCandidates": request_candidates,
            "auth": auth,
            "executionPlan": plan,
            "nextAction": next_action,
        });
        Ok(ok_result(
            render(
                "recipe {{status}}: mode={{mode}}, {{candidates}} candidate(s). {{next}}",
                &[
                    (
                        "status",
                        serde_json::to_value(status)
                            .ok()
                            .and_then(|v| v.as_str().map(str::to_string))
                            .unwrap_or_default(),
                    ),
                    (
                        "mode",
                        match plan.mode {
                            PlanMode::Natural => "natural".to_string(),
                            PlanMode::Actuated => "actuated".to_string(),
                        },
                    ),
                    ("candidates", request_candidates.len().to_string()),
                    ("next", next_action.to_string()),
                ],
            ),
            structured,
        ))
    }

    #[tool(description = "Hit count and last-hit timestamp for a probe key (strict line mode).")]
    pub async fn probe_status(
        &self,
        Parameters(request): Parameters<ProbeKeyRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.verifier.status(&request.key).await {
            Ok(Checked::Accepted(status)) => {
                let text = render(
                    "probe {{key}}: {{count}} hit(s), lastHitEpochMs={{last}}",
                    &[
                        ("key", status.key.clone()),
                        ("count", status.hit_count.to_string()),
                        ("last", status.last_hit_epoch_ms.to_string()),
                    ],
                );
                Ok(ok_result(
                    text,
                    serde_json::to_value(&status).unwrap_or_default(),
                ))
            }
            Ok(Checked::Refused(refusal)) => Ok(refusal_result(&refusal)),
            Err(err) => Ok(error_result(err.to_string())),
        }
    }

    #[tool(
        description = "Zero a key's counters and stamp its inline-start epoch (strict line mode)."
    )]
    pub async fn probe_reset(
        &self,
        Parameters(request): Parameters<ProbeKeyRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.verifier.reset(&request.key).await {
            Ok(Checked::Accepted(response)) => Ok(ok_result(
                render("reset {{key}}", &[("key", response.key.clone())]),
                serde_json::to_value(&response).unwrap_or_default(),
            )),
            Ok(Checked::Refused(refusal)) => Ok(refusal_result(&refusal)),
            Err(err) => Ok(error_result(err.to_string())),
        }
    }

    #[tool(
        description = "Poll a probe key until an inline hit is observed; stale hits from earlier \
                       traffic never count as success."
    )]
    pub async fn probe_wait_hit(
        &self,
        Parameters(request): Parameters<ProbeWaitHitRequest>,
    ) -> Result<CallToolResult, McpError> {
        let defaults = WaitOptions::default();
        let options = WaitOptions {
            timeout_ms: request.timeout_ms.unwrap_or(defaults.timeout_ms),
            poll_interval_ms: request
                .poll_interval_ms
                .unwrap_or(defaults.poll_interval_ms),
            max_retries: request.max_retries.unwrap_or(defaults.max_retries),
        };
        match self.verifier.wait_for_inline_hit(&request.key, options).await {
            Ok(Checked::Accepted(outcome)) => {
                let text = if outcome.hit {
                    render(
                        "inline hit on {{key}} (attempt {{attempts}})",
                        &[
                            ("key", outcome.key.clone()),
                            ("attempts", outcome.attempts.to_string()),
                        ],
                    )
                } else {
                    render(
                        "no inline hit on {{key}}: {{reason}}",
                        &[
                            ("key", outcome.key.clone()),
                            (
                                "reason",
                                outcome.reason.clone().unwrap_or_default(),
                            ),
                        ],
                    )
                };
                Ok(ok_result(
                    text,
                    serde_json::to_value(&outcome).unwrap_or_default(),
                ))
            }
            Ok(Checked::Refused(refusal)) => Ok(refusal_result(&refusal)),
            Err(err) => Ok(error_result(err.to_string())),
        }
    }

    #[tool(
        description = "Arm or disarm actuation: forced conditional branches (line keys) or \
                       forced boolean returns (method keys). Omitted fields inherit current \
                       runtime state."
    )]
    pub async fn probe_actuate(
        &self,
        Parameters(request): Parameters<ProbeActuateRequest>,
    ) -> Result<CallToolResult, McpError> {
        let overrides = probe_protocol::ActuateRequest {
            mode: request.mode,
            actuator_id: request.actuator_id,
            target_key: request.target_key,
            return_boolean: request.return_boolean,
        };
        match self.verifier.actuate(&overrides).await {
            Ok(response) => Ok(ok_result(
                render(
                    "actuation state: mode={{mode}}, targetKey={{key}}, returnBoolean={{rb}}",
                    &[
                        ("mode", response.mode.to_string()),
                        ("key", response.target_key.clone()),
                        ("rb", response.return_boolean.to_string()),
                    ],
                ),
                serde_json::to_value(&response).unwrap_or_default(),
            )),
            Err(err) => Ok(error_result(err.to_string())),
        }
    }
}
