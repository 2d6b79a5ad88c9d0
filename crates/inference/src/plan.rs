//! Deterministic execution plan state machine.

use probe_protocol::{
    redact_header, AuthResolution, ExecutionPlan, InferredTarget, PlanMode, PlanPhase, PlanStep,
    ProbeKey, RequestCandidate, RequestedPlanMode,
};

/// Actuator id stamped on plans armed by recipe generation.
pub const FALLBACK_ACTUATOR_ID: &str = "recipe_generate_fallback";

pub struct PlanInput<'a> {
    pub requested: RequestedPlanMode,
    pub target: Option<&'a InferredTarget>,
    /// Operator-supplied line hint; required for strict line-level
    /// verification.
    pub line_hint: Option<u32>,
    pub candidate: Option<&'a RequestCandidate>,
    pub auth: &'a AuthResolution,
    /// Branch direction for actuated plans: true forces the jump
    /// taken, false forces fallthrough.
    pub forced_taken: bool,
}

impl PlanInput<'_> {
    /// The line-level probe key for verification, when a line hint was
    /// given.
    fn line_key(&self) -> Option<String> {
        let target = self.target?;
        let line = self.line_hint?;
        let key: ProbeKey = target.key.parse().ok()?;
        Some(ProbeKey::line_level(key.class, key.method, line).to_string())
    }
}

/// Build the plan for the requested mode. `Auto` picks natural when a
/// request candidate exists and falls back to actuated otherwise.
pub fn build_execution_plan(input: &PlanInput<'_>) -> ExecutionPlan {
    let mode = match input.requested {
        RequestedPlanMode::Natural => PlanMode::Natural,
        RequestedPlanMode::Actuated => PlanMode::Actuated,
        RequestedPlanMode::Auto => {
            if input.candidate.is_some() {
                PlanMode::Natural
            } else {
                PlanMode::Actuated
            }
        }
    };

    match mode {
        PlanMode::Natural => natural_plan(input),
        PlanMode::Actuated => actuated_plan(input),
    }
}

fn auth_step(auth: &AuthResolution) -> Option<PlanStep> {
    if !auth.is_pending() {
        return None;
    }
    let missing = auth
        .missing
        .as_deref()
        .map(|m| m.join(", "))
        .unwrap_or_default();
    Some(PlanStep::new(
        PlanPhase::Prepare,
        "Resolve authentication",
        format!("{} Missing: {missing}.", auth.next_action),
    ))
}

fn natural_plan(input: &PlanInput<'_>) -> ExecutionPlan {
    let mut steps: Vec<PlanStep> = Vec::new();
    steps.extend(auth_step(input.auth));

    let Some(candidate) = input.candidate else {
        steps.push(PlanStep::new(
            PlanPhase::Prepare,
            "Natural path unavailable",
            match input.target {
                Some(target) => format!(
                    "No controller mapping or OpenAPI operation reaches {}; a natural HTTP \
                     request cannot be constructed.",
                    target.key
                ),
                None => "No target was inferred; nothing to reach naturally.".to_string(),
            },
        ));
        steps.push(PlanStep::new(
            PlanPhase::Verify,
            "Report limitation",
            "Report that the path is unreachable naturally and ask for explicit confirmation \
             before switching to actuated mode.",
        ));
        return ExecutionPlan {
            mode: PlanMode::Natural,
            mode_reason: "natural mode requested, but no route mapping was resolved".to_string(),
            natural_steps: steps,
            actuated_steps: Vec::new(),
        };
    };

    match input.line_key() {
        Some(line_key) => steps.push(PlanStep::new(
            PlanPhase::Prepare,
            "Reset baseline",
            format!("POST /__probe/reset with key {line_key} to zero the line counter."),
        )),
        None => steps.push(PlanStep::new(
            PlanPhase::Prepare,
            "Reset baseline",
            format!(
                "Strict line mode rejects the method-only key {}; supply a line hint so a \
                 line-level key can be reset and verified.",
                input
                    .target
                    .map(|t| t.key.as_str())
                    .unwrap_or("(unknown)")
            ),
        )),
    }

    let mut execute = format!("{} {}", candidate.method, candidate.full_url_hint);
    if let Some(headers) = &input.auth.request_headers {
        for header in headers {
            execute.push_str(&format!(" with header {}", redact_header(header)));
        }
    }
    if let Some(body) = &candidate.body_template {
        execute.push_str(&format!(" with body {body}"));
    }
    steps.push(PlanStep::new(
        PlanPhase::Execute,
        "Execute natural request",
        execute,
    ));

    let verify_key = input
        .line_key()
        .unwrap_or_else(|| input.target.map(|t| t.key.clone()).unwrap_or_default());
    steps.push(PlanStep::new(
        PlanPhase::Verify,
        "Verify line hit",
        format!(
            "Poll GET /__probe/status?key={verify_key} until an inline hit (count delta with a \
             fresh timestamp) is observed."
        ),
    ));

    ExecutionPlan {
        mode: PlanMode::Natural,
        mode_reason: "a controller/OpenAPI route reaches the target naturally".to_string(),
        natural_steps: steps,
        actuated_steps: Vec::new(),
    }
}

fn actuated_plan(input: &PlanInput<'_>) -> ExecutionPlan {
    let Some(target) = input.target else {
        // No target key: refuse to emit meaningful steps.
        return ExecutionPlan {
            mode: PlanMode::Actuated,
            mode_reason: "actuated mode requires an inferred target key; none was inferred"
                .to_string(),
            natural_steps: Vec::new(),
            actuated_steps: Vec::new(),
        };
    };

    let arm_key = input.line_key().unwrap_or_else(|| target.key.clone());
    let direction = if input.forced_taken {
        "forced-taken"
    } else {
        "forced-fallthrough"
    };

    let steps = vec![
        PlanStep::new(
            PlanPhase::Prepare,
            "Arm actuation",
            format!(
                "POST /__probe/actuate with {{\"mode\":\"actuate\",\"actuatorId\":\
                 \"{FALLBACK_ACTUATOR_ID}\",\"targetKey\":\"{arm_key}\",\"returnBoolean\":{}}} \
                 ({direction}).",
                input.forced_taken
            ),
        ),
        PlanStep::new(
            PlanPhase::Verify,
            "Trigger and verify",
            format!(
                "Trigger any reachable path into {} and require a line hit on {arm_key} via \
                 status polling.",
                target.class
            ),
        ),
        PlanStep::new(
            PlanPhase::Cleanup,
            "Disarm",
            "POST /__probe/actuate with {\"mode\":\"observe\"} to clear actuation state.",
        ),
    ];

    let mode_reason = match input.requested {
        RequestedPlanMode::Actuated => "actuated mode explicitly requested".to_string(),
        _ => {
            "actuation required: no natural route mapping was resolved for the target".to_string()
        }
    };

    ExecutionPlan {
        mode: PlanMode::Actuated,
        mode_reason,
        natural_steps: Vec::new(),
        actuated_steps: steps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use probe_protocol::{AuthStatus, AuthStrategy, HttpMethod};

    fn target() -> InferredTarget {
        InferredTarget {
            file: "CatalogSpecs.java".to_string(),
            class: "CatalogSpecs".to_string(),
            method: "finalPriceLte".to_string(),
            line: Some(13),
            signature: "public boolean finalPriceLte(String keyword) {".to_string(),
            returns_boolean: true,
            key: "com.acme.CatalogSpecs#finalPriceLte".to_string(),
            confidence: 85,
            reasons: vec![],
        }
    }

    fn candidate() -> RequestCandidate {
        RequestCandidate {
            method: HttpMethod::Get,
            path: "/catalog/items".to_string(),
            query_template: "keyword=value".to_string(),
            full_url_hint: "/catalog/items?keyword=value".to_string(),
            body_template: None,
            rationale: vec![],
        }
    }

    fn auth_ok() -> AuthResolution {
        AuthResolution::not_required()
    }

    #[test]
    fn natural_plan_with_candidate_has_reset_execute_verify() {
        let target = target();
        let candidate = candidate();
        let auth = auth_ok();
        let plan = build_execution_plan(&PlanInput {
            requested: RequestedPlanMode::Auto,
            target: Some(&target),
            line_hint: Some(14),
            candidate: Some(&candidate),
            auth: &auth,
            forced_taken: true,
        });
        assert_eq!(plan.mode, PlanMode::Natural);
        assert!(plan.actuated_steps.is_empty());
        assert!(plan.natural_steps.len() >= 3);
        let titles: Vec<&str> = plan.natural_steps.iter().map(|s| s.title.as_str()).collect();
        assert!(titles.contains(&"Execute natural request"));
        let reset = &plan.natural_steps[0];
        assert!(reset
            .instruction
            .contains("com.acme.CatalogSpecs#finalPriceLte:14"));
    }

    #[test]
    fn natural_plan_without_line_hint_notes_strict_rejection() {
        let target = target();
        let candidate = candidate();
        let auth = auth_ok();
        let plan = build_execution_plan(&PlanInput {
            requested: RequestedPlanMode::Natural,
            target: Some(&target),
            line_hint: None,
            candidate: Some(&candidate),
            auth: &auth,
            forced_taken: true,
        });
        let reset = &plan.natural_steps[0];
        assert!(reset.instruction.contains("Strict line mode"));
        assert!(reset.instruction.contains("method-only"));
    }

    #[test]
    fn auto_without_candidate_falls_back_to_actuated() {
        let target = target();
        let auth = auth_ok();
        let plan = build_execution_plan(&PlanInput {
            requested: RequestedPlanMode::Auto,
            target: Some(&target),
            line_hint: Some(14),
            candidate: None,
            auth: &auth,
            forced_taken: true,
        });
        assert_eq!(plan.mode, PlanMode::Actuated);
        assert!(plan.natural_steps.is_empty());
        let phases: Vec<PlanPhase> = plan.actuated_steps.iter().map(|s| s.phase).collect();
        assert_eq!(
            phases,
            vec![PlanPhase::Prepare, PlanPhase::Verify, PlanPhase::Cleanup]
        );
        assert!(plan.mode_reason.contains("actuation required"));
        assert!(plan.actuated_steps[0]
            .instruction
            .contains(FALLBACK_ACTUATOR_ID));
    }

    #[test]
    fn explicit_natural_without_candidate_reports_limitation() {
        let target = target();
        let auth = auth_ok();
        let plan = build_execution_plan(&PlanInput {
            requested: RequestedPlanMode::Natural,
            target: Some(&target),
            line_hint: None,
            candidate: None,
            auth: &auth,
            forced_taken: true,
        });
        assert_eq!(plan.mode, PlanMode::Natural);
        let titles: Vec<&str> = plan.natural_steps.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Natural path unavailable", "Report limitation"]);
        assert!(plan.mode_reason.contains("no route mapping"));
    }

    #[test]
    fn actuated_without_target_refuses_steps() {
        let auth = auth_ok();
        let plan = build_execution_plan(&PlanInput {
            requested: RequestedPlanMode::Actuated,
            target: None,
            line_hint: None,
            candidate: None,
            auth: &auth,
            forced_taken: true,
        });
        assert_eq!(plan.mode, PlanMode::Actuated);
        assert!(plan.actuated_steps.is_empty());
        assert!(plan.mode_reason.contains("requires an inferred target"));
    }

    #[test]
    fn pending_auth_prepends_resolve_step_and_headers_are_redacted() {
        let target = target();
        let candidate = candidate();
        let auth = AuthResolution {
            required: probe_protocol::AuthRequired::Yes,
            status: AuthStatus::NeedsUserInput,
            strategy: AuthStrategy::Bearer,
            request_headers: None,
            missing: Some(vec!["authToken".to_string()]),
            login_hint: None,
            next_action: "Supply an auth token.".to_string(),
            notes: vec![],
        };
        let plan = build_execution_plan(&PlanInput {
            requested: RequestedPlanMode::Natural,
            target: Some(&target),
            line_hint: Some(14),
            candidate: Some(&candidate),
            auth: &auth,
            forced_taken: true,
        });
        assert_eq!(plan.natural_steps[0].title, "Resolve authentication");
        assert!(plan.natural_steps[0].instruction.contains("authToken"));

        let auth = AuthResolution {
            status: AuthStatus::AutoResolved,
            request_headers: Some(vec![
                "Authorization: Bearer verysecrettoken123".to_string()
            ]),
            missing: None,
            ..auth
        };
        let plan = build_execution_plan(&PlanInput {
            requested: RequestedPlanMode::Natural,
            target: Some(&target),
            line_hint: Some(14),
            candidate: Some(&candidate),
            auth: &auth,
            forced_taken: true,
        });
        let execute = plan
            .natural_steps
            .iter()
            .find(|s| s.title == "Execute natural request")
            .unwrap();
        assert!(!execute.instruction.contains("verysecrettoken123"));
        assert!(execute.instruction.contains("Authorization: Bear"));
    }
}
