//! End-to-end planner scenarios over real fixture trees.

use probe_inference::{
    build_execution_plan, infer_request_candidates, infer_targets, resolve_auth, AuthInput,
    Credentials, PlanInput, RequestContext, TargetHints,
};
use probe_protocol::{HttpMethod, PlanMode, PlanPhase, RequestedPlanMode};
use probe_source_index::SourceIndex;
use std::path::Path;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

const CATALOG_SPECS: &str = r#"package com.acme.catalog;

public class CatalogSpecs {

    public boolean finalPriceLte(String keyword) {
        return keyword != null;
    }
}
"#;

const CATALOG_CONTROLLER: &str = r#"package com.acme.catalog;

@RestController
@RequestMapping("/catalog")
public class CatalogController {

    private final CatalogSpecs specs;

    @GetMapping("/items")
    public List<Item> list(@RequestParam("keyword") String keyword) {
        return specs.finalPriceLte(keyword);
    }
}
"#;

/// Scenario 1: natural ready, query param inferred.
#[test]
fn natural_ready_with_query_param() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "src/main/java/com/acme/catalog/CatalogSpecs.java", CATALOG_SPECS);
    write(
        root,
        "src/main/java/com/acme/catalog/CatalogController.java",
        CATALOG_CONTROLLER,
    );

    let index = SourceIndex::build(root);
    let hints = TargetHints {
        class_hint: Some("CatalogSpecs".to_string()),
        method_hint: Some("finalPriceLte".to_string()),
        line_hint: None,
    };
    let targets = infer_targets(&index, &hints, 3);
    assert!(!targets.is_empty());
    let target = &targets[0];
    assert_eq!(target.key, "com.acme.catalog.CatalogSpecs#finalPriceLte");

    let ctx = RequestContext {
        project_root: root,
        workspace_root: None,
    };
    let candidates = infer_request_candidates(&ctx, target);
    assert_eq!(candidates.len(), 1);
    let candidate = &candidates[0];
    assert_eq!(candidate.method, HttpMethod::Get);
    assert_eq!(candidate.full_url_hint, "/catalog/items?keyword=value");

    let credentials = Credentials::default();
    let auth = resolve_auth(&AuthInput {
        project_root: root,
        endpoint_method: Some(candidate.method),
        endpoint_path: Some(&candidate.path),
        controller_text: None,
        credentials: &credentials,
        discover_login: false,
    });
    let plan = build_execution_plan(&PlanInput {
        requested: RequestedPlanMode::Auto,
        target: Some(target),
        line_hint: target.line,
        candidate: Some(candidate),
        auth: &auth,
        forced_taken: true,
    });
    assert_eq!(plan.mode, PlanMode::Natural);
    assert!(plan.natural_steps.len() >= 3);
    assert!(plan
        .natural_steps
        .iter()
        .any(|s| s.title == "Execute natural request"));
}

/// Scenario 2: no controller anywhere, auto mode falls back to
/// actuated with the exact prepare/verify/cleanup phases.
#[test]
fn actuated_fallback_without_controller() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "src/main/java/com/acme/catalog/CatalogSpecs.java", CATALOG_SPECS);

    let index = SourceIndex::build(root);
    let hints = TargetHints {
        class_hint: Some("CatalogSpecs".to_string()),
        method_hint: Some("finalPriceLte".to_string()),
        line_hint: None,
    };
    let targets = infer_targets(&index, &hints, 3);
    let target = &targets[0];

    let ctx = RequestContext {
        project_root: root,
        workspace_root: None,
    };
    let candidates = infer_request_candidates(&ctx, target);
    assert!(candidates.is_empty());

    let auth = probe_protocol::AuthResolution::not_required();
    let plan = build_execution_plan(&PlanInput {
        requested: RequestedPlanMode::Auto,
        target: Some(target),
        line_hint: Some(5),
        candidate: None,
        auth: &auth,
        forced_taken: true,
    });
    assert_eq!(plan.mode, PlanMode::Actuated);
    let phases: Vec<PlanPhase> = plan.actuated_steps.iter().map(|s| s.phase).collect();
    assert_eq!(
        phases,
        vec![PlanPhase::Prepare, PlanPhase::Verify, PlanPhase::Cleanup]
    );
    assert!(plan.mode_reason.to_lowercase().contains("actuation required"));
}

/// Scenario 3: cross-module PATCH; the planner is rooted at the core
/// module, the controller and OpenAPI live in a sibling web module.
#[test]
fn cross_module_patch_resolves_single_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = dir.path();
    let core = workspace.join("accounts-core");

    write(
        &core,
        "src/main/java/com/acme/accounts/DynamoDbAccountSettingsRepository.java",
        r#"package com.acme.accounts;

public class DynamoDbAccountSettingsRepository {

    public void putSettingsJson(String userId, String settingsJson) {
        table.putItem(userId, settingsJson);
    }
}
"#,
    );
    write(
        &core,
        "src/main/java/com/acme/accounts/AccountSettingsService.java",
        r#"package com.acme.accounts;

public class AccountSettingsService {

    public void updateAccountSettings(String userId, String settingsJson) {
        repository.putSettingsJson(userId, settingsJson);
    }
}
"#,
    );
    write(
        workspace,
        "accounts-web/src/main/java/com/acme/web/AccountSettingsController.java",
        r#"package com.acme.web;

@RestController
@RequestMapping("/user-accounts")
public class AccountSettingsController {

    @PatchMapping("/settings")
    public void patchSettings(@RequestParam String userId, @RequestBody SettingsDto settingsJson) {
        service.updateAccountSettings(userId, settingsJson);
    }
}
"#,
    );
    write(
        workspace,
        "docs/openapi/openapi.yaml",
        r#"openapi: 3.0.3
paths:
  /user-accounts/settings:
    patch:
      operationId: updateAccountSettings
"#,
    );

    let index = SourceIndex::build(&core);
    let hints = TargetHints {
        class_hint: Some("DynamoDbAccountSettingsRepository".to_string()),
        method_hint: Some("putSettingsJson".to_string()),
        line_hint: None,
    };
    let targets = infer_targets(&index, &hints, 3);
    let target = &targets[0];

    let ctx = RequestContext {
        project_root: &core,
        workspace_root: Some(workspace),
    };
    let candidates = infer_request_candidates(&ctx, target);
    assert_eq!(candidates.len(), 1);
    let candidate = &candidates[0];
    assert_eq!(candidate.method, HttpMethod::Patch);
    assert_eq!(candidate.path, "/user-accounts/settings");
    assert!(candidate.full_url_hint.contains("userId=value"));
    assert!(candidate.body_template.is_some());
}

/// Scenario 4: the guardrail suppresses line-only matches on an
/// unrelated class.
#[test]
fn unrelated_class_yields_no_targets() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "src/main/java/com/other/UnrelatedRepository.java",
        r#"package com.other;

public class UnrelatedRepository {

    public void notTheMethod(String input) {
        store.save(input);
    }
}
"#,
    );

    let index = SourceIndex::build(root);
    let hints = TargetHints {
        class_hint: Some("DynamoDbAccountSettingsRepository".to_string()),
        method_hint: Some("putSettingsJson".to_string()),
        line_hint: Some(41),
    };
    let targets = infer_targets(&index, &hints, 3);
    assert!(targets.is_empty());
}

/// The minPrice/maxPrice branch-precondition special case.
#[test]
fn min_price_is_omitted_when_max_price_branch_is_the_target() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "src/main/java/com/acme/shop/PriceSpecs.java",
        r#"package com.acme.shop;

public class PriceSpecs {

    public boolean maxPriceLte(Long maxPrice) {
        return true;
    }
}
"#,
    );
    write(
        root,
        "src/main/java/com/acme/shop/ShopController.java",
        r#"package com.acme.shop;

@RestController
@RequestMapping("/shop")
public class ShopController {

    @GetMapping("/items")
    public List<Item> search(@RequestParam(required = false) Long minPrice, @RequestParam(required = false) Long maxPrice, @RequestParam Integer page, @RequestParam Integer size) {
        if (minPrice != null) {
            return specs.minPriceGte(minPrice);
        } else if (maxPrice != null) {
            return specs.maxPriceLte(maxPrice);
        }
        return specs.all();
    }
}
"#,
    );

    let index = SourceIndex::build(root);
    let hints = TargetHints {
        class_hint: Some("PriceSpecs".to_string()),
        method_hint: Some("maxPriceLte".to_string()),
        line_hint: None,
    };
    let targets = infer_targets(&index, &hints, 3);
    let target = &targets[0];

    let ctx = RequestContext {
        project_root: root,
        workspace_root: None,
    };
    let candidates = infer_request_candidates(&ctx, target);
    assert_eq!(candidates.len(), 1);
    let candidate = &candidates[0];
    assert!(!candidate.full_url_hint.contains("minPrice"));
    assert!(candidate.full_url_hint.contains("maxPrice=1"));
    assert!(candidate.full_url_hint.contains("page=0"));
    assert!(candidate.full_url_hint.contains("size=1"));
    assert!(candidate
        .rationale
        .iter()
        .any(|r| r.contains("branch precondition")));
}

/// OpenAPI fallback when no controller exists but an operationId
/// matches.
#[test]
fn openapi_fallback_resolves_route_without_controller() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "src/main/java/com/acme/accounts/SettingsService.java",
        r#"package com.acme.accounts;

public class SettingsService {

    public void updateAccountSettings(String userId) {
        repository.put(userId);
    }
}
"#,
    );
    write(
        root,
        "openapi.yaml",
        r#"openapi: 3.0.3
paths:
  /user-accounts/settings:
    patch:
      operationId: updateAccountSettings
"#,
    );

    let index = SourceIndex::build(root);
    let hints = TargetHints {
        method_hint: Some("updateAccountSettings".to_string()),
        ..Default::default()
    };
    let targets = infer_targets(&index, &hints, 3);
    let target = &targets[0];

    let ctx = RequestContext {
        project_root: root,
        workspace_root: None,
    };
    let candidates = infer_request_candidates(&ctx, target);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].method, HttpMethod::Patch);
    assert_eq!(candidates[0].path, "/user-accounts/settings");
    assert!(candidates[0].body_template.is_some());
}
