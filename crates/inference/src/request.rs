//! Request candidate inference: find the controller that reaches the
//! target method and reconstruct the HTTP request that exercises it.

use crate::controller::{example_value, ControllerSource, ParamKind};
use crate::openapi::OpenApiDoc;
use once_cell::sync::Lazy;
use probe_protocol::{HttpMethod, InferredTarget, RequestCandidate};
use probe_source_index::SourceIndex;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const CONTROLLER_CAP: usize = 120;
const CALLER_DEPTH: usize = 2;

static BRANCH_IF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\}?\s*(?:else\s+)?if\s*\(.+\)").expect("branch regex"));

#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    pub project_root: &'a Path,
    pub workspace_root: Option<&'a Path>,
}

/// A resolved candidate plus the controller file it came from (absent
/// for OpenAPI-only resolutions); the controller file feeds auth
/// annotation scanning.
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub candidate: RequestCandidate,
    pub controller_file: Option<PathBuf>,
}

/// Reconstruct the natural HTTP request for `target`, or nothing when
/// neither a controller mapping nor an OpenAPI operation resolves the
/// route. A fabricated `GET /` is never emitted.
pub fn infer_request_candidates(
    ctx: &RequestContext<'_>,
    target: &InferredTarget,
) -> Vec<RequestCandidate> {
    resolve_request(ctx, target)
        .map(|resolved| vec![resolved.candidate])
        .unwrap_or_default()
}

/// Same inference, keeping the controller origin.
pub fn resolve_request(
    ctx: &RequestContext<'_>,
    target: &InferredTarget,
) -> Option<ResolvedRequest> {
    let roots = search_roots(ctx);
    let index = SourceIndex::build_many(roots.clone());
    let sources: Vec<ControllerSource> = index
        .files
        .iter()
        .filter_map(|f| ControllerSource::load(&f.path))
        .collect();
    let controller_indices: Vec<usize> = sources
        .iter()
        .enumerate()
        .filter(|(_, s)| is_controller(s))
        .map(|(i, _)| i)
        .take(CONTROLLER_CAP)
        .collect();

    // Pass 1: direct invocation of the target inside a controller.
    for &ci in &controller_indices {
        let controller = &sources[ci];
        if let Some(call_line) = controller.find_call_line(&target.method) {
            let chain = vec![target.method.clone()];
            if let Some(candidate) = build_candidate(controller, call_line, &sources, &chain) {
                return Some(ResolvedRequest {
                    candidate,
                    controller_file: Some(controller.file.path.clone()),
                });
            }
        }
    }

    // Pass 2: bounded caller BFS, best-scored callers first.
    let callers = caller_bfs(&sources, &target.method, CALLER_DEPTH);
    for caller in &callers {
        for &ci in &controller_indices {
            let controller = &sources[ci];
            if let Some(call_line) = controller.find_call_line(&caller.method) {
                if let Some(candidate) =
                    build_candidate(controller, call_line, &sources, &caller.chain)
                {
                    return Some(ResolvedRequest {
                        candidate,
                        controller_file: Some(controller.file.path.clone()),
                    });
                }
            }
        }
    }

    // Pass 3: OpenAPI fallback by operationId.
    let mut names: Vec<&str> = vec![target.method.as_str()];
    names.extend(callers.iter().map(|c| c.method.as_str()));
    if let Some(doc) = OpenApiDoc::discover_any(roots.iter().map(PathBuf::as_path)) {
        if let Some((method, path)) = doc.find_operation_by_id(&names) {
            let body_template = match method {
                HttpMethod::Get | HttpMethod::Delete => None,
                _ => Some(serde_json::json!({"example": "value"})),
            };
            return Some(ResolvedRequest {
                candidate: RequestCandidate {
                    method,
                    full_url_hint: path.clone(),
                    path,
                    query_template: String::new(),
                    body_template,
                    rationale: vec![format!("operationId matched in {}", doc.path.display())],
                },
                controller_file: None,
            });
        }
    }

    None
}

/// Project root, its parent for multi-module core layouts, and the
/// workspace root as a last resort, deduplicated in order.
fn search_roots(ctx: &RequestContext<'_>) -> Vec<PathBuf> {
    let mut roots = vec![ctx.project_root.to_path_buf()];
    let name = ctx
        .project_root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_lowercase();
    if name.contains("core") {
        if let Some(parent) = ctx.project_root.parent() {
            roots.push(parent.to_path_buf());
        }
    }
    if let Some(workspace) = ctx.workspace_root {
        roots.push(workspace.to_path_buf());
    }

    let mut seen = HashSet::new();
    roots.retain(|root| {
        let canonical = root.canonicalize().unwrap_or_else(|_| root.clone());
        seen.insert(canonical)
    });
    roots
}

fn is_controller(source: &ControllerSource) -> bool {
    source
        .file
        .type_name
        .as_deref()
        .map(|t| t.contains("Controller"))
        .unwrap_or(false)
        || source.file.file_base().contains("Controller")
}

#[derive(Debug, Clone)]
struct CallerCandidate {
    method: String,
    score: i32,
    /// Caller-to-target method chain, caller first.
    chain: Vec<String>,
}

fn caller_score(source: &ControllerSource) -> i32 {
    let mut score = 0;
    let path = source.file.path.to_string_lossy().replace('\\', "/");
    if path.contains("/service/") {
        score += 4;
    }
    let class_name = source
        .file
        .type_name
        .clone()
        .unwrap_or_else(|| source.file.file_base());
    if class_name.contains("Service") {
        score += 2;
    }
    if is_controller(source) {
        score -= 2;
    }
    score
}

/// Who calls the target, and who calls them. Bounded depth, each
/// (file, method) visited once; ordered by score descending then
/// chain length ascending.
fn caller_bfs(sources: &[ControllerSource], target: &str, max_depth: usize) -> Vec<CallerCandidate> {
    let mut results: Vec<CallerCandidate> = Vec::new();
    let mut seen: HashSet<(usize, String)> = HashSet::new();
    let mut frontier: Vec<(String, Vec<String>)> =
        vec![(target.to_string(), vec![target.to_string()])];

    for _ in 0..max_depth {
        let mut next = Vec::new();
        for (callee, chain) in &frontier {
            for (file_idx, source) in sources.iter().enumerate() {
                for call_line in source.find_call_lines(callee) {
                    let Some(enclosing) = source.file.enclosing_method(call_line) else {
                        continue;
                    };
                    if enclosing.name == *callee {
                        continue;
                    }
                    if !seen.insert((file_idx, enclosing.name.clone())) {
                        continue;
                    }
                    let mut new_chain = vec![enclosing.name.clone()];
                    new_chain.extend(chain.iter().cloned());
                    results.push(CallerCandidate {
                        method: enclosing.name.clone(),
                        score: caller_score(source),
                        chain: new_chain.clone(),
                    });
                    next.push((enclosing.name.clone(), new_chain));
                }
            }
        }
        frontier = next;
    }

    results.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.chain.len().cmp(&b.chain.len()))
    });
    results
}

/// Build a candidate from a controller call site. `None` when no
/// mapping annotation resolves, even through implemented interfaces.
fn build_candidate(
    controller: &ControllerSource,
    call_line: u32,
    all_sources: &[ControllerSource],
    chain: &[String],
) -> Option<RequestCandidate> {
    let enclosing = controller.file.enclosing_method(call_line)?.clone();

    let mut base_path = controller.class_base_path();
    let mapping = controller.method_mapping(enclosing.line).or_else(|| {
        let (mapping, interface_base) =
            interface_mapping(controller, &enclosing.name, all_sources)?;
        if base_path.is_none() {
            base_path = interface_base;
        }
        Some(mapping)
    });
    let (http_method, sub_path) = mapping?;

    let mut path = join_paths(base_path.as_deref().unwrap_or(""), &sub_path);
    let params = controller.parse_params(enclosing.line);

    let window = controller.context_window(call_line, 30, 10);
    let window_text = window.join("\n");
    // Branch-precondition hint: an `else if (maxPrice != null)` next to
    // a minPrice reference means the natural request must omit
    // minPrice to take the maxPrice arm.
    let omit_min_price =
        window_text.contains("else if (maxPrice != null)") && window_text.contains("minPrice");

    let mut query_parts: Vec<String> = Vec::new();
    let mut body_template = None;
    for param in &params {
        match param.kind {
            ParamKind::Query => {
                if omit_min_price && param.request_name == "minPrice" {
                    continue;
                }
                let value = match param.request_name.as_str() {
                    "page" => "0",
                    "size" => "1",
                    _ => example_value(&param.java_type),
                };
                query_parts.push(format!("{}={}", param.request_name, value));
            }
            ParamKind::Path => {
                let value = example_value(&param.java_type);
                path = path
                    .replace(&format!("{{{}}}", param.formal_name), value)
                    .replace(&format!("{{{}}}", param.request_name), value);
            }
            ParamKind::Body => {
                body_template = Some(serde_json::json!({"example": "value"}));
            }
            ParamKind::Header | ParamKind::Unknown => {}
        }
    }

    let query_template = query_parts.join("&");
    let full_url_hint = if query_template.is_empty() {
        path.clone()
    } else {
        format!("{path}?{query_template}")
    };

    let mut rationale = vec![
        format!(
            "{} {} resolved from {} in {}",
            http_method,
            path,
            enclosing.name,
            controller.file.file_base()
        ),
        format!(
            "call chain: {} -> {}",
            enclosing.name,
            chain.join(" -> ")
        ),
    ];
    if omit_min_price {
        rationale.push("minPrice omitted so the maxPrice branch is reachable".to_string());
    }
    if let Some(hint) = branch_hint(&controller.lines, call_line) {
        rationale.push(format!("branch precondition: {hint}"));
    }

    Some(RequestCandidate {
        method: http_method,
        path,
        query_template,
        full_url_hint,
        body_template,
        rationale,
    })
}

/// The last `if (…)` / `else if (…)` line in the context window at or
/// before the call site.
fn branch_hint(lines: &[String], call_line: u32) -> Option<String> {
    let start = call_line.saturating_sub(30).max(1);
    let mut last = None;
    for number in start..=call_line {
        let Some(line) = lines.get(number as usize - 1) else {
            break;
        };
        if BRANCH_IF_RE.is_match(line) {
            last = Some(line.trim().to_string());
        }
    }
    last
}

/// When the implementation class carries no mapping, look for the same
/// method on an implemented interface.
fn interface_mapping(
    controller: &ControllerSource,
    method_name: &str,
    all_sources: &[ControllerSource],
) -> Option<((HttpMethod, String), Option<String>)> {
    let implements_line = controller
        .lines
        .iter()
        .find(|l| l.contains("implements "))?;
    let after = implements_line.split("implements ").nth(1)?;
    let interface_names: Vec<&str> = after
        .trim_end_matches('{')
        .split(',')
        .map(|n| n.trim().split('<').next().unwrap_or("").trim())
        .filter(|n| !n.is_empty())
        .collect();

    for name in interface_names {
        let Some(interface) = all_sources
            .iter()
            .find(|s| s.file.type_name.as_deref() == Some(name))
        else {
            continue;
        };
        let Some(declaration) = interface.file.methods.iter().find(|m| m.name == method_name)
        else {
            continue;
        };
        if let Some(mapping) = interface.method_mapping(declaration.line) {
            return Some((mapping, interface.class_base_path()));
        }
    }
    None
}

fn join_paths(base: &str, sub: &str) -> String {
    let base = base.trim_end_matches('/');
    let sub = sub.trim();
    let joined = if sub.is_empty() {
        base.to_string()
    } else if sub.starts_with('/') {
        format!("{base}{sub}")
    } else {
        format!("{base}/{sub}")
    };
    if joined.is_empty() {
        "/".to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_paths_normalizes_slashes() {
        assert_eq!(join_paths("/catalog", "/items"), "/catalog/items");
        assert_eq!(join_paths("/catalog/", "items"), "/catalog/items");
        assert_eq!(join_paths("", "/items"), "/items");
        assert_eq!(join_paths("/catalog", ""), "/catalog");
        assert_eq!(join_paths("", ""), "/");
    }

    #[test]
    fn core_suffixed_roots_pull_in_the_parent_module() {
        let dir = tempfile::tempdir().unwrap();
        let core = dir.path().join("accounts-core");
        std::fs::create_dir_all(&core).unwrap();
        let ctx = RequestContext {
            project_root: &core,
            workspace_root: Some(dir.path()),
        };
        let roots = search_roots(&ctx);
        // parent == workspace root here, so it deduplicates.
        assert_eq!(roots.len(), 2);
        assert!(roots[0].ends_with("accounts-core"));
    }
}
