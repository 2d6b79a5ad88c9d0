//! OpenAPI document lookup: route fallback, security declarations,
//! and login-endpoint discovery.

use probe_protocol::{AuthStrategy, HttpMethod, LoginHint};
use serde_yaml::Value;
use std::path::{Path, PathBuf};

const CANDIDATE_FILES: &[&str] = &[
    "docs/openapi/openapi.yaml",
    "docs/openapi/openapi.yml",
    "openapi.yaml",
    "openapi.yml",
    "swagger.yaml",
    "swagger.yml",
];

const LOGIN_KEYWORDS: &[&str] = &[
    "login",
    "signin",
    "sign-in",
    "token",
    "auth",
    "authenticate",
    "session",
];

const OPERATION_METHODS: &[(&str, HttpMethod)] = &[
    ("get", HttpMethod::Get),
    ("post", HttpMethod::Post),
    ("put", HttpMethod::Put),
    ("patch", HttpMethod::Patch),
    ("delete", HttpMethod::Delete),
];

/// A parsed OpenAPI (or Swagger) document.
pub struct OpenApiDoc {
    pub path: PathBuf,
    root: Value,
}

impl OpenApiDoc {
    /// First available document under `root`, in the conventional
    /// locations.
    pub fn discover(root: &Path) -> Option<OpenApiDoc> {
        for relative in CANDIDATE_FILES {
            let candidate = root.join(relative);
            if !candidate.is_file() {
                continue;
            }
            match Self::load(&candidate) {
                Some(doc) => return Some(doc),
                None => log::warn!("unparseable OpenAPI file: {}", candidate.display()),
            }
        }
        None
    }

    /// First available document across several roots.
    pub fn discover_any<'a>(roots: impl IntoIterator<Item = &'a Path>) -> Option<OpenApiDoc> {
        roots.into_iter().find_map(Self::discover)
    }

    pub fn load(path: &Path) -> Option<OpenApiDoc> {
        let raw = std::fs::read_to_string(path).ok()?;
        let root: Value = serde_yaml::from_str(&raw).ok()?;
        Some(OpenApiDoc {
            path: path.to_path_buf(),
            root,
        })
    }

    fn paths(&self) -> Option<&serde_yaml::Mapping> {
        self.root.get("paths")?.as_mapping()
    }

    /// Find an operation whose `operationId` matches one of `names`
    /// (case-insensitive). Returns method and path template.
    pub fn find_operation_by_id(&self, names: &[&str]) -> Option<(HttpMethod, String)> {
        let paths = self.paths()?;
        for (path, operations) in paths {
            let Some(path) = path.as_str() else { continue };
            for (verb, method) in OPERATION_METHODS {
                let Some(operation) = operations.get(*verb) else {
                    continue;
                };
                let Some(id) = operation.get("operationId").and_then(Value::as_str) else {
                    continue;
                };
                if names.iter().any(|name| id.eq_ignore_ascii_case(name)) {
                    return Some((*method, path.to_string()));
                }
            }
        }
        None
    }

    /// Whether the given operation declares security. `Some(false)`
    /// means an explicit empty `security: []` override; `None` means
    /// the operation (or document) says nothing, in which case the
    /// global declaration applies.
    pub fn operation_security(&self, method: HttpMethod, path: &str) -> Option<bool> {
        let verb = method.as_str().to_ascii_lowercase();
        let security = self
            .root
            .get("paths")?
            .get(path)?
            .get(verb.as_str())?
            .get("security")?;
        Some(security.as_sequence().map(|s| !s.is_empty()).unwrap_or(false))
    }

    /// Whether the document declares global security requirements.
    pub fn global_security(&self) -> bool {
        self.root
            .get("security")
            .and_then(Value::as_sequence)
            .map(|s| !s.is_empty())
            .unwrap_or(false)
    }

    /// Auth strategy from the first declared security scheme.
    pub fn security_strategy(&self) -> AuthStrategy {
        let Some(schemes) = self
            .root
            .get("components")
            .and_then(|c| c.get("securitySchemes"))
            .and_then(Value::as_mapping)
        else {
            return AuthStrategy::Unknown;
        };
        for (_, scheme) in schemes {
            let scheme_type = scheme.get("type").and_then(Value::as_str).unwrap_or("");
            match scheme_type {
                "http" => {
                    let http_scheme = scheme.get("scheme").and_then(Value::as_str).unwrap_or("");
                    if http_scheme.eq_ignore_ascii_case("bearer") {
                        return AuthStrategy::Bearer;
                    }
                    if http_scheme.eq_ignore_ascii_case("basic") {
                        return AuthStrategy::Basic;
                    }
                }
                "apiKey" => {
                    let location = scheme.get("in").and_then(Value::as_str).unwrap_or("");
                    if location.eq_ignore_ascii_case("cookie") {
                        return AuthStrategy::Cookie;
                    }
                }
                _ => {}
            }
        }
        AuthStrategy::Unknown
    }

    /// First `POST` operation that looks like a login endpoint: its
    /// path or body schema mentions a login keyword and the body
    /// schema carries a `password` property.
    pub fn discover_login(&self) -> Option<LoginHint> {
        let paths = self.paths()?;
        for (path, operations) in paths {
            let Some(path) = path.as_str() else { continue };
            let Some(operation) = operations.get("post") else {
                continue;
            };
            let properties = body_schema_properties(operation);
            let has_password = properties.iter().any(|p| p.eq_ignore_ascii_case("password"));
            if !has_password {
                continue;
            }
            let path_lc = path.to_lowercase();
            let keyword_match = LOGIN_KEYWORDS.iter().any(|kw| path_lc.contains(kw))
                || properties
                    .iter()
                    .any(|p| LOGIN_KEYWORDS.iter().any(|kw| p.to_lowercase().contains(kw)));
            if !keyword_match {
                continue;
            }
            let has_email = properties.iter().any(|p| p.eq_ignore_ascii_case("email"));
            let body_template = if has_email {
                serde_json::json!({"email": "value", "password": "value"})
            } else {
                serde_json::json!({"username": "value", "password": "value"})
            };
            return Some(LoginHint {
                method: HttpMethod::Post,
                path: path.to_string(),
                body_template,
            });
        }
        None
    }
}

fn body_schema_properties(operation: &Value) -> Vec<String> {
    let Some(content) = operation
        .get("requestBody")
        .and_then(|b| b.get("content"))
        .and_then(Value::as_mapping)
    else {
        return Vec::new();
    };
    for (_, media) in content {
        let Some(properties) = media
            .get("schema")
            .and_then(|s| s.get("properties"))
            .and_then(Value::as_mapping)
        else {
            continue;
        };
        return properties
            .keys()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
    }
    Vec::new()
}
