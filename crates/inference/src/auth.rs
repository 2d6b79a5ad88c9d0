//! Authentication resolution.
//!
//! Combines OpenAPI security declarations, controller security
//! annotations, and user-supplied credentials. Credentials only ever
//! arrive through the explicit input fields; nothing is picked up from
//! the ambient environment.

use crate::openapi::OpenApiDoc;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use probe_protocol::{AuthRequired, AuthResolution, AuthStatus, AuthStrategy, HttpMethod};
use std::path::Path;

const SECURITY_ANNOTATIONS: &[&str] = &[
    "@PreAuthorize",
    "@Secured",
    "@RolesAllowed",
    "@SecurityRequirement",
];

/// Explicitly supplied credentials.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth_token: Option<String>,
}

impl Credentials {
    fn username(&self) -> Option<&str> {
        self.username.as_deref().filter(|v| !v.is_empty())
    }

    fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|v| !v.is_empty())
    }

    fn token(&self) -> Option<&str> {
        self.auth_token.as_deref().filter(|v| !v.is_empty())
    }
}

pub struct AuthInput<'a> {
    pub project_root: &'a Path,
    pub endpoint_method: Option<HttpMethod>,
    pub endpoint_path: Option<&'a str>,
    pub controller_text: Option<&'a str>,
    pub credentials: &'a Credentials,
    pub discover_login: bool,
}

pub fn resolve_auth(input: &AuthInput<'_>) -> AuthResolution {
    let doc = OpenApiDoc::discover(input.project_root);
    let mut notes: Vec<String> = Vec::new();

    let openapi_required = doc.as_ref().and_then(|doc| {
        let endpoint = match (input.endpoint_method, input.endpoint_path) {
            (Some(method), Some(path)) => doc.operation_security(method, path),
            _ => None,
        };
        match endpoint {
            Some(declared) => {
                notes.push(format!(
                    "OpenAPI {} declares endpoint security: {declared}",
                    doc.path.display()
                ));
                Some(declared)
            }
            None if doc.global_security() => {
                notes.push(format!(
                    "OpenAPI {} declares global security",
                    doc.path.display()
                ));
                Some(true)
            }
            None => None,
        }
    });

    let controller_secured = input
        .controller_text
        .map(|text| SECURITY_ANNOTATIONS.iter().any(|a| text.contains(a)))
        .unwrap_or(false);
    if controller_secured {
        notes.push("controller carries a declarative security annotation".to_string());
    }

    let required = controller_secured || openapi_required == Some(true);
    if !required {
        let mut resolution = AuthResolution::not_required();
        resolution.notes = notes;
        return resolution;
    }

    let strategy = doc
        .as_ref()
        .map(|d| d.security_strategy())
        .unwrap_or(AuthStrategy::Unknown);
    let credentials = input.credentials;

    let mut resolution = AuthResolution {
        required: AuthRequired::Yes,
        status: AuthStatus::Unknown,
        strategy,
        request_headers: None,
        missing: None,
        login_hint: None,
        next_action: String::new(),
        notes,
    };

    if strategy == AuthStrategy::Basic {
        match (credentials.username(), credentials.password()) {
            (Some(username), Some(password)) => {
                let encoded = BASE64.encode(format!("{username}:{password}"));
                resolution.status = AuthStatus::AutoResolved;
                resolution.request_headers = Some(vec![format!("Authorization: Basic {encoded}")]);
                resolution.next_action =
                    "Attach the Authorization header to the natural request.".to_string();
            }
            (username, password) => {
                let mut missing = Vec::new();
                if username.is_none() {
                    missing.push("username".to_string());
                }
                if password.is_none() {
                    missing.push("password".to_string());
                }
                resolution.status = AuthStatus::NeedsUserInput;
                resolution.missing = Some(missing);
                resolution.next_action =
                    "Supply username and password for basic authentication.".to_string();
            }
        }
    } else if let Some(token) = credentials.token() {
        let header = if strategy == AuthStrategy::Cookie {
            format!("Cookie: session={token}")
        } else {
            format!("Authorization: Bearer {token}")
        };
        resolution.status = AuthStatus::AutoResolved;
        resolution.request_headers = Some(vec![header]);
        resolution.next_action = "Attach the auth header to the natural request.".to_string();
    } else {
        // Prefer a bearer token; offer basic fields as a secondary
        // option when the scheme is not pinned down.
        let mut missing = vec!["authToken".to_string()];
        if strategy == AuthStrategy::Unknown {
            missing.push("username".to_string());
            missing.push("password".to_string());
        }
        resolution.status = AuthStatus::NeedsUserInput;
        resolution.missing = Some(missing);
        resolution.next_action =
            "Supply an auth token (or credentials) and re-run recipe generation.".to_string();
    }

    if resolution.status == AuthStatus::NeedsUserInput && input.discover_login {
        if let Some(doc) = &doc {
            resolution.login_hint = doc.discover_login();
        }
    }

    resolution
}
