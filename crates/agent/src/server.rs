//! Control-plane HTTP server.
//!
//! Three endpoints on a deliberately small JSON protocol: status,
//! reset, actuate. Wrong method maps to 405, missing key to 400,
//! everything else answers 200 with JSON.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use probe_protocol::{
    ActuateRequest, ActuateResponse, ErrorBody, ResetResponse, RuntimeMode, StatusResponse,
};
use probe_runtime::ProbeRuntime;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

pub fn router(runtime: Arc<ProbeRuntime>) -> Router {
    Router::new()
        .route("/__probe/status", any(status))
        .route("/__probe/reset", any(reset))
        .route("/__probe/actuate", any(actuate))
        .with_state(runtime)
}

/// Bind and serve until the process exits. Returns the bound address
/// (useful with port 0) and the serving task.
pub async fn bind(
    runtime: Arc<ProbeRuntime>,
    host: &str,
    port: u16,
) -> anyhow::Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    let addr = listener.local_addr()?;
    let app = router(runtime);
    let task = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            log::error!("control plane stopped: {err}");
        }
    });
    Ok((addr, task))
}

fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorBody::method_not_allowed()),
    )
        .into_response()
}

fn missing_key() -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorBody::missing_key())).into_response()
}

async fn status(
    State(runtime): State<Arc<ProbeRuntime>>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if method != Method::GET {
        return method_not_allowed();
    }
    let Some(key) = params.get("key").map(String::as_str).filter(|k| !k.is_empty()) else {
        return missing_key();
    };
    let config = runtime.config();
    let body = StatusResponse {
        key: key.to_string(),
        hit_count: runtime.get_count(key),
        last_hit_epoch_ms: runtime.get_last_hit_epoch_ms(key),
        mode: config.mode,
        actuator_id: config.actuator_id,
        actuate_target_key: config.actuate_target_key,
        actuate_return_boolean: config.actuate_return_boolean,
    };
    (StatusCode::OK, Json(body)).into_response()
}

async fn reset(
    State(runtime): State<Arc<ProbeRuntime>>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        return method_not_allowed();
    }
    let key = params
        .get("key")
        .map(String::as_str)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .or_else(|| key_from_json_body(&body));
    let Some(key) = key else {
        return missing_key();
    };
    runtime.reset(&key);
    (StatusCode::OK, Json(ResetResponse { ok: true, key })).into_response()
}

async fn actuate(
    State(runtime): State<Arc<ProbeRuntime>>,
    method: Method,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        return method_not_allowed();
    }
    let request: ActuateRequest = if body.is_empty() {
        ActuateRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(_) => ActuateRequest::default(),
        }
    };

    // Omitted fields inherit the current runtime configuration.
    let current = runtime.config();
    let mode = request
        .mode
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .map(RuntimeMode::parse)
        .unwrap_or(current.mode);
    let actuator_id = request.actuator_id.unwrap_or(current.actuator_id);
    let target_key = request.target_key.unwrap_or(current.actuate_target_key);
    let return_boolean = request
        .return_boolean
        .unwrap_or(current.actuate_return_boolean);

    runtime.configure(mode, &actuator_id, &target_key, return_boolean);

    let effective = runtime.config();
    let body = ActuateResponse {
        ok: true,
        mode: effective.mode,
        actuator_id: effective.actuator_id,
        target_key: effective.actuate_target_key,
        return_boolean: effective.actuate_return_boolean,
    };
    (StatusCode::OK, Json(body)).into_response()
}

fn key_from_json_body(body: &Bytes) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get("key")
        .and_then(|k| k.as_str())
        .filter(|k| !k.is_empty())
        .map(str::to_string)
}
