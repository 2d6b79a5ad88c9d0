//! Control-plane wire format.
//!
//! The probe agent's HTTP endpoints speak a deliberately small JSON
//! protocol; the same types serve the agent's handlers and the
//! planner's client.

use crate::RuntimeMode;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `GET /__probe/status?key=K` response.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub key: String,
    pub hit_count: u64,
    pub last_hit_epoch_ms: i64,
    pub mode: RuntimeMode,
    pub actuator_id: String,
    pub actuate_target_key: String,
    pub actuate_return_boolean: bool,
}

/// `POST /__probe/reset` response.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResetResponse {
    pub ok: bool,
    pub key: String,
}

/// `POST /__probe/actuate` body. Omitted fields inherit the runtime's
/// current configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActuateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actuator_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_boolean: Option<bool>,
}

/// `POST /__probe/actuate` response: the effective configuration after
/// the update.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActuateResponse {
    pub ok: bool,
    pub mode: RuntimeMode,
    pub actuator_id: String,
    pub target_key: String,
    pub return_boolean: bool,
}

/// Error body for 400/405 responses (`{"error":"missing_key"}`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn missing_key() -> Self {
        Self {
            error: "missing_key".to_string(),
        }
    }

    pub fn method_not_allowed() -> Self {
        Self {
            error: "method_not_allowed".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_response_uses_camel_case_field_names() {
        let status = StatusResponse {
            key: "a.b.C#m:7".to_string(),
            hit_count: 3,
            last_hit_epoch_ms: 1_700_000_000_000,
            mode: RuntimeMode::Observe,
            actuator_id: String::new(),
            actuate_target_key: String::new(),
            actuate_return_boolean: false,
        };
        let raw = serde_json::to_string(&status).unwrap();
        assert!(raw.contains("\"hitCount\":3"));
        assert!(raw.contains("\"lastHitEpochMs\":1700000000000"));
        assert!(raw.contains("\"mode\":\"observe\""));
    }

    #[test]
    fn actuate_request_tolerates_partial_bodies() {
        let req: ActuateRequest = serde_json::from_str(r#"{"mode":"actuate"}"#).unwrap();
        assert_eq!(req.mode.as_deref(), Some("actuate"));
        assert!(req.target_key.is_none());
        assert!(req.return_boolean.is_none());

        let empty: ActuateRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.mode.is_none());
    }
}
