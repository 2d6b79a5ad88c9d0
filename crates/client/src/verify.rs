//! Strict line-key enforcement and the inline-hit wait loop.
//!
//! The central correctness property: a reproduction attempt succeeds
//! only on an *inline* hit, a count delta whose timestamp is at or
//! after the inline-start epoch captured for this attempt. A non-zero
//! count alone is stale evidence, and a fresh timestamp alone is not a
//! new hit; both together are required.

use crate::client::{ClientError, ProbeClient};
use probe_protocol::{
    is_strict_line_key, ActuateRequest, ActuateResponse, ReportStatus, ResetResponse,
    StatusResponse, WaitOutcome, WaitSnapshot,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Structured refusal for method-only keys in strict line mode. Not
/// an error: the caller renders it as a result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineKeyRefusal {
    pub status: ReportStatus,
    pub key: String,
    pub hint: String,
}

impl LineKeyRefusal {
    fn for_key(key: &str) -> Self {
        Self {
            status: ReportStatus::LineKeyRequired,
            key: key.to_string(),
            hint: "strict line mode accepts only line-level keys (class#method:line); supply a \
                   line hint"
                .to_string(),
        }
    }
}

/// Either the operation's result or a strict-mode refusal.
#[derive(Debug)]
pub enum Checked<T> {
    Accepted(T),
    Refused(LineKeyRefusal),
}

#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub max_retries: u32,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 8_000,
            poll_interval_ms: 300,
            max_retries: 1,
        }
    }
}

fn epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Probe verification surface: status, reset, and wait-for-inline-hit
/// with per-key inline-start epochs.
pub struct Verifier {
    client: ProbeClient,
    strict_line: bool,
    /// Per-key epoch of the last successful reset.
    reset_epochs: Mutex<HashMap<String, i64>>,
}

impl Verifier {
    pub fn new(client: ProbeClient, strict_line: bool) -> Self {
        Self {
            client,
            strict_line,
            reset_epochs: Mutex::new(HashMap::new()),
        }
    }

    pub fn client(&self) -> &ProbeClient {
        &self.client
    }

    fn check_key(&self, key: &str) -> Option<LineKeyRefusal> {
        if self.strict_line && !is_strict_line_key(key) {
            return Some(LineKeyRefusal::for_key(key));
        }
        None
    }

    /// Record a reset epoch directly (the wait loop consults this
    /// table; tests and external reset paths feed it).
    pub fn note_reset_epoch(&self, key: &str, epoch_ms: i64) {
        self.reset_epochs
            .lock()
            .expect("reset epochs poisoned")
            .insert(key.to_string(), epoch_ms);
    }

    fn inline_start(&self, key: &str, fallback: i64) -> i64 {
        self.reset_epochs
            .lock()
            .expect("reset epochs poisoned")
            .get(key)
            .copied()
            .unwrap_or(fallback)
    }

    pub async fn status(&self, key: &str) -> Result<Checked<StatusResponse>, ClientError> {
        if let Some(refusal) = self.check_key(key) {
            return Ok(Checked::Refused(refusal));
        }
        Ok(Checked::Accepted(self.client.status(key).await?))
    }

    /// Reset the key and stamp its inline-start epoch.
    pub async fn reset(&self, key: &str) -> Result<Checked<ResetResponse>, ClientError> {
        if let Some(refusal) = self.check_key(key) {
            return Ok(Checked::Refused(refusal));
        }
        let response = self.client.reset(key).await?;
        if response.ok {
            self.note_reset_epoch(key, epoch_ms());
        }
        Ok(Checked::Accepted(response))
    }

    /// Actuation takes both method-level keys (boolean return
    /// override) and line-level keys (branch forcing); strict mode
    /// does not apply.
    pub async fn actuate(&self, overrides: &ActuateRequest) -> Result<ActuateResponse, ClientError> {
        self.client.actuate(overrides).await
    }

    /// Poll until an inline hit is observed or the budget
    /// (`timeout_ms` per attempt, `max_retries` attempts) runs out.
    pub async fn wait_for_inline_hit(
        &self,
        key: &str,
        options: WaitOptions,
    ) -> Result<Checked<WaitOutcome>, ClientError> {
        if let Some(refusal) = self.check_key(key) {
            return Ok(Checked::Refused(refusal));
        }

        let max_retries = options.max_retries.max(1);
        let mut stale_candidate: Option<WaitSnapshot> = None;
        let mut inline_start = 0;

        for attempt in 0..max_retries {
            let wait_start = epoch_ms();
            inline_start = self.inline_start(key, wait_start);

            let baseline = self.client.status(key).await?;
            if baseline.hit_count > 0 && baseline.last_hit_epoch_ms >= inline_start {
                // The key already carries an inline hit.
                return Ok(Checked::Accepted(WaitOutcome {
                    key: key.to_string(),
                    hit: true,
                    reason: None,
                    attempts: 1,
                    inline_start_epoch_ms: inline_start,
                    snapshot: Some(WaitSnapshot {
                        hit_count: baseline.hit_count,
                        last_hit_epoch_ms: baseline.last_hit_epoch_ms,
                        delta: 0,
                    }),
                    stale_candidate: None,
                }));
            }

            let deadline = Instant::now() + Duration::from_millis(options.timeout_ms);
            while Instant::now() < deadline {
                tokio::time::sleep(Duration::from_millis(options.poll_interval_ms)).await;
                let current = self.client.status(key).await?;
                let delta = current.hit_count.saturating_sub(baseline.hit_count);
                if delta == 0 {
                    continue;
                }
                let snapshot = WaitSnapshot {
                    hit_count: current.hit_count,
                    last_hit_epoch_ms: current.last_hit_epoch_ms,
                    delta,
                };
                if current.last_hit_epoch_ms >= inline_start {
                    return Ok(Checked::Accepted(WaitOutcome {
                        key: key.to_string(),
                        hit: true,
                        reason: None,
                        attempts: attempt + 1,
                        inline_start_epoch_ms: inline_start,
                        snapshot: Some(snapshot),
                        stale_candidate: None,
                    }));
                }
                // Count moved, but the timestamp predates this
                // attempt: diagnostics only, never success.
                log::debug!(
                    "stale candidate on {key}: delta={} lastHit={} < inlineStart={inline_start}",
                    snapshot.delta,
                    snapshot.last_hit_epoch_ms
                );
                stale_candidate = Some(snapshot);
            }
        }

        Ok(Checked::Accepted(WaitOutcome {
            key: key.to_string(),
            hit: false,
            reason: Some("timeout_no_inline_hit".to_string()),
            attempts: max_retries,
            inline_start_epoch_ms: inline_start,
            snapshot: None,
            stale_candidate,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_bounded() {
        let options = WaitOptions::default();
        assert!(options.timeout_ms > 0);
        assert!(options.poll_interval_ms > 0);
        assert_eq!(options.max_retries, 1);
    }

    #[tokio::test]
    async fn strict_mode_refuses_method_keys_without_touching_the_network() {
        // The base URL is unroutable; a refusal proves no HTTP happened.
        let client = ProbeClient::new("http://127.0.0.1:1").unwrap();
        let verifier = Verifier::new(client, true);

        match verifier.status("a.b.C#m").await.unwrap() {
            Checked::Refused(refusal) => {
                assert_eq!(refusal.status, ReportStatus::LineKeyRequired);
                assert_eq!(refusal.key, "a.b.C#m");
            }
            Checked::Accepted(_) => panic!("expected refusal"),
        }
        assert!(matches!(
            verifier.reset("a.b.C#m").await.unwrap(),
            Checked::Refused(_)
        ));
        assert!(matches!(
            verifier
                .wait_for_inline_hit("a.b.C#m", WaitOptions::default())
                .await
                .unwrap(),
            Checked::Refused(_)
        ));
    }

    #[tokio::test]
    async fn non_strict_mode_accepts_method_keys() {
        let client = ProbeClient::new("http://127.0.0.1:1").unwrap();
        let verifier = Verifier::new(client, false);
        // With strict mode off the client actually goes to the network
        // and surfaces unreachability.
        let err = match verifier.status("a.b.C#m").await {
            Err(err) => err,
            Ok(_) => panic!("expected transport error"),
        };
        assert!(err.to_string().contains("unreachable"));
        assert!(err.to_string().contains("port"));
    }
}
