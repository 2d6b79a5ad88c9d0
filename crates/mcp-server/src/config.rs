//! Planner configuration from the environment.
//!
//! The probe base URL is the one fatal setting: without it no probe
//! verification is possible, so startup fails with a non-zero exit.
//! Credentials are deliberately NOT read here; they arrive per-call
//! through explicit tool inputs.

use anyhow::{bail, Result};

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub probe_base_url: String,
    /// Strict line mode: verification operations reject method-only
    /// keys. On by default.
    pub strict_line_keys: bool,
}

impl PlannerConfig {
    pub fn from_env() -> Result<Self> {
        let probe_base_url = match read_env("PROBE_BASE_URL") {
            Some(url) => url,
            None => {
                let host = read_env("PROBE_HOST");
                let port = read_env("PROBE_PORT");
                match (host, port) {
                    (Some(host), Some(port)) => {
                        if port.parse::<u16>().is_err() {
                            bail!("invalid PROBE_PORT: {port}");
                        }
                        format!("http://{host}:{port}")
                    }
                    _ => bail!(
                        "missing probe base URL: set PROBE_BASE_URL (e.g. \
                         http://127.0.0.1:9191) or PROBE_HOST and PROBE_PORT"
                    ),
                }
            }
        };

        let strict_line_keys = read_env("PROBE_STRICT_LINE_KEYS")
            .map(|v| !(v == "0" || v.eq_ignore_ascii_case("false")))
            .unwrap_or(true);

        Ok(Self {
            probe_base_url,
            strict_line_keys,
        })
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
