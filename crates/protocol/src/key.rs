//! Canonical probe keys.
//!
//! A probe key names a hit location: `fq.Class#method` counts method
//! entries, `fq.Class#method:line` counts individual line hits. The two
//! forms are distinct namespaces in the hit table, and strict line mode
//! only accepts the latter.

use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static STRICT_LINE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.+#[^:]+:\d+$").expect("valid line-key regex"));

/// True when `raw` is a line-level key (`…#…:<digits>`), the only key
/// shape the verifier accepts in strict line mode.
pub fn is_strict_line_key(raw: &str) -> bool {
    STRICT_LINE_KEY.is_match(raw)
}

/// Parsed form of a probe key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ProbeKey {
    /// Fully-qualified (dotted) class name.
    pub class: String,
    /// Method name.
    pub method: String,
    /// Source line, present only for line-level keys.
    pub line: Option<u32>,
}

impl ProbeKey {
    pub fn method_level(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            method: method.into(),
            line: None,
        }
    }

    pub fn line_level(class: impl Into<String>, method: impl Into<String>, line: u32) -> Self {
        Self {
            class: class.into(),
            method: method.into(),
            line: Some(line),
        }
    }

    pub fn is_line_level(&self) -> bool {
        self.line.is_some()
    }

    /// The method-level key for this location (drops the line suffix).
    pub fn method_key(&self) -> ProbeKey {
        ProbeKey::method_level(self.class.clone(), self.method.clone())
    }
}

impl fmt::Display for ProbeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}#{}:{}", self.class, self.method, line),
            None => write!(f, "{}#{}", self.class, self.method),
        }
    }
}

/// Rejection produced when a raw string is not a well-formed probe key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeKeyError(pub String);

impl fmt::Display for ProbeKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid probe key: {}", self.0)
    }
}

impl std::error::Error for ProbeKeyError {}

impl FromStr for ProbeKey {
    type Err = ProbeKeyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        let (class, rest) = raw
            .split_once('#')
            .ok_or_else(|| ProbeKeyError(raw.to_string()))?;
        if class.is_empty() || rest.is_empty() {
            return Err(ProbeKeyError(raw.to_string()));
        }
        match rest.split_once(':') {
            Some((method, line)) => {
                if method.is_empty() {
                    return Err(ProbeKeyError(raw.to_string()));
                }
                let line: u32 = line.parse().map_err(|_| ProbeKeyError(raw.to_string()))?;
                Ok(ProbeKey::line_level(class, method, line))
            }
            None => Ok(ProbeKey::method_level(class, rest)),
        }
    }
}
