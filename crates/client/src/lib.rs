//! Planner-side probe access.
//!
//! [`ProbeClient`] talks to the agent's control plane with bounded
//! timeouts; [`Verifier`] layers strict line-key enforcement and the
//! inline-hit wait loop on top.

mod client;
mod verify;

pub use client::{ClientError, ProbeClient};
pub use verify::{Checked, LineKeyRefusal, Verifier, WaitOptions};
