//! The in-process probe agent.
//!
//! Ties the pieces together the way a `premain` entry point would:
//! resolve the layered configuration, compile the class filter, push
//! the initial actuation state into the probe runtime, start the
//! control-plane HTTP server, and hand loaded classes through the
//! instrumentation driver.

pub mod config;
pub mod driver;
pub mod filter;
pub mod server;

pub use config::AgentConfig;
pub use driver::InstrumentationDriver;
pub use filter::ClassFilter;

/// The agent's own package as seen by the host runtime; always
/// excluded from instrumentation.
pub const AGENT_PACKAGE: &str = "io.pathprobe.agent";
