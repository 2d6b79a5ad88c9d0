//! Path-probe planner MCP server.
//!
//! ## Tools
//!
//! - `debug_ping` - Liveness echo with version and probe base URL
//! - `projects_discover` - Candidate Maven/Gradle project roots
//! - `probe_diagnose` - Probe connectivity check with remediation
//! - `target_infer` - Hints -> ranked probe-key candidates
//! - `recipe_generate` - Target + request + auth + execution plan
//! - `probe_status` - Counters for a line-level key
//! - `probe_reset` - Zero counters, stamp the inline-start epoch
//! - `probe_wait_hit` - Poll for an inline hit
//! - `probe_actuate` - Arm/disarm branch or boolean actuation
//!
//! ## Environment
//!
//! - `PROBE_BASE_URL` (or `PROBE_HOST` + `PROBE_PORT`) - required
//! - `PROBE_STRICT_LINE_KEYS=0` - disable strict line mode
//! - `PROBE_MCP_LOG=1` - enable stderr logging

use anyhow::Result;
use rmcp::{transport::stdio, ServiceExt};
use std::env;

mod config;
mod tools;

use config::PlannerConfig;
use tools::{catalog, PathProbeService};

fn print_help() {
    println!("Path-probe planner MCP server");
    println!();
    println!("Usage: probe-mcp [--print-tools|--version|--help]");
    println!();
    println!("Env:");
    println!("  PROBE_BASE_URL          Probe control-plane base URL (required)");
    println!("  PROBE_HOST, PROBE_PORT  Alternative to PROBE_BASE_URL");
    println!("  PROBE_STRICT_LINE_KEYS  Set to 0 to accept method-only keys");
    println!("  PROBE_MCP_LOG           Set to 1 to log to stderr");
}

fn handle_cli_args() -> Option<i32> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        return None;
    }

    match args[0].as_str() {
        "--stdio" | "stdio" => {
            // Compatibility: some MCP clients unconditionally pass
            // `--stdio`.
            None
        }
        "--print-tools" => {
            println!("{}", catalog::tool_inventory_json(env!("CARGO_PKG_VERSION")));
            Some(0)
        }
        "--version" | "-V" => {
            println!("probe-mcp {}", env!("CARGO_PKG_VERSION"));
            Some(0)
        }
        "--help" | "-h" => {
            print_help();
            Some(0)
        }
        other => {
            // Be permissive with wrapper-injected arguments; starting
            // the server beats failing the toolchain.
            if logging_enabled() {
                log::warn!("ignoring unknown argument: {other}");
            }
            None
        }
    }
}

fn logging_enabled() -> bool {
    // Protocol purity: stdout carries MCP only, and some clients merge
    // stderr into stdout, so logging stays opt-in.
    std::env::var("PROBE_MCP_LOG")
        .ok()
        .map(|v| {
            let v = v.trim();
            !(v.is_empty() || v == "0" || v.eq_ignore_ascii_case("false"))
        })
        .unwrap_or(false)
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Some(code) = handle_cli_args() {
        std::process::exit(code);
    }

    if logging_enabled() {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .target(env_logger::Target::Stderr)
            .init();
    }

    // Fatal configuration errors exit non-zero before any MCP traffic.
    let config = PlannerConfig::from_env()?;
    if logging_enabled() {
        log::info!(
            "starting probe-mcp against {} (strict line keys: {})",
            config.probe_base_url,
            config.strict_line_keys
        );
    }

    let service = PathProbeService::new(config)?;
    let server = service.serve(stdio()).await?;
    server.waiting().await?;

    if logging_enabled() {
        log::info!("probe-mcp stopped");
    }
    Ok(())
}
