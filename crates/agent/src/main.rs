//! Probe agent host.
//!
//! Usage: `probe-agent [-D mcp.probe.key=value]... [agent-args]`
//!
//! `agent-args` is the opaque `key=value;…` string an injector would
//! pass at attach time; `-D` pairs are the property layer and win over
//! both the args string and `MCP_PROBE_*` environment variables.

use anyhow::{Context, Result};
use probe_agent::{AgentConfig, InstrumentationDriver};
use std::collections::HashMap;

fn parse_cli(args: &[String]) -> Result<(String, HashMap<String, String>)> {
    let mut agent_args = String::new();
    let mut props = HashMap::new();
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        if arg == "-D" {
            let pair = it.next().context("-D requires key=value")?;
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("malformed property: {pair}"))?;
            props.insert(key.trim().to_string(), value.trim().to_string());
        } else if let Some(pair) = arg.strip_prefix("-D") {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("malformed property: {pair}"))?;
            props.insert(key.trim().to_string(), value.trim().to_string());
        } else if agent_args.is_empty() {
            agent_args = arg.clone();
        } else {
            anyhow::bail!("unexpected argument: {arg}");
        }
    }
    Ok((agent_args, props))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli: Vec<String> = std::env::args().skip(1).collect();
    let (agent_args, props) = parse_cli(&cli)?;
    let config = AgentConfig::from_process(&agent_args, &props);

    let runtime = probe_runtime::global();
    runtime.configure(
        config.mode,
        &config.actuator_id,
        &config.actuate_target_key,
        config.actuate_return_boolean,
    );

    if let Err(err) = probe_agent::driver::self_check() {
        log::warn!("instrumentation self-check failed: {err}");
    }

    let filter = config.compile_filter().context("invalid class filter")?;
    // Kept alive for the host to feed loaded classes through.
    let _driver = InstrumentationDriver::new(filter);

    let (addr, server) = probe_agent::server::bind(runtime, &config.host, config.port)
        .await
        .context("failed to start control-plane HTTP server")?;

    log::info!("control plane listening on http://{addr}");
    log::info!("status path:  /__probe/status?key=...");
    log::info!("reset path:   /__probe/reset");
    log::info!("actuate path: /__probe/actuate");
    log::info!("mode: {}", config.mode);
    log::info!(
        "actuatorId: {}",
        if config.actuator_id.is_empty() {
            "(none)"
        } else {
            &config.actuator_id
        }
    );
    log::info!(
        "actuateTargetKey: {}",
        if config.actuate_target_key.is_empty() {
            "(none)"
        } else {
            &config.actuate_target_key
        }
    );
    log::info!("actuateReturnBoolean: {}", config.actuate_return_boolean);
    log::info!("include: {}", config.include_patterns.join(","));
    log::info!("exclude: {}", config.exclude_patterns.join(","));

    server.await?;
    Ok(())
}
