//! Layered agent configuration.
//!
//! The opaque `key=value;…` startup argument string is the lowest
//! layer; `MCP_PROBE_*` environment variables override it, and
//! explicit `mcp.probe.*` properties (the `-D` flags of the host
//! launcher) override both. When no include pattern survives the
//! layers, the default is inferred from the launch command's entry
//! point; inference failure fails closed (empty include, nothing
//! instrumented).

use crate::filter::ClassFilter;
use crate::AGENT_PACKAGE;
use probe_protocol::RuntimeMode;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 9191;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub host: String,
    pub port: u16,
    pub mode: RuntimeMode,
    pub actuator_id: String,
    pub actuate_target_key: String,
    pub actuate_return_boolean: bool,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            mode: RuntimeMode::Observe,
            actuator_id: String::new(),
            actuate_target_key: String::new(),
            actuate_return_boolean: false,
            include_patterns: Vec::new(),
            exclude_patterns: vec![format!("{AGENT_PACKAGE}.**")],
        }
    }
}

impl AgentConfig {
    /// Resolve configuration from the three layers plus launch-command
    /// include inference. `workdir` anchors relative archive paths.
    pub fn resolve(
        args: &str,
        env: &HashMap<String, String>,
        props: &HashMap<String, String>,
        workdir: &Path,
    ) -> AgentConfig {
        let mut config = AgentConfig::default();
        apply_args(&mut config, args);
        apply_named(&mut config, env, &env_names());
        apply_named(&mut config, props, &prop_names());

        if config.port == 0 {
            config.port = DEFAULT_PORT;
        }
        if config.mode != RuntimeMode::Actuate {
            config.actuator_id.clear();
            config.actuate_target_key.clear();
        }

        if config.include_patterns.is_empty() {
            let launch = props
                .get("mcp.probe.launch.command")
                .or_else(|| env.get("MCP_PROBE_LAUNCH_COMMAND"));
            if let Some(command) = launch {
                if let Some(include) = infer_include_from_launch(command, workdir) {
                    config.include_patterns = vec![include];
                }
            }
        }

        config
    }

    /// Resolve against the real process environment.
    pub fn from_process(args: &str, props: &HashMap<String, String>) -> AgentConfig {
        let env: HashMap<String, String> = std::env::vars().collect();
        let workdir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::resolve(args, &env, props, &workdir)
    }

    pub fn compile_filter(&self) -> Result<ClassFilter, regex::Error> {
        ClassFilter::compile(&self.include_patterns, &self.exclude_patterns)
    }
}

struct FieldNames {
    host: &'static str,
    port: &'static str,
    mode: &'static str,
    actuator_id: &'static str,
    target: &'static str,
    return_boolean: &'static str,
    include: &'static str,
    exclude: &'static str,
}

fn env_names() -> FieldNames {
    FieldNames {
        host: "MCP_PROBE_HOST",
        port: "MCP_PROBE_PORT",
        mode: "MCP_PROBE_MODE",
        actuator_id: "MCP_PROBE_ACTUATOR_ID",
        target: "MCP_PROBE_ACTUATE_TARGET",
        return_boolean: "MCP_PROBE_ACTUATE_RETURN_BOOLEAN",
        include: "MCP_PROBE_INCLUDE",
        exclude: "MCP_PROBE_EXCLUDE",
    }
}

fn prop_names() -> FieldNames {
    FieldNames {
        host: "mcp.probe.host",
        port: "mcp.probe.port",
        mode: "mcp.probe.mode",
        actuator_id: "mcp.probe.actuator.id",
        target: "mcp.probe.actuate.target",
        return_boolean: "mcp.probe.actuate.return.boolean",
        include: "mcp.probe.include",
        exclude: "mcp.probe.exclude",
    }
}

fn apply_named(config: &mut AgentConfig, layer: &HashMap<String, String>, names: &FieldNames) {
    let get = |name: &str| {
        layer
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    if let Some(host) = get(names.host) {
        config.host = host;
    }
    if let Some(port) = get(names.port) {
        if let Ok(port) = port.parse::<u16>() {
            config.port = port;
        }
    }
    if let Some(mode) = get(names.mode) {
        config.mode = RuntimeMode::parse(&mode);
    }
    if let Some(id) = get(names.actuator_id) {
        config.actuator_id = id;
    }
    if let Some(target) = get(names.target) {
        config.actuate_target_key = target;
    }
    if let Some(flag) = get(names.return_boolean) {
        config.actuate_return_boolean = parse_bool(&flag, config.actuate_return_boolean);
    }
    if let Some(include) = get(names.include) {
        config.include_patterns = parse_csv(&include);
    }
    if let Some(exclude) = get(names.exclude) {
        config.exclude_patterns = parse_csv(&exclude);
    }
}

fn apply_args(config: &mut AgentConfig, args: &str) {
    for pair in args.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() || value.is_empty() {
            continue;
        }
        if key.eq_ignore_ascii_case("host") {
            config.host = value.to_string();
        } else if key.eq_ignore_ascii_case("port") {
            if let Ok(port) = value.parse::<u16>() {
                config.port = port;
            }
        } else if key.eq_ignore_ascii_case("mode") || key.eq_ignore_ascii_case("probeMode") {
            config.mode = RuntimeMode::parse(value);
        } else if key.eq_ignore_ascii_case("actuatorId") || key.eq_ignore_ascii_case("actuator") {
            config.actuator_id = value.to_string();
        } else if key.eq_ignore_ascii_case("actuateTarget")
            || key.eq_ignore_ascii_case("actuateTargetKey")
            || key.eq_ignore_ascii_case("targetKey")
        {
            config.actuate_target_key = value.to_string();
        } else if key.eq_ignore_ascii_case("actuateReturnBoolean")
            || key.eq_ignore_ascii_case("actuateReturnBool")
            || key.eq_ignore_ascii_case("returnBoolean")
        {
            config.actuate_return_boolean = parse_bool(value, config.actuate_return_boolean);
        } else if key.eq_ignore_ascii_case("include")
            || key.eq_ignore_ascii_case("includes")
            || key.eq_ignore_ascii_case("includePackages")
        {
            config.include_patterns = parse_csv(value);
        } else if key.eq_ignore_ascii_case("exclude")
            || key.eq_ignore_ascii_case("excludes")
            || key.eq_ignore_ascii_case("excludePackages")
        {
            config.exclude_patterns = parse_csv(value);
        } else {
            log::warn!("ignoring unknown agent option: {key}");
        }
    }
}

fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(raw: &str, default: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => true,
        "false" | "0" | "no" | "n" => false,
        _ => default,
    }
}

/// Derive the default include pattern from the launch command: either
/// a fully-qualified entry class, or an archive whose manifest names a
/// `Start-Class` (preferred) or `Main-Class`.
fn infer_include_from_launch(command: &str, workdir: &Path) -> Option<String> {
    let entry = first_token(command.trim())?;

    if entry.ends_with(".jar") {
        let entry_path = {
            let p = PathBuf::from(&entry);
            if p.is_absolute() {
                p
            } else {
                workdir.join(p)
            }
        };
        if let Some(class) = read_entry_class_from_manifest(&entry_path) {
            return class_to_package_include(&class);
        }
        return None;
    }

    // Class launch mode (`java com.example.Main …`).
    if entry.contains('.') && !entry.contains('/') && !entry.contains('\\') {
        return class_to_package_include(&entry);
    }

    None
}

fn first_token(value: &str) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    if let Some(rest) = value.strip_prefix('"') {
        let end = rest.find('"').unwrap_or(rest.len());
        return Some(rest[..end].to_string());
    }
    Some(
        value
            .split_once(' ')
            .map(|(head, _)| head)
            .unwrap_or(value)
            .to_string(),
    )
}

/// Look for the archive manifest in the exploded layout next to the
/// archive path (`<stem>/META-INF/MANIFEST.MF`, then the archive's
/// directory).
fn read_entry_class_from_manifest(entry: &Path) -> Option<String> {
    let mut candidates = Vec::new();
    if let Some(stem) = entry.to_str().and_then(|p| p.strip_suffix(".jar")) {
        candidates.push(PathBuf::from(stem).join("META-INF").join("MANIFEST.MF"));
    }
    if let Some(parent) = entry.parent() {
        candidates.push(parent.join("META-INF").join("MANIFEST.MF"));
    }
    for candidate in candidates {
        let Ok(raw) = std::fs::read_to_string(&candidate) else {
            continue;
        };
        let attrs = parse_manifest(&raw);
        if let Some(class) = attrs.get("Start-Class").or_else(|| attrs.get("Main-Class")) {
            return Some(class.clone());
        }
    }
    None
}

/// Main-attribute parsing with 72-byte continuation lines joined.
fn parse_manifest(raw: &str) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    let mut current: Option<(String, String)> = None;
    for line in raw.lines() {
        if let Some(continuation) = line.strip_prefix(' ') {
            if let Some((_, value)) = current.as_mut() {
                value.push_str(continuation);
            }
            continue;
        }
        if let Some((key, value)) = current.take() {
            attrs.insert(key, value);
        }
        if let Some((key, value)) = line.split_once(':') {
            current = Some((key.trim().to_string(), value.trim().to_string()));
        }
    }
    if let Some((key, value)) = current {
        attrs.insert(key, value);
    }
    attrs
}

fn class_to_package_include(fqcn: &str) -> Option<String> {
    let trimmed = fqcn.trim();
    let (package, _) = trimmed.rsplit_once('.')?;
    if package.is_empty() {
        return None;
    }
    Some(format!("{package}.**"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn args_string_populates_all_fields() {
        let config = AgentConfig::resolve(
            "host=0.0.0.0;port=9292;mode=actuate;actuatorId=probe-1;\
             actuateTarget=c.C#m:10;actuateReturnBoolean=true;\
             include=com.acme.**;exclude=com.acme.config.**,**.generated.**",
            &empty(),
            &empty(),
            Path::new("."),
        );
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9292);
        assert_eq!(config.mode, RuntimeMode::Actuate);
        assert_eq!(config.actuator_id, "probe-1");
        assert_eq!(config.actuate_target_key, "c.C#m:10");
        assert!(config.actuate_return_boolean);
        assert_eq!(config.include_patterns, vec!["com.acme.**"]);
        assert_eq!(
            config.exclude_patterns,
            vec!["com.acme.config.**", "**.generated.**"]
        );
    }

    #[test]
    fn malformed_pairs_are_skipped() {
        let config = AgentConfig::resolve(
            ";;port;=x;port=;port=9393;",
            &empty(),
            &empty(),
            Path::new("."),
        );
        assert_eq!(config.port, 9393);
        assert_eq!(config.host, DEFAULT_HOST);
    }

    #[test]
    fn env_overrides_args_and_props_override_env() {
        let mut env = empty();
        env.insert("MCP_PROBE_PORT".to_string(), "9200".to_string());
        env.insert("MCP_PROBE_MODE".to_string(), "actuate".to_string());
        env.insert(
            "MCP_PROBE_ACTUATE_TARGET".to_string(),
            "env.C#m".to_string(),
        );
        let mut props = empty();
        props.insert("mcp.probe.port".to_string(), "9300".to_string());

        let config =
            AgentConfig::resolve("port=9100;mode=observe", &env, &props, Path::new("."));
        assert_eq!(config.port, 9300);
        assert_eq!(config.mode, RuntimeMode::Actuate);
        assert_eq!(config.actuate_target_key, "env.C#m");
    }

    #[test]
    fn non_actuate_mode_clears_actuation_fields() {
        let config = AgentConfig::resolve(
            "mode=observe;actuatorId=left;actuateTarget=left.C#m",
            &empty(),
            &empty(),
            Path::new("."),
        );
        assert!(config.actuator_id.is_empty());
        assert!(config.actuate_target_key.is_empty());
    }

    #[test]
    fn include_inferred_from_class_launch() {
        let mut env = empty();
        env.insert(
            "MCP_PROBE_LAUNCH_COMMAND".to_string(),
            "com.acme.shop.Application --server.port=8080".to_string(),
        );
        let config = AgentConfig::resolve("", &env, &empty(), Path::new("."));
        assert_eq!(config.include_patterns, vec!["com.acme.shop.**"]);
    }

    #[test]
    fn include_inferred_from_exploded_archive_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let exploded = dir.path().join("app").join("META-INF");
        std::fs::create_dir_all(&exploded).unwrap();
        std::fs::write(
            exploded.join("MANIFEST.MF"),
            "Manifest-Version: 1.0\nMain-Class: org.springframework.boot.loader.JarLau\n ncher\nStart-Class: com.acme.catalog.CatalogApplication\n",
        )
        .unwrap();

        let mut env = empty();
        env.insert(
            "MCP_PROBE_LAUNCH_COMMAND".to_string(),
            "app.jar --spring.profiles.active=dev".to_string(),
        );
        let config = AgentConfig::resolve("", &env, &empty(), dir.path());
        assert_eq!(config.include_patterns, vec!["com.acme.catalog.**"]);
    }

    #[test]
    fn inference_failure_fails_closed() {
        let mut env = empty();
        env.insert(
            "MCP_PROBE_LAUNCH_COMMAND".to_string(),
            "missing.jar".to_string(),
        );
        let dir = tempfile::tempdir().unwrap();
        let config = AgentConfig::resolve("", &env, &empty(), dir.path());
        assert!(config.include_patterns.is_empty());
    }

    #[test]
    fn default_exclude_is_the_agent_package() {
        let config = AgentConfig::resolve("", &empty(), &empty(), Path::new("."));
        assert_eq!(config.exclude_patterns, vec![format!("{AGENT_PACKAGE}.**")]);
    }
}
