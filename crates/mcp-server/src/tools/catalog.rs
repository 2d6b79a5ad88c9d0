//! Tool inventory, printable without starting the server.

use serde_json::json;

#[derive(Clone, Copy, Debug)]
pub(crate) struct ToolDescriptor {
    pub(crate) name: &'static str,
    pub(crate) summary: &'static str,
}

pub(crate) const TOOL_CATALOG: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: "debug_ping",
        summary: "Liveness echo with planner version and probe base URL.",
    },
    ToolDescriptor {
        name: "projects_discover",
        summary: "Candidate Maven/Gradle project roots under a workspace.",
    },
    ToolDescriptor {
        name: "probe_diagnose",
        summary: "Probe connectivity check with remediation hints.",
    },
    ToolDescriptor {
        name: "target_infer",
        summary: "Rank methods against class/method/line hints into probe keys.",
    },
    ToolDescriptor {
        name: "recipe_generate",
        summary: "Full reproduction recipe: target + request + auth + execution plan.",
    },
    ToolDescriptor {
        name: "probe_status",
        summary: "Hit count and last-hit timestamp for a line-level key.",
    },
    ToolDescriptor {
        name: "probe_reset",
        summary: "Zero a key's counters and stamp its inline-start epoch.",
    },
    ToolDescriptor {
        name: "probe_wait_hit",
        summary: "Poll for an inline hit, separating fresh hits from stale ones.",
    },
    ToolDescriptor {
        name: "probe_actuate",
        summary: "Arm or disarm forced branch/boolean actuation.",
    },
];

pub(crate) fn tool_inventory_json(version: &str) -> serde_json::Value {
    let tools: Vec<serde_json::Value> = TOOL_CATALOG
        .iter()
        .map(|tool| json!({ "name": tool.name, "summary": tool.summary }))
        .collect();

    json!({
        "binary": "probe-mcp",
        "version": version,
        "count": tools.len(),
        "tools": tools,
    })
}
