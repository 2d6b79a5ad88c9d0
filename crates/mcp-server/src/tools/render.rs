//! Human text rendering by placeholder substitution.
//!
//! Each tool output has a machine-consumable structured variant and a
//! human-rendered text variant; the latter is a pure `{{name}}`
//! substitution over a per-tool template.

/// Replace every `{{name}}` with its value. Unknown placeholders are
/// left in place so missing template data stays visible.
pub fn render(template: &str, vars: &[(&str, String)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{{{name}}}}}"), value);
    }
    out
}
