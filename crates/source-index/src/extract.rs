//! Per-file heuristic extraction.

use crate::{MethodRecord, SourceFile};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static PACKAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*package\s+([A-Za-z_][A-Za-z0-9_.]*)\s*;").expect("package regex"));

static TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:class|interface|enum|record)\s+([A-Za-z_$][\w$]*)").expect("type regex")
});

// One line, one shot: optional modifiers, an optional type-ish token
// run, then the candidate name directly before `(`. Termination in `{`
// or a `throws` clause separates declarations from plain calls.
static METHOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:(?:public|protected|private|static|final|abstract|synchronized|native|default|strictfp)\s+)*(?:<[^<>]*>\s*)?(?:[\w$.<>\[\],?\s]+?\s+)?([A-Za-z_$][\w$]*)\s*\(",
    )
    .expect("method regex")
});

/// Names that the declaration regex can capture on control-flow lines.
const CONTROL_KEYWORDS: &[&str] = &["if", "for", "while", "switch", "catch"];

fn is_method_declaration(line: &str) -> Option<String> {
    let trimmed = line.trim_end();
    let terminated = trimmed.ends_with('{') || trimmed.contains(" throws ");
    if !terminated {
        return None;
    }
    let captures = METHOD_RE.captures(trimmed)?;
    let name = captures.get(1)?.as_str();
    if CONTROL_KEYWORDS.contains(&name) {
        return None;
    }
    Some(name.to_string())
}

/// Heuristic scan of one source file: first package declaration, first
/// primary type, and every line that looks like a method declaration.
pub fn parse_source(path: &Path, text: &str) -> SourceFile {
    let mut package = None;
    let mut type_name = None;
    let mut methods = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line_number = (index + 1) as u32;
        if package.is_none() {
            if let Some(captures) = PACKAGE_RE.captures(line) {
                package = Some(captures[1].to_string());
            }
        }
        if type_name.is_none() {
            // Comments routinely mention type names; only declaration
            // lines count.
            let trimmed = line.trim_start();
            if !trimmed.starts_with("//") && !trimmed.starts_with('*') {
                if let Some(captures) = TYPE_RE.captures(line) {
                    type_name = Some(captures[1].to_string());
                    continue;
                }
            }
        }
        if let Some(name) = is_method_declaration(line) {
            methods.push(MethodRecord {
                name,
                line: line_number,
                signature: line.trim().to_string(),
            });
        }
    }

    SourceFile {
        path: path.to_path_buf(),
        package,
        type_name,
        methods,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"package com.acme.catalog;

import java.util.List;

public class CatalogSpecs {

    private final Clock clock;

    public CatalogSpecs(Clock clock) {
        this.clock = clock;
    }

    public boolean finalPriceLte(String keyword) {
        if (keyword == null) {
            return false;
        }
        return true;
    }

    List<Item> load(int page) throws IOException {
        return repository.fetch(page);
    }

    private void helper() {
        items.forEach(item -> process(item));
    }
}
"#;

    #[test]
    fn extracts_package_type_and_methods() {
        let file = parse_source(Path::new("CatalogSpecs.java"), SAMPLE);
        assert_eq!(file.package.as_deref(), Some("com.acme.catalog"));
        assert_eq!(file.type_name.as_deref(), Some("CatalogSpecs"));

        let names: Vec<&str> = file.methods.iter().map(|m| m.name.as_str()).collect();
        assert!(names.contains(&"CatalogSpecs"), "constructor: {names:?}");
        assert!(names.contains(&"finalPriceLte"), "{names:?}");
        assert!(names.contains(&"load"), "throws form: {names:?}");
        assert!(names.contains(&"helper"), "{names:?}");
    }

    #[test]
    fn method_lines_are_one_based() {
        let file = parse_source(Path::new("CatalogSpecs.java"), SAMPLE);
        let target = file
            .methods
            .iter()
            .find(|m| m.name == "finalPriceLte")
            .unwrap();
        assert_eq!(target.line, 13);
        assert!(target.signature.starts_with("public boolean finalPriceLte"));
    }

    #[test]
    fn control_flow_lines_are_rejected() {
        let text = "public class X {\n  void run() {\n    if (ready) {\n    while (more) {\n    for (int i = 0; i < n; i++) {\n    switch (kind) {\n    } catch (Exception e) {\n  }\n}\n";
        let file = parse_source(Path::new("X.java"), text);
        let names: Vec<&str> = file.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["run"]);
    }

    #[test]
    fn plain_calls_and_annotations_are_not_declarations() {
        let text = "public class X {\n  @GetMapping(\"/items\")\n  public List<Item> list(@RequestParam(\"q\") String q) {\n    return svc.search(q);\n  }\n}\n";
        let file = parse_source(Path::new("X.java"), text);
        let names: Vec<&str> = file.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["list"]);
    }

    #[test]
    fn interface_and_record_types_are_recognized() {
        let file = parse_source(
            Path::new("Repo.java"),
            "package p;\npublic interface Repo {\n  String load(long id);\n}\n",
        );
        assert_eq!(file.type_name.as_deref(), Some("Repo"));
    }
}
