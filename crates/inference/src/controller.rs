//! Controller-file heuristics: mapping annotations, parameter
//! tagging, and call-site location.

use once_cell::sync::Lazy;
use probe_protocol::HttpMethod;
use probe_source_index::{parse_source, SourceFile};
use regex::Regex;
use std::path::Path;

static QUOTED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]*)""#).expect("quoted regex"));
static REQUEST_METHOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"RequestMethod\.(GET|POST|PUT|PATCH|DELETE)").expect("request method regex")
});
static PARAM_ANNOTATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@(RequestParam|PathVariable|RequestHeader|RequestBody)(?:\s*\(([^)]*)\))?")
        .expect("param annotation regex")
});
static TYPE_DECL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:class|interface|enum|record)\s+[A-Za-z_$]").expect("type regex"));

const MAPPING_ANNOTATIONS: &[(&str, HttpMethod)] = &[
    ("@GetMapping", HttpMethod::Get),
    ("@PostMapping", HttpMethod::Post),
    ("@PutMapping", HttpMethod::Put),
    ("@PatchMapping", HttpMethod::Patch),
    ("@DeleteMapping", HttpMethod::Delete),
];

/// A controller (or interface) file with its raw lines kept around
/// for annotation scanning.
#[derive(Debug, Clone)]
pub(crate) struct ControllerSource {
    pub file: SourceFile,
    pub lines: Vec<String>,
}

impl ControllerSource {
    pub fn load(path: &Path) -> Option<Self> {
        let text = std::fs::read_to_string(path).ok()?;
        Some(Self::from_text(path, &text))
    }

    pub fn from_text(path: &Path, text: &str) -> Self {
        Self {
            file: parse_source(path, text),
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    fn line(&self, number_1_based: u32) -> Option<&str> {
        self.lines
            .get(number_1_based.saturating_sub(1) as usize)
            .map(String::as_str)
    }

    /// Class-level `@RequestMapping` base path, read from the
    /// annotation block above the primary type declaration.
    pub fn class_base_path(&self) -> Option<String> {
        for line in &self.lines {
            if TYPE_DECL_RE.is_match(line) {
                return None;
            }
            if line.trim_start().starts_with("@RequestMapping") {
                return first_quoted(line);
            }
        }
        None
    }

    /// HTTP method and sub-path of the mapping annotation block
    /// directly above a method declaration.
    pub fn method_mapping(&self, decl_line: u32) -> Option<(HttpMethod, String)> {
        let mut cursor = decl_line.checked_sub(1)?;
        while cursor >= 1 {
            let line = self.line(cursor)?.trim().to_string();
            cursor -= 1;
            if line.is_empty() || line.starts_with("//") || line.starts_with('*') {
                continue;
            }
            if !line.starts_with('@') {
                return None;
            }
            for (annotation, method) in MAPPING_ANNOTATIONS {
                if line.starts_with(annotation) {
                    return Some((*method, first_quoted(&line).unwrap_or_default()));
                }
            }
            if line.starts_with("@RequestMapping") {
                let method = REQUEST_METHOD_RE
                    .captures(&line)
                    .and_then(|c| HttpMethod::parse(&c[1]))
                    .unwrap_or(HttpMethod::Get);
                return Some((method, first_quoted(&line).unwrap_or_default()));
            }
            // Some other annotation (@ResponseBody etc); keep looking.
        }
        None
    }

    /// Parameter list of the declaration starting at `decl_line`,
    /// gathered across continuation lines until the parens balance.
    pub fn parse_params(&self, decl_line: u32) -> Vec<ControllerParam> {
        let Some(raw) = self.parameter_text(decl_line) else {
            return Vec::new();
        };
        split_top_level(&raw)
            .into_iter()
            .filter_map(|piece| parse_param(&piece))
            .collect()
    }

    fn parameter_text(&self, decl_line: u32) -> Option<String> {
        let mut collected = String::new();
        let mut depth = 0i32;
        let mut started = false;
        for offset in 0..20u32 {
            let line = self.line(decl_line + offset)?;
            for c in line.chars() {
                match c {
                    '(' => {
                        depth += 1;
                        if depth == 1 {
                            started = true;
                            continue;
                        }
                    }
                    ')' => {
                        depth -= 1;
                        if started && depth == 0 {
                            return Some(collected);
                        }
                    }
                    _ => {}
                }
                if started && depth >= 1 {
                    collected.push(c);
                }
            }
            collected.push(' ');
        }
        None
    }

    /// First line (1-based) that invokes `method_name`, skipping
    /// declaration lines of the same name.
    pub fn find_call_line(&self, method_name: &str) -> Option<u32> {
        self.find_call_lines(method_name).into_iter().next()
    }

    /// All lines (1-based) that invoke `method_name`. Declaration
    /// lines of the same name and substring matches inside longer
    /// identifiers are skipped.
    pub fn find_call_lines(&self, method_name: &str) -> Vec<u32> {
        let needle = format!("{method_name}(");
        let mut hits = Vec::new();
        for (index, line) in self.lines.iter().enumerate() {
            if !contains_identifier_call(line, &needle) {
                continue;
            }
            let is_declaration = self
                .file
                .methods
                .iter()
                .any(|m| m.line == (index + 1) as u32 && m.name == method_name);
            if is_declaration {
                continue;
            }
            hits.push((index + 1) as u32);
        }
        hits
    }

    /// Window of surrounding text used for branch-precondition hints.
    pub fn context_window(&self, line: u32, before: u32, after: u32) -> Vec<&str> {
        let start = line.saturating_sub(before).max(1) as usize - 1;
        let end = ((line + after) as usize).min(self.lines.len());
        self.lines[start..end].iter().map(String::as_str).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParamKind {
    Query,
    Path,
    Header,
    Body,
    Unknown,
}

#[derive(Debug, Clone)]
pub(crate) struct ControllerParam {
    pub kind: ParamKind,
    /// Request-visible name: the annotation's declared name when
    /// present, the formal parameter name otherwise.
    pub request_name: String,
    pub formal_name: String,
    pub java_type: String,
}

fn parse_param(piece: &str) -> Option<ControllerParam> {
    let piece = piece.trim();
    if piece.is_empty() {
        return None;
    }

    let (kind, declared_name) = match PARAM_ANNOTATION_RE.captures(piece) {
        Some(captures) => {
            let kind = match &captures[1] {
                "RequestParam" => ParamKind::Query,
                "PathVariable" => ParamKind::Path,
                "RequestHeader" => ParamKind::Header,
                _ => ParamKind::Body,
            };
            let declared = captures
                .get(2)
                .and_then(|attrs| first_quoted(attrs.as_str()));
            (kind, declared)
        }
        None => (ParamKind::Unknown, None),
    };

    let stripped = PARAM_ANNOTATION_RE.replace_all(piece, "");
    let stripped = stripped.trim();
    let (java_type, formal_name) = split_type_and_name(stripped)?;

    Some(ControllerParam {
        kind,
        request_name: declared_name.unwrap_or_else(|| formal_name.clone()),
        formal_name,
        java_type,
    })
}

/// Split `final Map<String, String> body` into type and name.
fn split_type_and_name(declaration: &str) -> Option<(String, String)> {
    let mut depth = 0i32;
    let mut split_at = None;
    for (index, c) in declaration.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            c if c.is_whitespace() && depth == 0 => split_at = Some(index),
            _ => {}
        }
    }
    let split_at = split_at?;
    let name = declaration[split_at..].trim();
    let mut java_type = declaration[..split_at].trim();
    if let Some(rest) = java_type.strip_prefix("final ") {
        java_type = rest.trim();
    }
    if name.is_empty() || java_type.is_empty() {
        return None;
    }
    Some((java_type.to_string(), name.to_string()))
}

/// Split a parameter list on commas outside brackets.
fn split_top_level(raw: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in raw.chars() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                pieces.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.trim().is_empty() {
        pieces.push(current);
    }
    pieces
}

fn first_quoted(raw: &str) -> Option<String> {
    QUOTED_RE.captures(raw).map(|c| c[1].to_string())
}

/// `needle` is `name(`; the character before the match must not extend
/// the identifier.
fn contains_identifier_call(line: &str, needle: &str) -> bool {
    let mut search_from = 0;
    while let Some(found) = line[search_from..].find(needle) {
        let at = search_from + found;
        let preceded_by_ident = at > 0
            && line[..at]
                .chars()
                .next_back()
                .map(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
                .unwrap_or(false);
        if !preceded_by_ident {
            return true;
        }
        search_from = at + needle.len();
    }
    false
}

/// Example value by type family: integral 1, floating/decimal 1000,
/// boolean true, everything else the literal string `value`.
pub(crate) fn example_value(java_type: &str) -> &'static str {
    let base = java_type
        .split('<')
        .next()
        .unwrap_or(java_type)
        .rsplit('.')
        .next()
        .unwrap_or(java_type);
    match base {
        "int" | "long" | "short" | "byte" | "Integer" | "Long" | "Short" | "Byte"
        | "BigInteger" => "1",
        "double" | "float" | "Double" | "Float" | "BigDecimal" => "1000",
        "boolean" | "Boolean" => "true",
        _ => "value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTROLLER: &str = r#"package com.acme.catalog;

@RestController
@RequestMapping("/catalog")
public class CatalogController {

    private final CatalogSpecs specs;

    @GetMapping("/items")
    public List<Item> list(@RequestParam("keyword") String keyword, @RequestParam Integer page, @RequestParam(name = "size", required = false) Integer size) {
        return specs.finalPriceLte(keyword);
    }

    @RequestMapping(value = "/legacy", method = RequestMethod.POST)
    public void legacy(@RequestBody UpdateRequest request) {
        specs.apply(request);
    }
}
"#;

    fn controller() -> ControllerSource {
        ControllerSource::from_text(Path::new("CatalogController.java"), CONTROLLER)
    }

    #[test]
    fn class_base_path_from_class_level_request_mapping() {
        assert_eq!(controller().class_base_path().as_deref(), Some("/catalog"));
    }

    #[test]
    fn get_mapping_resolves_method_and_sub_path() {
        let c = controller();
        let list = c.file.methods.iter().find(|m| m.name == "list").unwrap();
        let (method, path) = c.method_mapping(list.line).unwrap();
        assert_eq!(method, HttpMethod::Get);
        assert_eq!(path, "/items");
    }

    #[test]
    fn request_mapping_with_request_method_resolves() {
        let c = controller();
        let legacy = c.file.methods.iter().find(|m| m.name == "legacy").unwrap();
        let (method, path) = c.method_mapping(legacy.line).unwrap();
        assert_eq!(method, HttpMethod::Post);
        assert_eq!(path, "/legacy");
    }

    #[test]
    fn params_are_tagged_and_named() {
        let c = controller();
        let list = c.file.methods.iter().find(|m| m.name == "list").unwrap();
        let params = c.parse_params(list.line);
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].kind, ParamKind::Query);
        assert_eq!(params[0].request_name, "keyword");
        assert_eq!(params[0].java_type, "String");
        assert_eq!(params[1].request_name, "page");
        assert_eq!(params[2].request_name, "size");
        assert_eq!(params[2].formal_name, "size");

        let legacy = c.file.methods.iter().find(|m| m.name == "legacy").unwrap();
        let params = c.parse_params(legacy.line);
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].kind, ParamKind::Body);
        assert_eq!(params[0].java_type, "UpdateRequest");
    }

    #[test]
    fn call_line_skips_declarations() {
        let c = controller();
        let line = c.find_call_line("finalPriceLte").unwrap();
        assert!(c.lines[line as usize - 1].contains("specs.finalPriceLte"));
        // The declaration of `list` is not a call.
        assert!(c.find_call_line("list").is_none());
    }

    #[test]
    fn example_values_by_type_family() {
        assert_eq!(example_value("Integer"), "1");
        assert_eq!(example_value("long"), "1");
        assert_eq!(example_value("java.math.BigDecimal"), "1000");
        assert_eq!(example_value("Boolean"), "true");
        assert_eq!(example_value("String"), "value");
        assert_eq!(example_value("List<Long>"), "value");
    }
}
