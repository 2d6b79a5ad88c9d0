//! Target inference: rank indexed methods against textual hints.

use once_cell::sync::Lazy;
use probe_protocol::InferredTarget;
use probe_source_index::{SourceFile, SourceIndex};
use regex::Regex;

static BOOLEAN_RETURN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bboolean\s+[A-Za-z_$][\w$]*\s*\(").expect("boolean return regex"));

/// Coarse hints as supplied by the operator.
#[derive(Debug, Clone, Default)]
pub struct TargetHints {
    pub class_hint: Option<String>,
    pub method_hint: Option<String>,
    pub line_hint: Option<u32>,
}

impl TargetHints {
    fn class(&self) -> Option<&str> {
        self.class_hint.as_deref().map(str::trim).filter(|h| !h.is_empty())
    }

    fn method(&self) -> Option<&str> {
        self.method_hint.as_deref().map(str::trim).filter(|h| !h.is_empty())
    }

    fn has_textual(&self) -> bool {
        self.class().is_some() || self.method().is_some()
    }
}

/// Rank every indexed method against the hints and return the top
/// `limit`, best first, ties broken by smaller line number.
///
/// Guardrail: when a textual hint was provided but neither the class
/// nor the method matched, the entry gets no score at all. Line-only
/// proximity never promotes a method of an unrelated class.
pub fn infer_targets(index: &SourceIndex, hints: &TargetHints, limit: usize) -> Vec<InferredTarget> {
    let mut scored: Vec<InferredTarget> = Vec::new();
    for file in &index.files {
        for method in &file.methods {
            if let Some(target) = score_method(file, method, hints) {
                scored.push(target);
            }
        }
    }
    scored.sort_by(|a, b| {
        b.confidence
            .cmp(&a.confidence)
            .then_with(|| a.line.unwrap_or(u32::MAX).cmp(&b.line.unwrap_or(u32::MAX)))
    });
    scored.truncate(limit);
    scored
}

fn score_method(
    file: &SourceFile,
    method: &probe_source_index::MethodRecord,
    hints: &TargetHints,
) -> Option<InferredTarget> {
    let mut score: u32 = 0;
    let mut reasons: Vec<String> = Vec::new();
    let mut class_matched = false;
    let mut method_matched = false;

    let class_name = file.type_name.clone().unwrap_or_else(|| file.file_base());

    if let Some(hint) = hints.class() {
        if class_name.eq_ignore_ascii_case(hint) {
            score += 45;
            class_matched = true;
            reasons.push(format!("class name matches '{hint}'"));
        } else {
            let hint_lc = hint.to_lowercase();
            if class_name.to_lowercase().contains(&hint_lc)
                || file.file_base().to_lowercase().contains(&hint_lc)
            {
                score += 25;
                class_matched = true;
                reasons.push(format!("class name contains '{hint}'"));
            }
        }
    }

    if let Some(hint) = hints.method() {
        if method.name.eq_ignore_ascii_case(hint) {
            score += 40;
            method_matched = true;
            reasons.push(format!("method name matches '{hint}'"));
        } else if method.name.to_lowercase().contains(&hint.to_lowercase()) {
            score += 22;
            method_matched = true;
            reasons.push(format!("method name contains '{hint}'"));
        }
    }

    if hints.has_textual() && !class_matched && !method_matched {
        return None;
    }

    if let Some(line_hint) = hints.line_hint {
        let distance = line_hint.abs_diff(method.line);
        let line_score = match distance {
            0 => 25,
            1..=3 => 16,
            4..=12 => 8,
            _ => 0,
        };
        if line_score > 0 {
            score += line_score;
            reasons.push(format!(
                "line {line_hint} is within {distance} of the declaration at {}",
                method.line
            ));
        }
    }

    if score == 0 {
        return None;
    }

    let key = match file.fq_class() {
        Some(fqcn) => format!("{fqcn}#{}", method.name),
        None => format!("{}#{}", file.file_base(), method.name),
    };

    Some(InferredTarget {
        file: file.path.to_string_lossy().to_string(),
        class: class_name,
        method: method.name.clone(),
        line: Some(method.line),
        signature: method.signature.clone(),
        returns_boolean: BOOLEAN_RETURN_RE.is_match(&method.signature),
        key,
        confidence: score.min(100),
        reasons,
    })
}
