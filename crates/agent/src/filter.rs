//! Class eligibility: include/exclude glob matching.
//!
//! Patterns use `*` for one dotted segment and `**` for any substring
//! including dots; a wildcard-free pattern is a package prefix. A class
//! is instrumentable iff it matches some include and no exclude, and is
//! not under one of the built-in excluded prefixes (runtime internals,
//! this agent itself, common managed-runtime libraries).

use crate::AGENT_PACKAGE;
use regex::Regex;

const BUILTIN_EXCLUDED_PREFIXES: &[&str] = &[
    "java.",
    "javax.",
    "jakarta.",
    "sun.",
    "jdk.",
    "com.sun.",
    "kotlin.",
    "org.springframework.boot.loader.",
];

#[derive(Debug)]
pub struct ClassFilter {
    includes: Vec<Regex>,
    excludes: Vec<Regex>,
}

impl ClassFilter {
    /// Compile include/exclude pattern lists. Empty entries are
    /// skipped; compilation happens once at agent start.
    pub fn compile(includes: &[String], excludes: &[String]) -> Result<Self, regex::Error> {
        Ok(Self {
            includes: compile_patterns(includes)?,
            excludes: compile_patterns(excludes)?,
        })
    }

    pub fn should_instrument(&self, class: &str) -> bool {
        if class.is_empty() {
            return false;
        }
        if BUILTIN_EXCLUDED_PREFIXES
            .iter()
            .any(|prefix| class.starts_with(prefix))
            || class.starts_with(AGENT_PACKAGE)
        {
            return false;
        }
        if !self.includes.iter().any(|p| p.is_match(class)) {
            return false;
        }
        !self.excludes.iter().any(|p| p.is_match(class))
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, regex::Error> {
    patterns
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| Regex::new(&to_regex(p)))
        .collect()
}

/// Translate one glob/prefix pattern to an anchored regex. `*` matches
/// one path segment of a dotted name, `**` any substring; a pattern
/// without wildcards is treated as a package prefix.
fn to_regex(glob_or_prefix: &str) -> String {
    let has_wildcard = glob_or_prefix.contains('*');
    let glob = if has_wildcard {
        glob_or_prefix.to_string()
    } else if glob_or_prefix.ends_with('.') {
        format!("{glob_or_prefix}**")
    } else {
        format!("{glob_or_prefix}.**")
    };

    let mut regex = String::with_capacity(glob.len() + 8);
    regex.push('^');
    let chars: Vec<char> = glob.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '*' {
            if i + 1 < chars.len() && chars[i + 1] == '*' {
                regex.push_str(".*");
                i += 1;
            } else {
                regex.push_str("[^.]*");
            }
        } else {
            if "\\.[]{}()+-^$|?".contains(c) {
                regex.push('\\');
            }
            regex.push(c);
        }
        i += 1;
    }
    regex.push('$');
    regex
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(includes: &[&str], excludes: &[&str]) -> ClassFilter {
        let includes: Vec<String> = includes.iter().map(|s| s.to_string()).collect();
        let excludes: Vec<String> = excludes.iter().map(|s| s.to_string()).collect();
        ClassFilter::compile(&includes, &excludes).unwrap()
    }

    #[test]
    fn prefix_pattern_matches_nested_packages_only() {
        let f = filter(&["a.b.c"], &[]);
        assert!(f.should_instrument("a.b.c.X"));
        assert!(f.should_instrument("a.b.c.d.e.X"));
        assert!(!f.should_instrument("a.b.cX"));
        assert!(!f.should_instrument("a.x.c.X"));
    }

    #[test]
    fn single_star_matches_one_segment() {
        let f = filter(&["com.acme.*.Service"], &[]);
        assert!(f.should_instrument("com.acme.billing.Service"));
        assert!(!f.should_instrument("com.acme.billing.core.Service"));
        assert!(!f.should_instrument("com.acme.Service"));
    }

    #[test]
    fn double_star_crosses_dots() {
        let f = filter(&["com.acme.**"], &[]);
        assert!(f.should_instrument("com.acme.Billing"));
        assert!(f.should_instrument("com.acme.billing.deep.Invoice"));
        assert!(!f.should_instrument("org.acme.Billing"));
    }

    #[test]
    fn excludes_win_over_includes() {
        let f = filter(&["com.acme.**"], &["com.acme.config.**"]);
        assert!(f.should_instrument("com.acme.Billing"));
        assert!(!f.should_instrument("com.acme.config.Flags"));
    }

    #[test]
    fn builtin_prefixes_and_empty_names_are_rejected() {
        let f = filter(&["**"], &[]);
        assert!(!f.should_instrument(""));
        assert!(!f.should_instrument("java.util.List"));
        assert!(!f.should_instrument("jdk.internal.misc.Unsafe"));
        assert!(!f.should_instrument("org.springframework.boot.loader.Launcher"));
        assert!(!f.should_instrument(&format!("{}.Runtime", crate::AGENT_PACKAGE)));
        assert!(f.should_instrument("com.acme.Billing"));
    }

    #[test]
    fn blank_patterns_are_skipped() {
        let f = filter(&["", "  ", "com.acme.**"], &[""]);
        assert!(f.should_instrument("com.acme.Billing"));
    }
}
