//! Ephemeral source index.
//!
//! A breadth-first file walk plus a per-file line heuristic that
//! extracts the package, the primary type, and method declarations
//! with 1-based line numbers. Intentionally syntactic: its only
//! guarantee is recall for well-formatted sources, and callers must
//! tolerate false positives. The index is rebuilt on demand and never
//! persisted.

use std::path::{Path, PathBuf};

mod extract;
mod walk;

pub use extract::parse_source;
pub use walk::walk_source_files;

/// One heuristic method declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRecord {
    pub name: String,
    /// 1-based starting line.
    pub line: u32,
    /// Raw declaration line, trimmed.
    pub signature: String,
}

/// Extraction result for one source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub package: Option<String>,
    /// Primary type name (first class/interface/enum/record).
    pub type_name: Option<String>,
    pub methods: Vec<MethodRecord>,
}

impl SourceFile {
    /// `package.Type` when both are known, bare type name otherwise.
    pub fn fq_class(&self) -> Option<String> {
        let type_name = self.type_name.as_ref()?;
        Some(match &self.package {
            Some(package) => format!("{package}.{type_name}"),
            None => type_name.clone(),
        })
    }

    /// File name without extension, used as a secondary class hint.
    pub fn file_base(&self) -> String {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string()
    }

    /// The method whose declaration most closely precedes `line`.
    pub fn enclosing_method(&self, line: u32) -> Option<&MethodRecord> {
        self.methods
            .iter()
            .filter(|m| m.line <= line)
            .max_by_key(|m| m.line)
    }
}

/// The full index for one or more roots.
#[derive(Debug, Clone, Default)]
pub struct SourceIndex {
    pub files: Vec<SourceFile>,
}

impl SourceIndex {
    /// Index every source file under `root`. Per-file read failures
    /// skip that file; this is the only silent recovery in the system.
    pub fn build(root: &Path) -> Self {
        Self::build_many(std::iter::once(root.to_path_buf()))
    }

    /// Index several roots, deduplicating files seen through more than
    /// one root.
    pub fn build_many(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut files = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for root in roots {
            for path in walk_source_files(&root) {
                let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
                if !seen.insert(canonical) {
                    continue;
                }
                match std::fs::read_to_string(&path) {
                    Ok(text) => files.push(parse_source(&path, &text)),
                    Err(err) => log::debug!("skipping unreadable {}: {err}", path.display()),
                }
            }
        }
        Self { files }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_skips_build_output_and_vcs_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src/main/java/com/acme");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(
            src.join("Svc.java"),
            "package com.acme;\npublic class Svc {\n  public void run() {\n  }\n}\n",
        )
        .unwrap();
        let target = dir.path().join("target/classes/com/acme");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("Gen.java"), "public class Gen {}\n").unwrap();

        let index = SourceIndex::build(dir.path());
        assert_eq!(index.files.len(), 1);
        let file = &index.files[0];
        assert_eq!(file.package.as_deref(), Some("com.acme"));
        assert_eq!(file.type_name.as_deref(), Some("Svc"));
        assert_eq!(file.fq_class().as_deref(), Some("com.acme.Svc"));
        assert_eq!(file.methods.len(), 1);
        assert_eq!(file.methods[0].name, "run");
        assert_eq!(file.methods[0].line, 3);
    }

    #[test]
    fn enclosing_method_picks_nearest_preceding_declaration() {
        let file = parse_source(
            Path::new("X.java"),
            "package p;\npublic class X {\n  void a() {\n  }\n  void b() {\n  }\n}\n",
        );
        assert_eq!(file.enclosing_method(4).unwrap().name, "a");
        assert_eq!(file.enclosing_method(6).unwrap().name, "b");
        assert!(file.enclosing_method(1).is_none());
    }

    #[test]
    fn duplicate_roots_do_not_duplicate_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("A.java"),
            "public class A {\n  void a() {\n  }\n}\n",
        )
        .unwrap();
        let index = SourceIndex::build_many(vec![
            dir.path().to_path_buf(),
            dir.path().to_path_buf(),
        ]);
        assert_eq!(index.files.len(), 1);
    }
}
