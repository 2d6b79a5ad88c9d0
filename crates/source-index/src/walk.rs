//! Breadth-first source file discovery.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Version control and build output directories are never descended
/// into.
const SKIPPED_DIRS: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    ".idea",
    ".gradle",
    "target",
    "build",
    "out",
    "dist",
    "bin",
    "node_modules",
];

const SOURCE_EXTENSIONS: &[&str] = &["java", "kt"];

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SOURCE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Level-order walk under `root`, returning source files in a
/// deterministic order. Unreadable directories are skipped.
pub fn walk_source_files(root: &Path) -> Vec<PathBuf> {
    let mut queue: VecDeque<PathBuf> = VecDeque::new();
    queue.push_back(root.to_path_buf());
    let mut files = Vec::new();

    while let Some(dir) = queue.pop_front() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                log::debug!("skipping unreadable dir {}: {err}", dir.display());
                continue;
            }
        };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .collect();
        paths.sort();

        for path in paths {
            if path.is_dir() {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default();
                if SKIPPED_DIRS.contains(&name) {
                    continue;
                }
                queue.push_back(path);
            } else if is_source_file(&path) {
                files.push(path);
            }
        }
    }

    files
}
