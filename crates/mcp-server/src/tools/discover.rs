//! Bounded project-root discovery (interface-level: the output is
//! merely a set of candidate roots).

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

const BUILD_MARKERS: &[&str] = &[
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "settings.gradle",
    "settings.gradle.kts",
];

const SKIPPED_DIRS: &[&str] = &[".git", "target", "build", "node_modules", ".idea", ".gradle"];

const MAX_DEPTH: usize = 4;
const MAX_ROOTS: usize = 50;

/// Directories under `workspace` (inclusive) carrying a Maven/Gradle
/// build marker, breadth-first, bounded in depth and count.
pub fn discover_project_roots(workspace: &Path) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    let mut queue: VecDeque<(PathBuf, usize)> = VecDeque::new();
    queue.push_back((workspace.to_path_buf(), 0));

    while let Some((dir, depth)) = queue.pop_front() {
        if roots.len() >= MAX_ROOTS {
            break;
        }
        if BUILD_MARKERS.iter().any(|marker| dir.join(marker).is_file()) {
            roots.push(dir.clone());
        }
        if depth >= MAX_DEPTH {
            continue;
        }
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        let mut children: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        children.sort();
        for child in children {
            let name = child
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            if SKIPPED_DIRS.contains(&name) || name.starts_with('.') {
                continue;
            }
            queue.push_back((child, depth + 1));
        }
    }

    roots
}
