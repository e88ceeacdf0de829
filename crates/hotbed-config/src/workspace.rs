//! Workspace root search.
//!
//! Files outside the project root are only served when they live under the
//! workspace root, so monorepo siblings stay reachable through `/@fs/`.

use std::fs;
use std::path::{Path, PathBuf};

const ROOT_MARKERS: &[&str] = &[".git", "pnpm-workspace.yaml"];

/// Walk up from `start`, at most `max_depth` parents, to the nearest
/// directory that looks like a workspace root. Falls back to `start`.
///
/// A directory is considered a workspace root if it contains:
/// - .git
/// - pnpm-workspace.yaml (pnpm workspaces)
/// - package.json with a "workspaces" field (npm/yarn workspaces)
pub fn search_for_workspace_root(start: &Path, max_depth: usize) -> PathBuf {
    let mut current = Some(start);
    let mut depth = 0;

    while let Some(dir) = current {
        if depth > max_depth {
            break;
        }
        if is_workspace_root(dir) {
            return dir.to_path_buf();
        }
        current = dir.parent();
        depth += 1;
    }

    start.to_path_buf()
}

fn is_workspace_root(dir: &Path) -> bool {
    if ROOT_MARKERS.iter().any(|marker| dir.join(marker).exists()) {
        return true;
    }
    fs::read_to_string(dir.join("package.json"))
        .ok()
        .and_then(|content| serde_json::from_str::<serde_json::Value>(&content).ok())
        .is_some_and(|pkg| pkg.get("workspaces").is_some())
}
