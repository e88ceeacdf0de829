//! In-memory module graph.
//!
//! Nodes are keyed by url. Import edges are stored twice, forward in
//! `imported` and reverse in `importers`, and every mutation updates both
//! maps under the same write lock so readers never observe a one-sided edge.
//! A file can back several urls (`/a.css` and `/a.css?import`), tracked in
//! `file_to_urls`.

mod mutations;
mod queries;
mod traversal;


use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::ssr::SsrModule;
use crate::transform::TransformResult;

/// Mutable per-url state. Only reachable through [`ModuleGraph`].
#[derive(Debug, Clone)]
pub(crate) struct ModuleNode {
    pub(crate) url: String,
    pub(crate) file: Option<PathBuf>,
    pub(crate) transform_result: Option<Arc<TransformResult>>,
    pub(crate) ssr_transform_result: Option<Arc<TransformResult>>,
    pub(crate) ssr_module: Option<SsrModule>,
    /// Bumped on every invalidation. Work started against an older version
    /// is not committed.
    pub(crate) version: u64,
    pub(crate) last_hmr_timestamp: u64,
    pub(crate) is_self_accepting: bool,
}

impl ModuleNode {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            file: None,
            transform_result: None,
            ssr_transform_result: None,
            ssr_module: None,
            version: 0,
            last_hmr_timestamp: 0,
            is_self_accepting: false,
        }
    }
}

/// Snapshot of a node and its edges, detached from the graph lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub url: String,
    pub file: Option<PathBuf>,
    /// Sorted.
    pub importers: Vec<String>,
    /// Sorted.
    pub imported_modules: Vec<String>,
    pub version: u64,
    pub last_hmr_timestamp: u64,
    pub is_self_accepting: bool,
    pub has_transform: bool,
    pub has_ssr_transform: bool,
    pub has_ssr_module: bool,
}

#[derive(Debug, Default)]
pub(crate) struct GraphInner {
    pub(crate) nodes: FxHashMap<String, ModuleNode>,
    pub(crate) imported: FxHashMap<String, FxHashSet<String>>,
    pub(crate) importers: FxHashMap<String, FxHashSet<String>>,
    pub(crate) file_to_urls: FxHashMap<PathBuf, BTreeSet<String>>,
}

impl GraphInner {
    fn info(&self, node: &ModuleNode) -> ModuleInfo {
        ModuleInfo {
            url: node.url.clone(),
            file: node.file.clone(),
            importers: sorted(self.importers.get(&node.url)),
            imported_modules: sorted(self.imported.get(&node.url)),
            version: node.version,
            last_hmr_timestamp: node.last_hmr_timestamp,
            is_self_accepting: node.is_self_accepting,
            has_transform: node.transform_result.is_some(),
            has_ssr_transform: node.ssr_transform_result.is_some(),
            has_ssr_module: node.ssr_module.is_some(),
        }
    }
}

fn sorted(set: Option<&FxHashSet<String>>) -> Vec<String> {
    let mut out: Vec<String> = set.map(|s| s.iter().cloned().collect()).unwrap_or_default();
    out.sort();
    out
}

/// Shared handle to the graph. Cloning is cheap and every clone sees the
/// same data.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    pub(crate) inner: Arc<RwLock<GraphInner>>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }
}
