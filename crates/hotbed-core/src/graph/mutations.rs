//! Mutation methods for ModuleGraph.

use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

use super::{GraphInner, ModuleGraph, ModuleInfo, ModuleNode};
use crate::ssr::SsrModule;
use crate::transform::TransformResult;

impl GraphInner {
    pub(crate) fn ensure(&mut self, url: &str, file: Option<&Path>) -> &mut ModuleNode {
        let node = self
            .nodes
            .entry(url.to_string())
            .or_insert_with(|| ModuleNode::new(url));

        if let Some(file) = file {
            if node.file.is_none() {
                node.file = Some(file.to_path_buf());
                self.file_to_urls
                    .entry(file.to_path_buf())
                    .or_default()
                    .insert(url.to_string());
            }
        }
        node
    }

    /// Make `url`'s outgoing edges exactly `targets`, keeping the reverse map
    /// in step. Returns the urls that lost `url` as an importer.
    pub(crate) fn reconcile(&mut self, url: &str, targets: &[(String, PathBuf)]) -> Vec<String> {
        for (target, file) in targets {
            self.ensure(target, Some(file));
        }

        let next: FxHashSet<String> = targets.iter().map(|(t, _)| t.clone()).collect();
        let previous = self.imported.remove(url).unwrap_or_default();

        let mut pruned: Vec<String> = previous.difference(&next).cloned().collect();
        pruned.sort();
        for old in &pruned {
            if let Some(set) = self.importers.get_mut(old) {
                set.remove(url);
                if set.is_empty() {
                    self.importers.remove(old);
                }
            }
        }

        for target in next.difference(&previous) {
            self.importers
                .entry(target.clone())
                .or_default()
                .insert(url.to_string());
        }

        if !next.is_empty() {
            self.imported.insert(url.to_string(), next);
        }
        pruned
    }
}

impl ModuleGraph {
    /// Get or create the node for `url`. A file is attached only if the node
    /// has none yet.
    pub fn ensure_node(&self, url: &str, file: Option<&Path>) -> ModuleInfo {
        let mut inner = self.inner.write();
        let node = inner.ensure(url, file).clone();
        inner.info(&node)
    }

    /// Replace the outgoing edges of `url` with `imports`, creating target
    /// nodes as needed. Returns the targets whose edge from `url` was removed.
    pub fn update_module_imports(&self, url: &str, imports: &[(String, PathBuf)]) -> Vec<String> {
        let mut inner = self.inner.write();
        inner.ensure(url, None);
        inner.reconcile(url, imports)
    }

    /// Commit a transform computed against `version`.
    ///
    /// Returns `false` and leaves the node untouched when the node was
    /// invalidated after the transform started.
    pub fn store_transform(
        &self,
        url: &str,
        ssr: bool,
        version: u64,
        result: Arc<TransformResult>,
    ) -> bool {
        let mut inner = self.inner.write();
        let current = inner.ensure(url, None).version;
        if current != version {
            trace!(url, version, current, "skipping stale transform");
            return false;
        }

        let imports: Vec<(String, PathBuf)> = result
            .imported_urls()
            .into_iter()
            .map(|(u, f)| (u, f.to_path_buf()))
            .collect();
        inner.reconcile(url, &imports);

        let node = inner.ensure(url, None);
        node.is_self_accepting = result.self_accepting;
        if ssr {
            node.ssr_transform_result = Some(result);
        } else {
            node.transform_result = Some(result);
        }
        true
    }

    /// Commit an evaluated server module, with the same staleness rule as
    /// [`ModuleGraph::store_transform`].
    pub fn set_ssr_module(&self, url: &str, version: u64, module: SsrModule) -> bool {
        let mut inner = self.inner.write();
        match inner.nodes.get_mut(url) {
            Some(node) if node.version == version => {
                node.ssr_module = Some(module);
                true
            }
            _ => false,
        }
    }

    /// Drop cached results for `url` and advance its version.
    pub fn invalidate(&self, url: &str, timestamp: u64) -> bool {
        let mut inner = self.inner.write();
        match inner.nodes.get_mut(url) {
            Some(node) => {
                node.transform_result = None;
                node.ssr_transform_result = None;
                node.ssr_module = None;
                node.version += 1;
                node.last_hmr_timestamp = timestamp;
                true
            }
            None => false,
        }
    }

    /// Drop what an importer of a changed module derived from it: the
    /// browser transform, whose rewritten imports must carry `timestamp`, and
    /// the evaluated server module. The server transform stays valid.
    pub fn invalidate_importer(&self, url: &str, timestamp: u64) {
        if let Some(node) = self.inner.write().nodes.get_mut(url) {
            node.transform_result = None;
            node.ssr_module = None;
            node.version += 1;
            node.last_hmr_timestamp = timestamp;
        }
    }

    /// Empty the graph. Used on server shutdown.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.nodes.clear();
        inner.imported.clear();
        inner.importers.clear();
        inner.file_to_urls.clear();
    }
}
