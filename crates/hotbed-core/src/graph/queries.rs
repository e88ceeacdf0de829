//! Read-only queries for ModuleGraph.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{ModuleGraph, ModuleInfo, sorted};
use crate::ssr::SsrModule;
use crate::transform::TransformResult;

impl ModuleGraph {
    pub fn node(&self, url: &str) -> Option<ModuleInfo> {
        let inner = self.inner.read();
        inner.nodes.get(url).map(|node| inner.info(node))
    }

    pub fn contains(&self, url: &str) -> bool {
        self.inner.read().nodes.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().nodes.is_empty()
    }

    /// All urls, sorted.
    pub fn urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.inner.read().nodes.keys().cloned().collect();
        urls.sort();
        urls
    }

    /// Urls backed by `file`, sorted.
    pub fn urls_for_file(&self, file: &Path) -> Vec<String> {
        self.inner
            .read()
            .file_to_urls
            .get(file)
            .map(|urls| urls.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn file(&self, url: &str) -> Option<PathBuf> {
        self.inner.read().nodes.get(url).and_then(|n| n.file.clone())
    }

    pub fn version(&self, url: &str) -> Option<u64> {
        self.inner.read().nodes.get(url).map(|n| n.version)
    }

    /// Timestamp of the last hot update that touched `url`, 0 if none.
    pub fn last_hmr_timestamp(&self, url: &str) -> u64 {
        self.inner
            .read()
            .nodes
            .get(url)
            .map(|n| n.last_hmr_timestamp)
            .unwrap_or_default()
    }

    /// Direct importers of `url`, sorted.
    pub fn importers(&self, url: &str) -> Vec<String> {
        sorted(self.inner.read().importers.get(url))
    }

    /// Direct imports of `url`, sorted.
    pub fn imported_modules(&self, url: &str) -> Vec<String> {
        sorted(self.inner.read().imported.get(url))
    }

    pub fn transform_result(&self, url: &str, ssr: bool) -> Option<Arc<TransformResult>> {
        let inner = self.inner.read();
        let node = inner.nodes.get(url)?;
        if ssr {
            node.ssr_transform_result.clone()
        } else {
            node.transform_result.clone()
        }
    }

    pub fn ssr_module(&self, url: &str) -> Option<SsrModule> {
        self.inner
            .read()
            .nodes
            .get(url)
            .and_then(|n| n.ssr_module.clone())
    }

    /// Source map of the server-side transform, falling back to the browser
    /// one. `key` may be a url or a file path.
    pub fn source_map_for(&self, key: &str) -> Option<String> {
        let inner = self.inner.read();
        let node = inner.nodes.get(key).or_else(|| {
            inner
                .file_to_urls
                .get(Path::new(key))
                .and_then(|urls| urls.iter().next())
                .and_then(|url| inner.nodes.get(url))
        })?;
        node.ssr_transform_result
            .as_ref()
            .or(node.transform_result.as_ref())
            .and_then(|r| r.map.clone())
    }

    /// `true` when every forward edge has its reverse twin and vice versa.
    pub fn is_consistent(&self) -> bool {
        let inner = self.inner.read();
        let forward_ok = inner.imported.iter().all(|(from, targets)| {
            targets.iter().all(|to| {
                inner
                    .importers
                    .get(to)
                    .is_some_and(|set| set.contains(from))
            })
        });
        let reverse_ok = inner.importers.iter().all(|(to, sources)| {
            sources.iter().all(|from| {
                inner
                    .imported
                    .get(from)
                    .is_some_and(|set| set.contains(to))
            })
        });
        forward_ok && reverse_ok
    }
}
