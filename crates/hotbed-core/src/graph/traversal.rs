//! Graph traversal helpers.

use rustc_hash::FxHashSet;
use std::collections::VecDeque;

use super::ModuleGraph;

impl ModuleGraph {
    /// Every module that reaches `url` through importer edges, sorted.
    /// `url` itself is included only when it sits on a cycle.
    pub fn transitive_importers(&self, url: &str) -> Vec<String> {
        let inner = self.inner.read();
        let mut visited: FxHashSet<&str> = FxHashSet::default();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(url);

        while let Some(current) = queue.pop_front() {
            if let Some(importers) = inner.importers.get(current) {
                for importer in importers {
                    if visited.insert(importer.as_str()) {
                        queue.push_back(importer.as_str());
                    }
                }
            }
        }

        let mut out: Vec<String> = visited.into_iter().map(str::to_string).collect();
        out.sort();
        out
    }

    /// Every module reachable from `url` through import edges, sorted.
    pub fn transitive_imports(&self, url: &str) -> Vec<String> {
        let inner = self.inner.read();
        let mut visited: FxHashSet<&str> = FxHashSet::default();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(url);

        while let Some(current) = queue.pop_front() {
            if let Some(targets) = inner.imported.get(current) {
                for target in targets {
                    if visited.insert(target.as_str()) {
                        queue.push_back(target.as_str());
                    }
                }
            }
        }

        let mut out: Vec<String> = visited.into_iter().map(str::to_string).collect();
        out.sort();
        out
    }
}
