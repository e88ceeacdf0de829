//! Transform cache with request coalescing.
//!
//! Concurrent requests for the same `(url, ssr)` pair at the same node
//! version share one pipeline run. The first caller installs a pending cell
//! and drives the transform; later callers await the same cell. The result
//! is committed to the graph before the pending cell is removed, so a caller
//! that misses the pending map always finds the committed result instead of
//! starting a second run.
//!
//! A request arriving after an invalidation sees the bumped version and
//! starts its own run rather than joining one that read the old source.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::graph::ModuleGraph;
use crate::resolver::Resolver;
use crate::transform::{ResolvedImport, TransformContext, TransformPipeline, TransformResult};
use crate::url::normalize_url;

type PendingKey = (String, bool, u64);
type Pending = Arc<OnceCell<Result<Arc<TransformResult>>>>;

pub struct TransformCache {
    graph: ModuleGraph,
    resolver: Arc<Resolver>,
    pipeline: Arc<dyn TransformPipeline>,
    pending: DashMap<PendingKey, Pending>,
}

impl std::fmt::Debug for TransformCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformCache")
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl TransformCache {
    pub fn new(
        graph: ModuleGraph,
        resolver: Arc<Resolver>,
        pipeline: Arc<dyn TransformPipeline>,
    ) -> Self {
        Self {
            graph,
            resolver,
            pipeline,
            pending: DashMap::new(),
        }
    }

    pub fn graph(&self) -> &ModuleGraph {
        &self.graph
    }

    /// Number of transforms currently in flight.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Return the cached transform of `url`, running the pipeline at most
    /// once across all concurrent callers when nothing is cached.
    ///
    /// Failures are shared with every waiting caller but never cached, so
    /// the next request retries.
    pub async fn get_or_transform(&self, url: &str, ssr: bool) -> Result<Arc<TransformResult>> {
        let url = normalize_url(url);

        if let Some(hit) = self.graph.transform_result(&url, ssr) {
            trace!(url = %url, ssr, "transform cache hit");
            return Ok(hit);
        }

        let version = self.graph.version(&url).unwrap_or(0);
        let key = (url.clone(), ssr, version);
        let cell = match self.pending.entry(key.clone()) {
            Entry::Occupied(entry) => {
                trace!(url = %url, ssr, "joining in-flight transform");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                // A run may have committed between the first check and taking
                // the shard lock.
                if let Some(hit) = self.graph.transform_result(&url, ssr) {
                    return Ok(hit);
                }
                entry.insert(Arc::new(OnceCell::new())).clone()
            }
        };

        let outcome = cell
            .get_or_init(|| self.run_transform(&url, ssr, version))
            .await
            .clone();

        self.pending.remove_if(&key, |_, current| Arc::ptr_eq(current, &cell));
        outcome
    }

    /// `version` is the node version the run was keyed on; the result is
    /// only committed if the node is still at that version.
    async fn run_transform(
        &self,
        url: &str,
        ssr: bool,
        version: u64,
    ) -> Result<Arc<TransformResult>> {
        let file = match self.graph.file(url) {
            Some(file) => file,
            None => self.resolver.resolve_url(url)?,
        };
        self.graph.ensure_node(url, Some(&file));

        debug!(url, ssr, file = %file.display(), "transforming");
        let ctx = TransformContext::new(url, ssr, &self.resolver, &self.graph);
        let output = self
            .pipeline
            .transform(&file, &ctx)
            .await
            .map_err(|e| Error::Transform {
                url: url.to_string(),
                message: format!("{e:#}"),
            })?;

        let imports = self.resolve_imports(&output.dependencies, &file).await?;
        let result = Arc::new(TransformResult {
            code: output.code,
            map: output.map,
            imports,
            self_accepting: output.self_accepting,
        });

        if !self.graph.store_transform(url, ssr, version, Arc::clone(&result)) {
            debug!(url, ssr, "module changed during transform, result not cached");
        }
        Ok(result)
    }

    async fn resolve_imports(
        &self,
        specifiers: &[String],
        importer: &Path,
    ) -> Result<Vec<ResolvedImport>> {
        let mut imports = Vec::with_capacity(specifiers.len());
        for specifier in specifiers {
            let resolved = self.resolver.resolve(specifier, importer).await?;
            imports.push(ResolvedImport {
                specifier: specifier.clone(),
                resolved,
            });
        }
        Ok(imports)
    }
}
