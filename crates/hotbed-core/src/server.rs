//! The assembled module server.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use crate::cache::TransformCache;
use crate::error::{Error, Result};
use crate::graph::ModuleGraph;
use crate::hmr::{
    BoundaryPolicy, Broadcaster, ClientId, DefaultBoundaryPolicy, FileEvent, InvalidationEngine,
    PublishReport, UpdateDecision,
};
use crate::resolver::{Resolver, ResolverPlugin};
use crate::runtime::Runtime;
use crate::runtime::native::NativeRuntime;
use crate::ssr::{
    EvalFailure, EvalScope, HostModules, ModuleEvaluator, SsrLoader, SsrModule, StaticHost,
};
use crate::transform::{TransformPipeline, TransformResult};

/// Evaluator used when the embedder did not provide one.
struct NoEvaluator;

#[async_trait::async_trait]
impl ModuleEvaluator for NoEvaluator {
    async fn evaluate(
        &self,
        _code: &str,
        scope: &mut EvalScope<'_>,
    ) -> std::result::Result<(), EvalFailure> {
        Err(EvalFailure::new(format!(
            "cannot evaluate {}: no module evaluator configured",
            scope.url()
        )))
    }
}

/// Builder for [`ModuleServer`].
pub struct ModuleServerBuilder {
    root: PathBuf,
    runtime: Arc<dyn Runtime>,
    pipeline: Option<Arc<dyn TransformPipeline>>,
    evaluator: Arc<dyn ModuleEvaluator>,
    host: Arc<dyn HostModules>,
    policy: Arc<dyn BoundaryPolicy>,
    plugins: Vec<Arc<dyn ResolverPlugin>>,
    extensions: Option<Vec<String>>,
    client_buffer: usize,
}

impl ModuleServerBuilder {
    fn new(root: PathBuf) -> Self {
        Self {
            root,
            runtime: Arc::new(NativeRuntime),
            pipeline: None,
            evaluator: Arc::new(NoEvaluator),
            host: Arc::new(StaticHost::new()),
            policy: Arc::new(DefaultBoundaryPolicy),
            plugins: Vec::new(),
            extensions: None,
            client_buffer: 64,
        }
    }

    pub fn runtime(mut self, runtime: impl Runtime + 'static) -> Self {
        self.runtime = Arc::new(runtime);
        self
    }

    pub fn pipeline(mut self, pipeline: impl TransformPipeline + 'static) -> Self {
        self.pipeline = Some(Arc::new(pipeline));
        self
    }

    pub fn evaluator(mut self, evaluator: impl ModuleEvaluator + 'static) -> Self {
        self.evaluator = Arc::new(evaluator);
        self
    }

    pub fn host(mut self, host: impl HostModules + 'static) -> Self {
        self.host = Arc::new(host);
        self
    }

    pub fn boundary_policy(mut self, policy: impl BoundaryPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn resolver_plugin(mut self, plugin: impl ResolverPlugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    pub fn client_buffer(mut self, size: usize) -> Self {
        self.client_buffer = size;
        self
    }

    pub fn build(self) -> Result<ModuleServer> {
        let pipeline = self
            .pipeline
            .ok_or_else(|| Error::InvalidConfig("a transform pipeline is required".into()))?;
        if self.client_buffer == 0 {
            return Err(Error::InvalidConfig(
                "client buffer must hold at least one message".into(),
            ));
        }

        let mut resolver = Resolver::new(self.root, self.runtime);
        if let Some(extensions) = self.extensions {
            resolver = resolver.with_extensions(extensions);
        }
        for plugin in self.plugins {
            resolver = resolver.with_plugin(plugin);
        }
        let resolver = Arc::new(resolver);

        let graph = ModuleGraph::new();
        let transforms = Arc::new(TransformCache::new(
            graph.clone(),
            Arc::clone(&resolver),
            pipeline,
        ));
        let loader = SsrLoader::new(
            Arc::clone(&transforms),
            Arc::clone(&resolver),
            self.evaluator,
            self.host,
        );

        Ok(ModuleServer {
            engine: InvalidationEngine::new(graph.clone(), self.policy),
            broadcaster: Broadcaster::new(self.client_buffer),
            graph,
            resolver,
            transforms,
            loader,
        })
    }
}

/// All per-process dev server state: one graph, one cache, one set of
/// clients.
pub struct ModuleServer {
    graph: ModuleGraph,
    resolver: Arc<Resolver>,
    transforms: Arc<TransformCache>,
    engine: InvalidationEngine,
    broadcaster: Broadcaster,
    loader: SsrLoader,
}

impl ModuleServer {
    pub fn builder(root: impl Into<PathBuf>) -> ModuleServerBuilder {
        ModuleServerBuilder::new(root.into())
    }

    pub fn graph(&self) -> &ModuleGraph {
        &self.graph
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn transforms(&self) -> &TransformCache {
        &self.transforms
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Transformed code for a browser request.
    pub async fn transform_request(&self, url: &str) -> Result<Arc<TransformResult>> {
        self.transforms.get_or_transform(url, false).await
    }

    /// Load a module, with its imports, for server-side rendering.
    pub async fn ssr_load_module(&self, url: &str) -> Result<SsrModule> {
        self.loader.load_module(url).await
    }

    /// Invalidate what `event` touches and notify every client.
    pub fn handle_file_event(&self, event: &FileEvent) -> UpdateDecision {
        let decision = self.engine.handle_event(event);
        self.broadcaster.publish_decision(&decision);
        decision
    }

    pub fn connect_client(&self) -> (ClientId, mpsc::Receiver<String>) {
        self.broadcaster.connect()
    }

    pub fn disconnect_client(&self, id: ClientId) {
        self.broadcaster.disconnect(id);
    }

    pub fn send_custom(&self, id: &str, payload: serde_json::Value) -> PublishReport {
        self.broadcaster.send_custom(id, payload)
    }

    /// Drop all clients and forget all modules.
    pub fn shutdown(&self) {
        info!(
            modules = self.graph.len(),
            clients = self.broadcaster.client_count(),
            "shutting down module server"
        );
        self.broadcaster.close_all();
        self.graph.clear();
    }
}
