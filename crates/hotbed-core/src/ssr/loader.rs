//! Loading and evaluating modules for server-side rendering.
//!
//! Each load walks the import tree depth-first: dependencies are loaded in
//! declaration order before the importing module is evaluated. A module is
//! evaluated at most once per version; concurrent loads of the same url
//! share one evaluation.
//!
//! Two kinds of cycles are cut short with an empty placeholder namespace:
//!
//! - within one load, a url already on the current import stack;
//! - across loads, a wait that would close a loop of loads each waiting on
//!   the next. Every load records which url it is waiting on, and a wait is
//!   refused when following those records leads back into its own stack.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, warn};

use super::eval::{EvalScope, ImportMeta, ModuleEvaluator};
use super::host::HostModules;
use super::module::{ImportedModule, SsrModule};
use super::stacktrace::rewrite_stacktrace;
use crate::cache::TransformCache;
use crate::error::{Error, Result};
use crate::graph::ModuleGraph;
use crate::resolver::{Resolved, Resolver};
use crate::url::normalize_url;

type Pending = Arc<OnceCell<Result<SsrModule>>>;
type LoadFuture<'a> = Pin<Box<dyn Future<Output = Result<SsrModule>> + Send + 'a>>;

pub struct SsrLoader {
    graph: ModuleGraph,
    transforms: Arc<TransformCache>,
    resolver: Arc<Resolver>,
    evaluator: Arc<dyn ModuleEvaluator>,
    host: Arc<dyn HostModules>,
    pending: DashMap<String, Pending>,
    /// url being instantiated -> url it is currently waiting on
    waiting: Mutex<FxHashMap<String, String>>,
}

impl std::fmt::Debug for SsrLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsrLoader")
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl SsrLoader {
    pub fn new(
        transforms: Arc<TransformCache>,
        resolver: Arc<Resolver>,
        evaluator: Arc<dyn ModuleEvaluator>,
        host: Arc<dyn HostModules>,
    ) -> Self {
        Self {
            graph: transforms.graph().clone(),
            transforms,
            resolver,
            evaluator,
            host,
            pending: DashMap::new(),
            waiting: Mutex::new(FxHashMap::default()),
        }
    }

    pub(crate) fn host(&self) -> &dyn HostModules {
        self.host.as_ref()
    }

    pub(crate) fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Load `url` and everything it imports, returning its frozen exports.
    pub async fn load_module(&self, url: &str) -> Result<SsrModule> {
        self.load_with_stack(normalize_url(url), Vec::new()).await
    }

    pub(crate) fn load_with_stack(&self, url: String, stack: Vec<String>) -> LoadFuture<'_> {
        Box::pin(async move {
            if stack.contains(&url) {
                warn!("Circular dependency: {} -> {}", stack.join(" -> "), url);
                return Ok(SsrModule::placeholder(url));
            }

            if let Some(module) = self.graph.ssr_module(&url) {
                return Ok(module);
            }

            let waiter = stack.last().cloned();
            if let Some(waiter) = &waiter {
                if !self.begin_wait(waiter, &url, &stack) {
                    warn!(
                        "Circular dependency across concurrent loads: {} -> {}",
                        stack.join(" -> "),
                        url
                    );
                    return Ok(SsrModule::placeholder(url));
                }
            }

            let outcome = self.join_or_instantiate(&url, &stack).await;

            if let Some(waiter) = &waiter {
                self.waiting.lock().remove(waiter);
            }
            outcome
        })
    }

    async fn join_or_instantiate(&self, url: &str, stack: &[String]) -> Result<SsrModule> {
        let cell = match self.pending.entry(url.to_string()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                if let Some(module) = self.graph.ssr_module(url) {
                    return Ok(module);
                }
                entry.insert(Arc::new(OnceCell::new())).clone()
            }
        };

        let outcome = cell
            .get_or_init(|| self.instantiate(url.to_string(), stack.to_vec()))
            .await
            .clone();

        self.pending
            .remove_if(url, |_, current| Arc::ptr_eq(current, &cell));
        outcome
    }

    /// Record that `waiter` waits on `target`, unless that would close a
    /// loop back into `stack`.
    fn begin_wait(&self, waiter: &str, target: &str, stack: &[String]) -> bool {
        let mut waiting = self.waiting.lock();
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        let mut cursor = Some(target);

        while let Some(current) = cursor {
            if stack.iter().any(|s| s == current) {
                return false;
            }
            if !seen.insert(current) {
                break;
            }
            cursor = waiting.get(current).map(String::as_str);
        }

        waiting.insert(waiter.to_string(), target.to_string());
        true
    }

    async fn instantiate(&self, url: String, stack: Vec<String>) -> Result<SsrModule> {
        let version = self.graph.version(&url).unwrap_or_default();
        let result = self.transforms.get_or_transform(&url, true).await?;
        let file = self
            .graph
            .file(&url)
            .ok_or_else(|| Error::UrlNotFound(url.clone()))?;

        let mut child_stack = stack;
        child_stack.push(url.clone());

        let mut deps = FxHashMap::default();
        for import in &result.imports {
            if let Resolved::Local { url: dep_url, .. } = &import.resolved {
                let module = self
                    .load_with_stack(dep_url.clone(), child_stack.clone())
                    .await?;
                deps.insert(import.specifier.clone(), ImportedModule::Local(module));
            }
        }

        let meta = ImportMeta {
            url: url.clone(),
            file,
        };
        let mut scope = EvalScope::new(self, &child_stack, deps, meta);

        if let Err(failure) = self.evaluator.evaluate(&result.code, &mut scope).await {
            let raw = failure.stack.as_deref().unwrap_or(&failure.message);
            let stack = rewrite_stacktrace(raw, &self.graph);
            error!("Error when evaluating SSR module {}:\n{}", url, stack);
            return Err(Error::Evaluation {
                url,
                message: failure.message,
                stack,
            });
        }

        let module = SsrModule::new(url.clone(), scope.into_exports());
        if !self.graph.set_ssr_module(&url, version, module.clone()) {
            debug!(url = %url, "module changed during evaluation, not caching");
        }
        Ok(module)
    }
}
