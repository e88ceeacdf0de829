//! The evaluation seam: how transformed code is run on the server.
//!
//! hotbed does not embed a script engine. An embedder implements
//! [`ModuleEvaluator`] on top of whatever engine it uses and drives module
//! bodies through the [`EvalScope`] handed to it, which provides the
//! import, re-export and `import.meta` hooks transformed code expects.

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use super::loader::SsrLoader;
use super::module::{Exports, ImportedModule};
use crate::error::{Error, Result};
use crate::resolver::Resolved;
use crate::url::is_bare_specifier;

/// `import.meta` of the module being evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportMeta {
    pub url: String,
    pub file: PathBuf,
}

/// A thrown error, as reported by the evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalFailure {
    pub message: String,
    /// Engine stack trace with positions in transformed code.
    pub stack: Option<String>,
}

impl EvalFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

impl std::fmt::Display for EvalFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Runs one module body.
#[async_trait]
pub trait ModuleEvaluator: Send + Sync {
    async fn evaluate(&self, code: &str, scope: &mut EvalScope<'_>) -> Result<(), EvalFailure>;
}

pub type ImportFuture<'s> = Pin<Box<dyn Future<Output = Result<ImportedModule>> + Send + 's>>;

/// Per-module evaluation environment.
pub struct EvalScope<'a> {
    loader: &'a SsrLoader,
    stack: &'a [String],
    deps: FxHashMap<String, ImportedModule>,
    exports: Exports,
    meta: ImportMeta,
}

impl<'a> EvalScope<'a> {
    pub(crate) fn new(
        loader: &'a SsrLoader,
        stack: &'a [String],
        deps: FxHashMap<String, ImportedModule>,
        meta: ImportMeta,
    ) -> Self {
        Self {
            loader,
            stack,
            deps,
            exports: Exports::new(),
            meta,
        }
    }

    pub fn import_meta(&self) -> &ImportMeta {
        &self.meta
    }

    /// Static import. Local dependencies were loaded before evaluation began;
    /// bare specifiers go to the host.
    pub fn import(&self, specifier: &str) -> Result<ImportedModule> {
        if let Some(module) = self.deps.get(specifier) {
            return Ok(module.clone());
        }
        if is_bare_specifier(specifier) {
            let module = self.loader.host().require(specifier, &self.meta.file)?;
            return Ok(ImportedModule::Foreign(module));
        }
        Err(Error::Evaluation {
            url: self.meta.url.clone(),
            message: format!("\"{specifier}\" is imported but was not reported as a dependency"),
            stack: String::new(),
        })
    }

    /// `import()` with a specifier relative to this module.
    pub fn dynamic_import<'s>(&'s self, specifier: &'s str) -> ImportFuture<'s> {
        Box::pin(async move {
            if let Some(module) = self.deps.get(specifier) {
                return Ok(module.clone());
            }
            match self.loader.resolver().resolve(specifier, &self.meta.file).await? {
                Resolved::Local { url, .. } => self
                    .loader
                    .load_with_stack(url, self.stack.to_vec())
                    .await
                    .map(ImportedModule::Local),
                Resolved::Foreign { specifier } => self
                    .loader
                    .host()
                    .require(&specifier, &self.meta.file)
                    .map(ImportedModule::Foreign),
            }
        })
    }

    /// Define or overwrite a named export.
    pub fn export(&mut self, name: impl Into<String>, value: Value) {
        self.exports.insert(name.into(), value);
    }

    /// `export * from`: copy every named export except `default`. Names this
    /// module already exported are left alone.
    pub fn export_all(&mut self, module: &ImportedModule) {
        for (name, value) in module.named_exports() {
            self.exports.entry(name).or_insert(value);
        }
    }

    pub fn exports(&self) -> &Exports {
        &self.exports
    }

    pub fn url(&self) -> &str {
        &self.meta.url
    }

    pub fn file(&self) -> &Path {
        &self.meta.file
    }

    pub(crate) fn into_exports(self) -> Exports {
        self.exports
    }
}
