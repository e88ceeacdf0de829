//! The pluggable transform pipeline and its cached output.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;

use crate::error::Result;
use crate::graph::ModuleGraph;
use crate::resolver::{Resolved, Resolver};

/// What a pipeline hands back for one module.
#[derive(Debug, Clone, Default)]
pub struct TransformOutput {
    pub code: String,
    /// Source map JSON, if the pipeline produced one.
    pub map: Option<String>,
    /// Import specifiers as written in the source, in declaration order.
    pub dependencies: Vec<String>,
    /// The module handles its own hot replacement.
    pub self_accepting: bool,
}

impl TransformOutput {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }

    pub fn with_map(mut self, map: impl Into<String>) -> Self {
        self.map = Some(map.into());
        self
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn self_accepting(mut self, accepts: bool) -> Self {
        self.self_accepting = accepts;
        self
    }
}

/// Read-only view a pipeline gets while transforming.
pub struct TransformContext<'a> {
    url: &'a str,
    ssr: bool,
    resolver: &'a Resolver,
    graph: &'a ModuleGraph,
}

impl<'a> TransformContext<'a> {
    pub fn new(url: &'a str, ssr: bool, resolver: &'a Resolver, graph: &'a ModuleGraph) -> Self {
        Self {
            url,
            ssr,
            resolver,
            graph,
        }
    }

    pub fn url(&self) -> &str {
        self.url
    }

    /// `true` when the output is for server-side evaluation.
    pub fn ssr(&self) -> bool {
        self.ssr
    }

    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    pub fn resolver(&self) -> &Resolver {
        self.resolver
    }

    /// When `url` last received a hot update. Pipelines append it to
    /// rewritten imports so browsers refetch updated dependencies.
    pub fn hmr_timestamp(&self, url: &str) -> u64 {
        self.graph.last_hmr_timestamp(url)
    }

    /// Resolve a specifier the way the graph will, so rewritten imports and
    /// graph edges agree.
    pub async fn resolve(&self, specifier: &str, importer: &Path) -> Result<Resolved> {
        self.resolver.resolve(specifier, importer).await
    }
}

/// Turns a source file into servable code.
#[async_trait]
pub trait TransformPipeline: Send + Sync {
    async fn transform(
        &self,
        file: &Path,
        ctx: &TransformContext<'_>,
    ) -> anyhow::Result<TransformOutput>;
}

/// One dependency of a transformed module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImport {
    pub specifier: String,
    pub resolved: Resolved,
}

/// Cached outcome of transforming one url.
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub code: String,
    pub map: Option<String>,
    /// Every dependency in declaration order, foreign ones included.
    pub imports: Vec<ResolvedImport>,
    pub self_accepting: bool,
}

impl TransformResult {
    /// Local dependencies as `(url, file)` pairs, deduplicated in first-seen
    /// order.
    pub fn imported_urls(&self) -> Vec<(String, &Path)> {
        let mut seen = rustc_hash::FxHashSet::default();
        self.imports
            .iter()
            .filter_map(|import| match &import.resolved {
                Resolved::Local { file, url } if seen.insert(url.as_str()) => {
                    Some((url.clone(), file.as_path()))
                }
                _ => None,
            })
            .collect()
    }

    /// Code with the source map appended as a base64 data url.
    pub fn code_with_inline_map(&self) -> String {
        match &self.map {
            Some(map) => format!(
                "{}\n//# sourceMappingURL=data:application/json;base64,{}\n",
                self.code,
                STANDARD.encode(map)
            ),
            None => self.code.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn local(spec: &str, url: &str) -> ResolvedImport {
        ResolvedImport {
            specifier: spec.to_string(),
            resolved: Resolved::Local {
                file: PathBuf::from(format!("/p{url}")),
                url: url.to_string(),
            },
        }
    }

    #[test]
    fn imported_urls_skip_foreign_and_duplicates() {
        let result = TransformResult {
            code: String::new(),
            map: None,
            imports: vec![
                local("./b", "/b.ts"),
                ResolvedImport {
                    specifier: "react".to_string(),
                    resolved: Resolved::Foreign {
                        specifier: "react".to_string(),
                    },
                },
                local("./a", "/a.ts"),
                local("./b.ts", "/b.ts"),
            ],
            self_accepting: false,
        };
        let urls: Vec<String> = result.imported_urls().into_iter().map(|(u, _)| u).collect();
        assert_eq!(urls, vec!["/b.ts", "/a.ts"]);
    }

    #[test]
    fn inline_map_is_base64() {
        let result = TransformResult {
            code: "x".to_string(),
            map: Some("{}".to_string()),
            imports: Vec::new(),
            self_accepting: false,
        };
        assert_eq!(
            result.code_with_inline_map(),
            "x\n//# sourceMappingURL=data:application/json;base64,e30=\n"
        );
    }
}
