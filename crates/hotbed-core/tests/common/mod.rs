//! Shared fixtures: a line-oriented pipeline and evaluator over an in-memory
//! project rooted at `/project`.

#![allow(dead_code)]

use async_trait::async_trait;
use hotbed_core::{
    EvalFailure, EvalScope, MemoryRuntime, ModuleEvaluator, ModuleServer, ModuleServerBuilder,
    Runtime, TransformContext, TransformOutput, TransformPipeline,
};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const ROOT: &str = "/project";

/// Quoted string on a line, e.g. `import "./a"` -> `./a`.
fn quoted(line: &str) -> Option<&str> {
    let start = line.find('"')?;
    let rest = &line[start + 1..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

/// Passes sources through unchanged.
///
/// - `import "<spec>"`, `reexport <name> from "<spec>"` and
///   `export * from "<spec>"` lines are dependencies
/// - a line containing `import.meta.hot.accept` makes the module self-accepting
#[derive(Clone)]
pub struct LinePipeline {
    runtime: MemoryRuntime,
    calls: Arc<AtomicUsize>,
    delay: Duration,
}

impl LinePipeline {
    pub fn new(runtime: MemoryRuntime) -> Self {
        Self {
            runtime,
            calls: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl TransformPipeline for LinePipeline {
    async fn transform(
        &self,
        file: &Path,
        _ctx: &TransformContext<'_>,
    ) -> anyhow::Result<TransformOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let code = self.runtime.read_to_string(file).await?;
        let dependencies: Vec<String> = code
            .lines()
            .map(str::trim)
            .filter(|line| {
                line.starts_with("import \"")
                    || line.starts_with("reexport ")
                    || line.starts_with("export * from ")
            })
            .filter_map(|line| quoted(line).map(str::to_string))
            .collect();
        let accepts = code.contains("import.meta.hot.accept");

        Ok(TransformOutput::new(code)
            .with_dependencies(dependencies)
            .self_accepting(accepts))
    }
}

/// Interprets the same line format on the server side.
///
/// - `export <name> = <json>`
/// - `export * from "<spec>"`
/// - `reexport <name> from "<spec>"`
/// - `dynamic <name> from "<spec>"` exports the default of `import(spec)`
/// - `throw <message>` fails with a stack pointing at the current line
#[derive(Default, Clone)]
pub struct LineEvaluator {
    evaluations: Arc<AtomicUsize>,
}

impl LineEvaluator {
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModuleEvaluator for LineEvaluator {
    async fn evaluate(&self, code: &str, scope: &mut EvalScope<'_>) -> Result<(), EvalFailure> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);

        for (index, line) in code.lines().map(str::trim).enumerate() {
            let fail = |e: hotbed_core::Error| EvalFailure::new(e.to_string());

            if let Some(message) = line.strip_prefix("throw ") {
                return Err(EvalFailure::new(message).with_stack(format!(
                    "Error: {message}\n    at render ({}:{}:1)",
                    scope.url(),
                    index + 1
                )));
            } else if line.starts_with("export * from ") {
                let spec = quoted(line).unwrap_or_default();
                let module = scope.import(spec).map_err(fail)?;
                scope.export_all(&module);
            } else if let Some(rest) = line.strip_prefix("reexport ") {
                let name = rest.split_whitespace().next().unwrap_or_default().to_string();
                let spec = quoted(line).unwrap_or_default();
                let module = scope.import(spec).map_err(fail)?;
                let value = module.get(&name).cloned().unwrap_or(Value::Null);
                scope.export(name, value);
            } else if let Some(rest) = line.strip_prefix("dynamic ") {
                let name = rest.split_whitespace().next().unwrap_or_default().to_string();
                let spec = quoted(line).unwrap_or_default().to_string();
                let module = scope.dynamic_import(&spec).await.map_err(fail)?;
                let value = module.get("default").cloned().unwrap_or(Value::Null);
                scope.export(name, value);
            } else if let Some(rest) = line.strip_prefix("export ") {
                if let Some((name, json)) = rest.split_once(" = ") {
                    let value: Value = serde_json::from_str(json.trim())
                        .map_err(|e| EvalFailure::new(e.to_string()))?;
                    scope.export(name.trim(), value);
                }
            }
        }
        Ok(())
    }
}

pub fn runtime(files: &[(&str, &str)]) -> MemoryRuntime {
    let runtime = MemoryRuntime::new(ROOT);
    for (path, content) in files {
        runtime.insert(format!("{ROOT}{path}"), content.as_bytes().to_vec());
    }
    runtime
}

pub fn builder(runtime: MemoryRuntime, pipeline: LinePipeline) -> ModuleServerBuilder {
    ModuleServer::builder(ROOT).runtime(runtime).pipeline(pipeline)
}

pub fn server(runtime: MemoryRuntime, pipeline: LinePipeline) -> ModuleServer {
    builder(runtime, pipeline)
        .evaluator(LineEvaluator::default())
        .build()
        .unwrap()
}

pub fn project(files: &[(&str, &str)]) -> (ModuleServer, LinePipeline) {
    let runtime = runtime(files);
    let pipeline = LinePipeline::new(runtime.clone());
    (server(runtime, pipeline.clone()), pipeline)
}
