//! Built-in transform pipeline used by `hotbed dev`.
//!
//! - scripts (`.js .mjs .jsx .ts .tsx`): TypeScript and JSX are lowered with
//!   oxc, imports are rewritten to their served urls
//! - `.json`: a module whose default export is the parsed value
//! - stylesheets requested with `?import`: a module that injects the CSS
//!   through the client runtime and accepts its own updates

mod script;
mod style;

use anyhow::{Context, bail};
use async_trait::async_trait;
use hotbed_core::url::{is_css_request, is_import_request};
use hotbed_core::{TransformContext, TransformOutput, TransformPipeline};
use std::path::Path;

pub use script::{ImportSite, ScriptFacts, scan_script};

/// Url of the client runtime; modules import their hot context from it.
pub const CLIENT_PATH: &str = "/__hotbed_client__.js";

pub(crate) const SCRIPT_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx", "ts", "mts", "cts", "tsx"];

#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinPipeline;

impl BuiltinPipeline {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransformPipeline for BuiltinPipeline {
    async fn transform(
        &self,
        file: &Path,
        ctx: &TransformContext<'_>,
    ) -> anyhow::Result<TransformOutput> {
        let source = ctx
            .resolver()
            .runtime()
            .read_to_string(file)
            .await
            .with_context(|| format!("failed to read {}", file.display()))?;

        if is_css_request(ctx.url()) {
            return Ok(style::css_module(&source, ctx.url(), !ctx.ssr() && is_import_request(ctx.url())));
        }

        match extension(file) {
            "json" => json_module(&source, file),
            ext if SCRIPT_EXTENSIONS.contains(&ext) => script::transform_script(&source, file, ctx).await,
            other => bail!(
                "{} cannot be served as a module (unsupported extension '{}')",
                file.display(),
                other
            ),
        }
    }
}

fn extension(file: &Path) -> &str {
    file.extension().and_then(|e| e.to_str()).unwrap_or("")
}

fn json_module(source: &str, file: &Path) -> anyhow::Result<TransformOutput> {
    let value: serde_json::Value = serde_json::from_str(source)
        .with_context(|| format!("{} is not valid JSON", file.display()))?;
    Ok(TransformOutput::new(format!("export default {};\n", value)))
}
