//! Script modules: lowering with oxc and import rewriting.

use anyhow::{anyhow, bail};
use hotbed_core::url::{inject_query, is_import_request};
use hotbed_core::{Resolved, TransformContext, TransformOutput};
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, CallExpression, ExportAllDeclaration, ExportNamedDeclaration, Expression,
    ImportDeclaration, ImportExpression, StaticMemberExpression, StringLiteral,
};
use oxc_ast_visit::{Visit, walk};
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{TransformOptions, Transformer};
use rustc_hash::{FxHashMap, FxHashSet};
use sourcemap::{SourceMap, SourceMapBuilder};
use std::path::Path;

use super::{CLIENT_PATH, SCRIPT_EXTENSIONS};

/// A string-literal module specifier in generated code. `start..end` covers
/// the literal including its quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSite {
    pub start: usize,
    pub end: usize,
    pub specifier: String,
}

/// What the pipeline needs to know about generated code.
#[derive(Debug, Default)]
pub struct ScriptFacts {
    pub imports: Vec<ImportSite>,
    /// `import.meta.hot` is referenced somewhere.
    pub uses_hot: bool,
    /// `import.meta.hot.accept(...)` is called without naming dependencies.
    pub self_accepting: bool,
}

struct Lowered {
    code: String,
    map: Option<String>,
    facts: ScriptFacts,
}

pub(super) async fn transform_script(
    source: &str,
    file: &Path,
    ctx: &TransformContext<'_>,
) -> anyhow::Result<TransformOutput> {
    // oxc's arena is not Send; all AST work finishes before the first await.
    let lowered = lower(source, file)?;

    let mut dependencies = Vec::new();
    let mut seen = FxHashSet::default();
    let mut rewrites = Vec::new();

    for site in &lowered.facts.imports {
        let dependency = match ctx.resolve(&site.specifier, file).await? {
            Resolved::Local { file: target, url } => {
                let url = if needs_import_flag(&target, &url) {
                    inject_query(&url, "import")
                } else {
                    url
                };
                let served = match ctx.hmr_timestamp(&url) {
                    0 => url.clone(),
                    ts => inject_query(&url, &format!("t={ts}")),
                };
                if served != site.specifier {
                    rewrites.push((site.start, site.end, served));
                }
                url
            }
            Resolved::Foreign { specifier } => specifier,
        };
        if seen.insert(dependency.clone()) {
            dependencies.push(dependency);
        }
    }

    let mut map = lowered
        .map
        .map(|m| shift_map_columns(&m, &lowered.code, &rewrites));
    let mut code = apply_rewrites(&lowered.code, rewrites);
    let self_accepting = lowered.facts.self_accepting;

    if !ctx.ssr() && lowered.facts.uses_hot {
        code = format!(
            "import {{ createHotContext as __hotbed_hot }} from \"{}\";import.meta.hot = __hotbed_hot({});\n{}",
            CLIENT_PATH,
            serde_json::Value::String(ctx.url().to_string()),
            code
        );
        map = map.map(|m| shift_map_lines(&m, 1));
    }

    let mut output = TransformOutput::new(code)
        .with_dependencies(dependencies)
        .self_accepting(self_accepting);
    if let Some(map) = map {
        output = output.with_map(map);
    }
    Ok(output)
}

/// Strip types, lower JSX, and print with a source map.
fn lower(source: &str, file: &Path) -> anyhow::Result<Lowered> {
    let source_type = SourceType::from_path(file)
        .map_err(|e| anyhow!("{}: {}", file.display(), e))?;
    let allocator = Allocator::default();

    let parsed = Parser::new(&allocator, source, source_type).parse();
    if !parsed.errors.is_empty() || parsed.panicked {
        bail!(
            "failed to parse {}:\n{}",
            file.display(),
            join_diagnostics(&parsed.errors)
        );
    }
    let mut program = parsed.program;

    let scoping = SemanticBuilder::new().build(&program).semantic.into_scoping();
    let transformed = Transformer::new(&allocator, file, &TransformOptions::default())
        .build_with_scoping(scoping, &mut program);
    if !transformed.errors.is_empty() {
        bail!(
            "failed to transform {}:\n{}",
            file.display(),
            join_diagnostics(&transformed.errors)
        );
    }

    let printed = Codegen::new()
        .with_options(CodegenOptions {
            source_map_path: Some(file.to_path_buf()),
            ..CodegenOptions::default()
        })
        .build(&program);

    let facts = scan_script(&printed.code)?;
    Ok(Lowered {
        map: printed.map.map(|m| m.to_json_string()),
        code: printed.code,
        facts,
    })
}

fn join_diagnostics<D: std::fmt::Display>(errors: &[D]) -> String {
    errors
        .iter()
        .map(|e| format!("  {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Static imports, re-exports and literal dynamic imports of plain
/// JavaScript in source order, plus its use of the hot API.
pub fn scan_script(code: &str) -> anyhow::Result<ScriptFacts> {
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, code, SourceType::mjs()).parse();
    if !parsed.errors.is_empty() {
        bail!(
            "generated code does not parse:\n{}",
            join_diagnostics(&parsed.errors)
        );
    }

    let mut scanner = ScriptScanner::default();
    scanner.visit_program(&parsed.program);
    scanner.facts.imports.sort_by_key(|site| site.start);
    Ok(scanner.facts)
}

#[derive(Default)]
struct ScriptScanner {
    facts: ScriptFacts,
}

impl ScriptScanner {
    fn record(&mut self, literal: &StringLiteral<'_>) {
        self.facts.imports.push(ImportSite {
            start: literal.span.start as usize,
            end: literal.span.end as usize,
            specifier: literal.value.to_string(),
        });
    }
}

/// `import.meta.hot`
fn is_hot_object(member: &StaticMemberExpression<'_>) -> bool {
    member.property.name.as_str() == "hot"
        && matches!(
            &member.object,
            Expression::MetaProperty(meta)
                if meta.meta.name.as_str() == "import" && meta.property.name.as_str() == "meta"
        )
}

impl<'a> Visit<'a> for ScriptScanner {
    fn visit_import_declaration(&mut self, decl: &ImportDeclaration<'a>) {
        self.record(&decl.source);
    }

    fn visit_export_named_declaration(&mut self, decl: &ExportNamedDeclaration<'a>) {
        if let Some(source) = &decl.source {
            self.record(source);
        }
        walk::walk_export_named_declaration(self, decl);
    }

    fn visit_export_all_declaration(&mut self, decl: &ExportAllDeclaration<'a>) {
        self.record(&decl.source);
    }

    fn visit_import_expression(&mut self, expr: &ImportExpression<'a>) {
        if let Expression::StringLiteral(literal) = &expr.source {
            self.record(literal);
        }
        walk::walk_import_expression(self, expr);
    }

    fn visit_static_member_expression(&mut self, member: &StaticMemberExpression<'a>) {
        if is_hot_object(member) {
            self.facts.uses_hot = true;
        }
        walk::walk_static_member_expression(self, member);
    }

    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let Expression::StaticMemberExpression(callee) = call.callee.without_parentheses() {
            if let Expression::StaticMemberExpression(object) = &callee.object {
                // A string, template or array first argument names dependencies.
                if callee.property.name.as_str() == "accept"
                    && is_hot_object(object)
                    && !matches!(
                        call.arguments.first(),
                        Some(
                            Argument::StringLiteral(_)
                                | Argument::TemplateLiteral(_)
                                | Argument::ArrayExpression(_)
                        )
                    )
                {
                    self.facts.self_accepting = true;
                }
            }
        }
        walk::walk_call_expression(self, call);
    }
}

/// Non-script assets are imported as modules through the `import` flag.
fn needs_import_flag(target: &Path, url: &str) -> bool {
    let ext = target.extension().and_then(|e| e.to_str()).unwrap_or("");
    !SCRIPT_EXTENSIONS.contains(&ext) && !is_import_request(url)
}

fn quoted(specifier: &str) -> String {
    serde_json::Value::String(specifier.to_string()).to_string()
}

fn apply_rewrites(code: &str, mut rewrites: Vec<(usize, usize, String)>) -> String {
    rewrites.sort_by_key(|(start, _, _)| std::cmp::Reverse(*start));
    let mut out = code.to_string();
    for (start, end, specifier) in rewrites {
        out.replace_range(start..end, &quoted(&specifier));
    }
    out
}

fn utf16_len(text: &str) -> i64 {
    text.encode_utf16().count() as i64
}

/// Move generated columns that follow a rewritten literal on the same line
/// by the literal's change in length. Columns are UTF-16 units.
fn shift_map_columns(map: &str, code: &str, rewrites: &[(usize, usize, String)]) -> String {
    if rewrites.is_empty() {
        return map.to_string();
    }
    let Ok(parsed) = SourceMap::from_slice(map.as_bytes()) else {
        return map.to_string();
    };

    // line -> (column where the old literal ended, change in length)
    let mut edits: FxHashMap<u32, Vec<(u32, i64)>> = FxHashMap::default();
    for (start, end, specifier) in rewrites {
        let line_start = code[..*start].rfind('\n').map_or(0, |at| at + 1);
        let line = code[..*start].matches('\n').count() as u32;
        let old_end = utf16_len(&code[line_start..*end]) as u32;
        let delta = utf16_len(&quoted(specifier)) - utf16_len(&code[*start..*end]);
        edits.entry(line).or_default().push((old_end, delta));
    }

    let mut builder = SourceMapBuilder::new(parsed.get_file());
    for idx in 0..parsed.get_source_count() {
        if let Some(source) = parsed.get_source(idx) {
            let id = builder.add_source(source);
            builder.set_source_contents(id, parsed.get_source_contents(idx));
        }
    }
    for token in parsed.tokens() {
        let line = token.get_dst_line();
        let col = token.get_dst_col();
        let shift: i64 = edits.get(&line).map_or(0, |line_edits| {
            line_edits
                .iter()
                .filter(|(old_end, _)| *old_end <= col)
                .map(|(_, delta)| delta)
                .sum()
        });
        let col = (i64::from(col) + shift).max(0) as u32;
        builder.add(
            line,
            col,
            token.get_src_line(),
            token.get_src_col(),
            token.get_source(),
            token.get_name(),
            token.is_range(),
        );
    }

    let mut out = Vec::new();
    if builder.into_sourcemap().to_writer(&mut out).is_err() {
        return map.to_string();
    }
    String::from_utf8(out).unwrap_or_else(|_| map.to_string())
}

/// Prefix `lines` empty generated lines to a JSON source map.
fn shift_map_lines(map: &str, lines: usize) -> String {
    let Ok(mut value) = serde_json::from_str::<serde_json::Value>(map) else {
        return map.to_string();
    };
    if let Some(mappings) = value.get_mut("mappings") {
        if let Some(current) = mappings.as_str() {
            *mappings = serde_json::Value::String(format!("{}{}", ";".repeat(lines), current));
        }
    }
    value.to_string()
}
