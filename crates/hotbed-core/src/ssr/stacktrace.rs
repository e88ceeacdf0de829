//! Mapping evaluator stack traces back to original sources.

use regex::Regex;
use sourcemap::SourceMap;
use std::sync::LazyLock;

use crate::graph::ModuleGraph;

// `    at fn (location:line:col)` or `    at location:line:col`
static FRAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\s*at (?:(.+?)\s+\()?(.+?):(\d+)(?::(\d+))?\)?$").ok());

/// Rewrite each frame whose location has a source map in the graph.
/// Frames without a map, or positions the map does not cover, pass through
/// unchanged.
pub fn rewrite_stacktrace(stack: &str, graph: &ModuleGraph) -> String {
    stack
        .lines()
        .map(|line| rewrite_frame(line, graph).unwrap_or_else(|| line.to_string()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn rewrite_frame(line: &str, graph: &ModuleGraph) -> Option<String> {
    let caps = FRAME.as_ref()?.captures(line)?;
    let function = caps.get(1).map(|m| m.as_str());
    let location = caps.get(2)?.as_str();
    let frame_line: u32 = caps.get(3)?.as_str().parse().ok()?;
    let frame_col: u32 = caps
        .get(4)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(1);

    let raw_map = graph.source_map_for(location)?;
    let map = SourceMap::from_slice(raw_map.as_bytes()).ok()?;
    let token = map.lookup_token(frame_line.checked_sub(1)?, frame_col.saturating_sub(1))?;
    let source = token.get_source()?;

    let mapped = format!(
        "{}:{}:{}",
        source,
        token.get_src_line() + 1,
        token.get_src_col() + 1
    );
    Some(match function {
        Some(name) if name != "eval" => format!("    at {name} ({mapped})"),
        _ => format!("    at {mapped}"),
    })
}
