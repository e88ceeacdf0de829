//! Url helpers.
//!
//! A module url is a root-relative path (`/src/main.ts`) or, for files
//! outside the project root, an absolute path behind the `/@fs/` prefix.
//! Urls may carry a query; `?import` marks a non-JS asset imported from JS
//! and `t=<timestamp>` is the cache-buster added to hot updates.

use std::hash::Hasher;

/// Prefix for urls pointing outside the project root.
pub const FS_PREFIX: &str = "/@fs/";

const CSS_LANGS: &[&str] = &[".css", ".less", ".sass", ".scss", ".styl", ".stylus", ".postcss"];

/// Strip query and hash.
pub fn clean_url(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

/// The raw query string, without the leading `?`.
pub fn query(url: &str) -> Option<&str> {
    let start = url.find('?')?;
    let rest = &url[start + 1..];
    let end = rest.find('#').unwrap_or(rest.len());
    Some(&rest[..end])
}

fn query_params(url: &str) -> impl Iterator<Item = &str> {
    query(url)
        .unwrap_or_default()
        .split('&')
        .filter(|p| !p.is_empty())
}

/// Rebuild a url from its path and a list of query params.
fn with_params(url: &str, params: &[&str]) -> String {
    let path = clean_url(url);
    let hash = url.find('#').map(|i| &url[i..]).unwrap_or_default();
    if params.is_empty() {
        format!("{path}{hash}")
    } else {
        format!("{path}?{}{hash}", params.join("&"))
    }
}

/// Drop the `t=` cache-busting param so every timestamped request maps to
/// the same graph node.
pub fn remove_timestamp_query(url: &str) -> String {
    if query(url).is_none() {
        return url.to_string();
    }
    let kept: Vec<&str> = query_params(url)
        .filter(|p| !p.starts_with("t="))
        .collect();
    with_params(url, &kept)
}

/// Add `param` in front of any existing query params.
pub fn inject_query(url: &str, param: &str) -> String {
    let mut params = vec![param];
    params.extend(query_params(url).filter(|p| *p != param));
    with_params(url, &params)
}

/// `true` for urls carrying the bare `import` query flag.
pub fn is_import_request(url: &str) -> bool {
    query_params(url).any(|p| p == "import")
}

/// Stylesheet urls, judged by the extension of the path part.
pub fn is_css_request(url: &str) -> bool {
    let path = clean_url(url);
    CSS_LANGS.iter().any(|ext| path.ends_with(ext))
}

/// CSS modules export class names to JS and behave like ordinary modules.
pub fn is_css_module(url: &str) -> bool {
    let path = clean_url(url);
    CSS_LANGS
        .iter()
        .any(|ext| path.ends_with(&format!(".module{ext}")))
}

pub fn is_html_request(url: &str) -> bool {
    clean_url(url).ends_with(".html")
}

/// A specifier that names a package rather than a path.
pub fn is_bare_specifier(specifier: &str) -> bool {
    !specifier.is_empty()
        && !specifier.starts_with('.')
        && !specifier.starts_with('/')
        && !specifier.contains("://")
}

/// Stable id for the `<style>` element carrying a stylesheet url.
pub fn style_id(url: &str) -> String {
    let mut hasher = seahash::SeaHasher::new();
    hasher.write(clean_url(url).as_bytes());
    format!("{:016x}", hasher.finish())
}

/// Directory part of a url path, always ending in `/`.
pub fn url_dirname(url: &str) -> &str {
    let path = clean_url(url);
    match path.rfind('/') {
        Some(i) => &path[..=i],
        None => "/",
    }
}

/// Normalize an incoming request url to its graph key.
pub fn normalize_url(url: &str) -> String {
    let url = remove_timestamp_query(url);
    if url.starts_with('/') {
        url
    } else {
        format!("/{url}")
    }
}
