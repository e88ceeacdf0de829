//! Error page shown when a page request fails.
//!
//! The page loads the client runtime, so the next update reloads it.

use super::pipeline::CLIENT_PATH;

/// Render a self-contained HTML page describing `error` for `url`.
pub fn generate_error_overlay(url: &str, error: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>hotbed: error</title>
<style>
  body {{ margin: 0; background: #181818; color: #e8e8e8; font-family: ui-monospace, Menlo, monospace; }}
  main {{ max-width: 960px; margin: 48px auto; padding: 24px; border-top: 4px solid #ff5555; background: #232323; }}
  h1 {{ color: #ff5555; font-size: 18px; margin: 0 0 8px; }}
  .url {{ color: #8be9fd; margin-bottom: 16px; }}
  pre {{ white-space: pre-wrap; word-break: break-word; line-height: 1.5; }}
  footer {{ color: #888; font-size: 12px; margin-top: 16px; }}
</style>
<script type="module" src="{client}"></script>
</head>
<body>
<main>
  <h1>Failed to serve module</h1>
  <div class="url">{url}</div>
  <pre>{error}</pre>
  <footer>Fix the error and save; the page reloads on the next update.</footer>
</main>
</body>
</html>
"#,
        client = CLIENT_PATH,
        url = html_escape(url),
        error = html_escape(error),
    )
}

/// Escape text for use in HTML content and attribute values.
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
