//! Client runtime injection into served pages.

use super::pipeline::CLIENT_PATH;

/// Add the client runtime script to an HTML page: right after `<head>`, or
/// after `<html>`, or at the very start when the page has neither.
pub fn inject_client(html: &str) -> String {
    let tag = format!(r#"<script type="module" src="{CLIENT_PATH}"></script>"#);
    if html.contains(&tag) {
        return html.to_string();
    }

    let at = open_tag_end(html, "<head").or_else(|| open_tag_end(html, "<html"));
    match at {
        Some(at) => format!("{}\n    {}{}", &html[..at], tag, &html[at..]),
        None => format!("{tag}\n{html}"),
    }
}

// Byte offset just past the `>` of the first `<name ...>` tag, matched
// case-insensitively.
fn open_tag_end(html: &str, name: &str) -> Option<usize> {
    let lower = html.to_ascii_lowercase();
    let mut from = 0;
    while let Some(rel) = lower[from..].find(name) {
        let start = from + rel;
        let after = start + name.len();
        let boundary = lower[after..].chars().next();
        if matches!(boundary, Some('>') | Some(' ') | Some('\n') | Some('\t') | Some('\r')) {
            return lower[after..].find('>').map(|gt| after + gt + 1);
        }
        from = after;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injects_after_head() {
        let html = "<!DOCTYPE html><html><head><title>x</title></head><body></body></html>";
        let out = inject_client(html);
        let head = out.find("<head>").unwrap();
        let script = out.find(CLIENT_PATH).unwrap();
        let title = out.find("<title>").unwrap();
        assert!(head < script && script < title);
    }

    #[test]
    fn header_element_is_not_head() {
        let html = "<html><body><header>x</header></body></html>";
        let out = inject_client(html);
        assert!(out.find(CLIENT_PATH).unwrap() < out.find("<body>").unwrap());
    }

    #[test]
    fn uppercase_and_attributes_are_handled() {
        let out = inject_client("<HTML><HEAD lang=\"en\"></HEAD></HTML>");
        assert!(out.starts_with("<HTML><HEAD lang=\"en\">\n    <script"));
    }

    #[test]
    fn fragment_gets_script_prepended() {
        let out = inject_client("<p>hi</p>");
        assert!(out.starts_with("<script type=\"module\""));
        assert!(out.ends_with("<p>hi</p>"));
    }

    #[test]
    fn injection_is_idempotent() {
        let once = inject_client("<head></head>");
        assert_eq!(inject_client(&once), once);
    }
}
