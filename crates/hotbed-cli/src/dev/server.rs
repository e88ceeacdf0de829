//! HTTP side of the dev server.
//!
//! Serves pages with the client runtime injected, modules through the
//! transform cache, raw files from the project, and the update stream as
//! Server-Sent Events.

use super::error_overlay::generate_error_overlay;
use super::html::inject_client;
use super::pipeline::{CLIENT_PATH, SCRIPT_EXTENSIONS};
use super::state::SharedState;
use axum::{
    Router,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, Uri, header},
    response::{
        IntoResponse, Response, Sse,
        sse::{Event, KeepAlive},
    },
    routing::get,
};
use hotbed_core::ClientId;
use hotbed_core::url::{clean_url, is_import_request};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};
use tower_http::cors::{Any, CorsLayer};

/// Path answered with `200` while the server is up.
pub const PING_PATH: &str = "/__hotbed_ping__";

const JS_CONTENT_TYPE: &str = "application/javascript; charset=utf-8";
const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Build the axum router with all routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route(&state.config.hmr_path, get(handle_hmr))
        .route(CLIENT_PATH, get(handle_client_script))
        .route(PING_PATH, get(handle_ping))
        .fallback(handle_request)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Removes the client from the broadcaster when its stream is dropped.
struct ClientGuard {
    state: SharedState,
    id: ClientId,
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        self.state.server.disconnect_client(self.id);
    }
}

async fn handle_hmr(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (id, rx) = state.server.connect_client();
    tracing::debug!(client = id, "update stream opened");

    let guard = ClientGuard { state, id };
    let stream = ReceiverStream::new(rx).map(move |data| {
        let _connection = &guard;
        Ok(Event::default().data(data))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

async fn handle_client_script(State(state): State<SharedState>) -> Response {
    ok(JS_CONTENT_TYPE, state.client_script())
}

async fn handle_ping() -> StatusCode {
    StatusCode::OK
}

/// Pages, modules and raw files.
async fn handle_request(
    State(state): State<SharedState>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let url = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let path = clean_url(url);

    // Covers `/@fs/` urls and `..` segments alike, before any dispatch.
    let file = state.server.resolver().url_to_file(path);
    if !state.allows_file(&file) {
        return forbidden(path);
    }

    if path == "/" || path.ends_with('/') || path.ends_with(".html") {
        serve_page(&state, path, &headers).await
    } else if is_module_request(url) {
        serve_module(&state, url, &headers).await
    } else {
        serve_file(&state, path).await
    }
}

/// Scripts and anything imported from a script go through the pipeline.
fn is_module_request(url: &str) -> bool {
    if is_import_request(url) {
        return true;
    }
    let ext = Path::new(clean_url(url))
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    SCRIPT_EXTENSIONS.contains(&ext)
}

async fn serve_page(state: &SharedState, path: &str, headers: &HeaderMap) -> Response {
    let file = page_file(state, path);
    match tokio::fs::read_to_string(&file).await {
        Ok(html) => ok(HTML_CONTENT_TYPE, inject_client(&html)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => not_found(path),
        Err(err) => error_response(headers, path, &format!("{}: {}", file.display(), err)),
    }
}

fn page_file(state: &SharedState, path: &str) -> PathBuf {
    let file = state.server.resolver().url_to_file(path);
    if path.ends_with('/') {
        file.join("index.html")
    } else {
        file
    }
}

async fn serve_module(state: &SharedState, url: &str, headers: &HeaderMap) -> Response {
    match state.server.transform_request(url).await {
        Ok(result) => ok(JS_CONTENT_TYPE, result.code_with_inline_map()),
        Err(err) if err.is_not_found() => not_found(clean_url(url)),
        Err(err) => {
            crate::ui::error(&err.to_string());
            error_response(headers, url, &err.to_string())
        }
    }
}

async fn serve_file(state: &SharedState, path: &str) -> Response {
    let file = state.server.resolver().url_to_file(path);
    match tokio::fs::read(&file).await {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, HeaderValue::from_static(determine_content_type(path))),
                (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            ],
            bytes,
        )
            .into_response(),
        Err(_) => not_found(path),
    }
}

fn ok(content_type: &'static str, body: String) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        ],
        body,
    )
        .into_response()
}

fn text(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_CONTENT_TYPE))],
        body,
    )
        .into_response()
}

fn forbidden(path: &str) -> Response {
    text(StatusCode::FORBIDDEN, format!("{path} is outside the workspace"))
}

fn not_found(path: &str) -> Response {
    text(StatusCode::NOT_FOUND, format!("File not found: {path}"))
}

/// The overlay for a browser navigating to the url, plain text for
/// module loads.
fn error_response(headers: &HeaderMap, url: &str, message: &str) -> Response {
    if accepts_html(headers) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE))],
            generate_error_overlay(url, message),
        )
            .into_response()
    } else {
        text(StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
    }
}

fn accepts_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

/// Determine content type from file extension.
fn determine_content_type(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension {
        "wasm" => "application/wasm",
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "html" => HTML_CONTENT_TYPE,
        "css" => "text/css",
        "txt" => TEXT_CONTENT_TYPE,
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "svg" => "image/svg+xml",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_requests() {
        assert!(is_module_request("/src/main.ts"));
        assert!(is_module_request("/src/App.tsx?t=123"));
        assert!(is_module_request("/src/style.css?import"));
        assert!(is_module_request("/data.json?import"));
        assert!(!is_module_request("/src/style.css"));
        assert!(!is_module_request("/logo.svg"));
    }

    #[test]
    fn test_content_types() {
        assert_eq!(determine_content_type("/a.css"), "text/css");
        assert_eq!(determine_content_type("/img/logo.svg"), "image/svg+xml");
        assert_eq!(determine_content_type("/blob"), "application/octet-stream");
    }

    #[test]
    fn test_accepts_html() {
        let mut headers = HeaderMap::new();
        assert!(!accepts_html(&headers));
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml"),
        );
        assert!(accepts_html(&headers));
    }
}
