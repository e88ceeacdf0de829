//! Development server: HTTP routes, file watching and the built-in
//! transform pipeline.

pub mod config;
pub mod error_overlay;
pub mod html;
pub mod pipeline;
pub mod server;
pub mod state;
pub mod watcher;

pub use config::find_available_port;
pub use pipeline::{BuiltinPipeline, CLIENT_PATH};
pub use server::{PING_PATH, build_router};
pub use state::{DevState, SharedState};
pub use watcher::FileWatcher;
