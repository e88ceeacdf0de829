//! Development server configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Number of consecutive ports tried when the configured one is taken.
pub const PORT_ATTEMPTS: u16 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevConfig {
    /// Project root; every module url is relative to it.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    #[serde(default = "default_host")]
    pub host: String,

    /// First port to try. The server moves to the next free port, up to
    /// [`PORT_ATTEMPTS`] in total.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path of the update event stream.
    #[serde(default = "default_hmr_path")]
    pub hmr_path: String,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Path components whose changes are never reported.
    #[serde(default = "default_watch_ignore")]
    pub watch_ignore: Vec<String>,

    /// Extensions probed, in order, for extensionless imports.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Messages queued per client before it is dropped as too slow.
    #[serde(default = "default_client_buffer")]
    pub client_buffer: usize,

    /// How often a disconnected client polls before reloading.
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_open")]
    pub open: bool,

    /// Parent directories searched for the workspace root.
    #[serde(default = "default_workspace_root_depth")]
    pub workspace_root_depth: usize,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            host: default_host(),
            port: default_port(),
            hmr_path: default_hmr_path(),
            debounce_ms: default_debounce_ms(),
            watch_ignore: default_watch_ignore(),
            extensions: default_extensions(),
            client_buffer: default_client_buffer(),
            ping_interval_ms: default_ping_interval_ms(),
            open: default_open(),
            workspace_root_depth: default_workspace_root_depth(),
        }
    }
}

impl DevConfig {
    /// Reject values the server cannot start with.
    pub fn validate(&self) -> Result<()> {
        if !self.hmr_path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "hmr_path".to_string(),
                hint: Some(format!(
                    "'{}' must start with '/', e.g. /__hotbed_hmr__",
                    self.hmr_path
                )),
            });
        }
        if self.client_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                field: "client_buffer".to_string(),
                hint: Some("Each client needs room for at least one message".to_string()),
            });
        }
        if self.ping_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ping_interval_ms".to_string(),
                hint: Some("Use a positive interval in milliseconds".to_string()),
            });
        }
        if let Some(bad) = self.extensions.iter().find(|ext| !ext.starts_with('.')) {
            return Err(ConfigError::InvalidValue {
                field: "extensions".to_string(),
                hint: Some(format!("'{bad}' should be written with a leading dot")),
            });
        }
        Ok(())
    }

    /// `host:port` for the first bind attempt.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Values given on the command line. Unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DevOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    3000
}

fn default_hmr_path() -> String {
    "/__hotbed_hmr__".into()
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_watch_ignore() -> Vec<String> {
    ["node_modules", ".git", "dist", "target"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_extensions() -> Vec<String> {
    [".mjs", ".js", ".ts", ".jsx", ".tsx", ".json"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_client_buffer() -> usize {
    64
}

fn default_ping_interval_ms() -> u64 {
    1000
}

fn default_open() -> bool {
    false
}

fn default_workspace_root_depth() -> usize {
    30
}
