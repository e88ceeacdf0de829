//! Shared state for the development server.

use super::pipeline::BuiltinPipeline;
use crate::error::Result;
use hotbed_config::DevConfig;
use hotbed_core::ModuleServer;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything the request handlers and the watcher loop share.
pub struct DevState {
    pub server: ModuleServer,
    pub config: DevConfig,
    /// Files under this directory may be served through `/@fs/` urls.
    pub workspace_root: PathBuf,
}

pub type SharedState = Arc<DevState>;

impl DevState {
    /// Assemble the module server for `config.root` with the built-in
    /// pipeline.
    pub fn new(config: DevConfig, workspace_root: PathBuf) -> Result<Self> {
        let server = ModuleServer::builder(config.root.clone())
            .pipeline(BuiltinPipeline::new())
            .extensions(config.extensions.clone())
            .client_buffer(config.client_buffer)
            .build()?;

        Ok(Self {
            server,
            config,
            workspace_root,
        })
    }

    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Whether `file` lies inside the project or its workspace.
    pub fn allows_file(&self, file: &Path) -> bool {
        file.starts_with(self.root()) || file.starts_with(&self.workspace_root)
    }

    /// The client runtime with this server's settings filled in.
    pub fn client_script(&self) -> String {
        const CLIENT_SCRIPT: &str = include_str!("../../assets/client.js");
        CLIENT_SCRIPT
            .replace(
                "__HOTBED_HMR_PATH__",
                &serde_json::Value::String(self.config.hmr_path.clone()).to_string(),
            )
            .replace(
                "__HOTBED_PING_INTERVAL__",
                &self.config.ping_interval_ms.to_string(),
            )
    }
}
