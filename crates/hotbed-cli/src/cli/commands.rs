use clap::{Args, Subcommand};
use hotbed_config::DevOverrides;
use std::path::PathBuf;

/// Available hotbed subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the development server
    ///
    /// Serves the project root, transforming modules on request and pushing
    /// hot updates to connected pages when files change.
    Dev(DevArgs),
}

/// Arguments for the dev command
#[derive(Args, Debug, Clone)]
pub struct DevArgs {
    /// Project root to serve
    #[arg(value_name = "ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Port for the development server
    ///
    /// The next free port is used when this one is taken.
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Host address to bind
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Open the browser once the server is ready
    #[arg(long)]
    pub open: bool,

    /// Milliseconds to wait for file changes to settle
    #[arg(long, value_name = "MS")]
    pub debounce: Option<u64>,
}

impl DevArgs {
    /// Flags that were given, as the top configuration layer.
    pub fn overrides(&self) -> DevOverrides {
        DevOverrides {
            host: self.host.clone(),
            port: self.port,
            // An absent flag must not override `open = true` from a file.
            open: self.open.then_some(true),
            debounce_ms: self.debounce,
        }
    }
}
