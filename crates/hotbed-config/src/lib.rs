//! Configuration for the hotbed dev server.
//!
//! Values are layered, lowest priority first:
//!
//! 1. built-in defaults ([`DevConfig::default`])
//! 2. `hotbed.toml`, or the `"hotbed"` field of `package.json`, in the project root
//! 3. `HOTBED_*` environment variables
//! 4. command-line overrides ([`DevOverrides`])

pub mod dev;
pub mod discovery;
pub mod error;
pub mod loading;
pub mod workspace;

pub use dev::{DevConfig, DevOverrides};
pub use discovery::{ConfigDiscovery, ConfigSource};
pub use error::{ConfigError, Result};
pub use loading::load_dev_config;
pub use workspace::search_for_workspace_root;
