//! Layered configuration loading.

use figment::{
    Figment,
    providers::{Env, Serialized},
};
use std::path::Path;
use tracing::debug;

use crate::dev::{DevConfig, DevOverrides};
use crate::discovery::ConfigDiscovery;
use crate::error::{ConfigError, Result};

pub const ENV_PREFIX: &str = "HOTBED_";

/// Load the dev server configuration for the project in `root`.
///
/// Priority: CLI overrides > environment variables > config file > defaults.
/// A relative `root` setting is taken relative to `root`; the returned root
/// is always absolute.
pub fn load_dev_config(root: &Path, overrides: &DevOverrides) -> Result<DevConfig> {
    let base = root
        .canonicalize()
        .map_err(|_| ConfigError::RootNotFound(root.to_path_buf()))?;

    let mut figment = Figment::new().merge(Serialized::defaults(DevConfig::default()));

    if let Some((source, value)) = ConfigDiscovery::new(&base).discover()? {
        debug!(path = %source.path().display(), "merging config file");
        figment = figment.merge(Serialized::defaults(value));
    }

    // HOTBED_PORT, HOTBED_HMR_PATH, ... map onto the field of the same name.
    figment = figment.merge(Env::prefixed(ENV_PREFIX));
    figment = figment.merge(Serialized::defaults(overrides));

    let mut config: DevConfig = figment.extract().map_err(|e| ConfigError::InvalidValue {
        field: "configuration".to_string(),
        hint: Some(format!(
            "{e}. Check hotbed.toml and HOTBED_* variables for field types"
        )),
    })?;

    let joined = base.join(&config.root);
    config.root = joined
        .canonicalize()
        .map_err(|_| ConfigError::RootNotFound(joined))?;
    config.validate()?;
    Ok(config)
}
