//! File-based config discovery.
//!
//! Finds the project's configuration file and reads it into a JSON value
//! that the loader layers over the defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::{ConfigError, Result};

pub const CONFIG_FILE: &str = "hotbed.toml";
pub const PACKAGE_JSON_FIELD: &str = "hotbed";

/// Where a project's configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Toml(PathBuf),
    /// The `"hotbed"` field of a `package.json`.
    PackageJson(PathBuf),
}

impl ConfigSource {
    pub fn path(&self) -> &Path {
        match self {
            ConfigSource::Toml(path) | ConfigSource::PackageJson(path) => path,
        }
    }
}

/// Searches a project root for its configuration.
///
/// # Example
///
/// ```no_run
/// use hotbed_config::ConfigDiscovery;
///
/// let discovery = ConfigDiscovery::new(".");
/// if let Some(source) = discovery.find() {
///     let value = discovery.load(&source).unwrap();
///     println!("{value}");
/// }
/// ```
pub struct ConfigDiscovery {
    root: PathBuf,
}

impl ConfigDiscovery {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Find a config file in the root directory
    ///
    /// Searches in this order:
    /// 1. hotbed.toml
    /// 2. package.json (hotbed field)
    pub fn find(&self) -> Option<ConfigSource> {
        let toml_path = self.root.join(CONFIG_FILE);
        if toml_path.is_file() {
            return Some(ConfigSource::Toml(toml_path));
        }

        let pkg_path = self.root.join("package.json");
        if let Ok(content) = fs::read_to_string(&pkg_path) {
            if let Ok(parsed) = serde_json::from_str::<Value>(&content) {
                if parsed.get(PACKAGE_JSON_FIELD).is_some_and(|v| !v.is_null()) {
                    return Some(ConfigSource::PackageJson(pkg_path));
                }
            }
        }

        None
    }

    /// Read a discovered source into a JSON object.
    pub fn load(&self, source: &ConfigSource) -> Result<Value> {
        debug!(path = %source.path().display(), "loading configuration");
        match source {
            ConfigSource::Toml(path) => load_toml(path),
            ConfigSource::PackageJson(path) => load_package_json(path),
        }
    }

    /// Find and read the configuration, if there is any.
    pub fn discover(&self) -> Result<Option<(ConfigSource, Value)>> {
        match self.find() {
            Some(source) => {
                let value = self.load(&source)?;
                Ok(Some((source, value)))
            }
            None => Ok(None),
        }
    }
}

fn load_toml(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)?;

    let toml_val: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::InvalidValue {
        field: CONFIG_FILE.to_string(),
        hint: Some(format!("Invalid TOML syntax: {}", e)),
    })?;

    let value = serde_json::to_value(toml_val).map_err(|e| ConfigError::InvalidValue {
        field: CONFIG_FILE.to_string(),
        hint: Some(format!("TOML to JSON conversion failed: {}", e)),
    })?;
    require_table(value, CONFIG_FILE)
}

fn load_package_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)?;

    let mut parsed: Value =
        serde_json::from_str(&content).map_err(|e| ConfigError::InvalidValue {
            field: "package.json".to_string(),
            hint: Some(format!("Invalid JSON: {}", e)),
        })?;

    let value = parsed
        .get_mut(PACKAGE_JSON_FIELD)
        .map(Value::take)
        .filter(|v| !v.is_null())
        .ok_or_else(|| ConfigError::InvalidValue {
            field: PACKAGE_JSON_FIELD.to_string(),
            hint: Some("Add a 'hotbed' field to your package.json".to_string()),
        })?;
    require_table(value, PACKAGE_JSON_FIELD)
}

fn require_table(value: Value, field: &str) -> Result<Value> {
    if value.is_object() {
        Ok(value)
    } else {
        Err(ConfigError::UnsupportedFormat(format!(
            "{field} must be a table of settings"
        )))
    }
}
