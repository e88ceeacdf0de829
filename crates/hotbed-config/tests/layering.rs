//! Precedence between defaults, config files, environment and CLI.

use hotbed_config::{ConfigError, DevOverrides, load_dev_config};
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

struct EnvGuard(&'static [&'static str]);

impl EnvGuard {
    fn set(vars: &'static [(&'static str, &'static str)], keys: &'static [&'static str]) -> Self {
        for (key, value) in vars {
            unsafe { std::env::set_var(key, value) };
        }
        EnvGuard(keys)
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in self.0 {
            unsafe { std::env::remove_var(key) };
        }
    }
}

#[test]
#[serial]
fn defaults_apply_without_config() {
    let dir = TempDir::new().unwrap();
    let config = load_dev_config(dir.path(), &DevOverrides::default()).unwrap();

    assert_eq!(config.port, 3000);
    assert_eq!(config.hmr_path, "/__hotbed_hmr__");
    assert_eq!(config.root, dir.path().canonicalize().unwrap());
}

#[test]
#[serial]
fn config_file_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("hotbed.toml"),
        "port = 4000\nwatch_ignore = [\"vendor\"]\n",
    )
    .unwrap();

    let config = load_dev_config(dir.path(), &DevOverrides::default()).unwrap();
    assert_eq!(config.port, 4000);
    assert_eq!(config.watch_ignore, vec!["vendor".to_string()]);
    assert_eq!(config.host, "127.0.0.1");
}

#[test]
#[serial]
fn environment_overrides_config_file() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("package.json"),
        r#"{"hotbed":{"port":4000,"debounce_ms":50}}"#,
    )
    .unwrap();
    let _env = EnvGuard::set(&[("HOTBED_PORT", "4100")], &["HOTBED_PORT"]);

    let config = load_dev_config(dir.path(), &DevOverrides::default()).unwrap();
    assert_eq!(config.port, 4100);
    assert_eq!(config.debounce_ms, 50);
}

#[test]
#[serial]
fn cli_overrides_everything() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("hotbed.toml"), "port = 4000\nopen = false\n").unwrap();
    let _env = EnvGuard::set(&[("HOTBED_PORT", "4100")], &["HOTBED_PORT"]);

    let overrides = DevOverrides {
        port: Some(4200),
        open: Some(true),
        ..DevOverrides::default()
    };
    let config = load_dev_config(dir.path(), &overrides).unwrap();
    assert_eq!(config.port, 4200);
    assert!(config.open);
}

#[test]
#[serial]
fn underscored_fields_come_from_environment() {
    let dir = TempDir::new().unwrap();
    let _env = EnvGuard::set(
        &[("HOTBED_HMR_PATH", "/__updates"), ("HOTBED_CLIENT_BUFFER", "8")],
        &["HOTBED_HMR_PATH", "HOTBED_CLIENT_BUFFER"],
    );

    let config = load_dev_config(dir.path(), &DevOverrides::default()).unwrap();
    assert_eq!(config.hmr_path, "/__updates");
    assert_eq!(config.client_buffer, 8);
}

#[test]
#[serial]
fn wrong_type_is_an_invalid_value() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("hotbed.toml"), "port = \"soon\"\n").unwrap();

    let err = load_dev_config(dir.path(), &DevOverrides::default()).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { .. }));
    assert!(err.hint().is_some());
}

#[test]
#[serial]
fn relative_root_setting_is_resolved_against_project() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("web")).unwrap();
    fs::write(dir.path().join("hotbed.toml"), "root = \"web\"\n").unwrap();

    let config = load_dev_config(dir.path(), &DevOverrides::default()).unwrap();
    assert_eq!(config.root, dir.path().join("web").canonicalize().unwrap());
}

#[test]
#[serial]
fn missing_root_is_reported() {
    let dir = TempDir::new().unwrap();
    let err = load_dev_config(&dir.path().join("nope"), &DevOverrides::default()).unwrap_err();
    assert!(matches!(err, ConfigError::RootNotFound(_)));
}
