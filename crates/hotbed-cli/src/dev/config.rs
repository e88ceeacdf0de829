//! Binding the dev server socket.

use crate::error::Result;
use hotbed_config::ConfigError;
use hotbed_config::dev::PORT_ATTEMPTS;
use std::net::TcpListener;

/// Bind `host:port`, moving up one port at a time when it is taken.
///
/// The bound listener is returned so nothing can grab the port between the
/// probe and the server start.
pub fn find_available_port(host: &str, port: u16) -> Result<TcpListener> {
    if port != 0 && port < 1024 {
        crate::ui::warning(&format!(
            "Port {} is in privileged range, may require root access",
            port
        ));
    }

    for offset in 0..PORT_ATTEMPTS {
        let Some(candidate) = port.checked_add(offset) else {
            break;
        };
        match TcpListener::bind((host, candidate)) {
            Ok(listener) => {
                if offset > 0 {
                    crate::ui::warning(&format!(
                        "Port {} is busy, using port {} instead",
                        port, candidate
                    ));
                }
                return Ok(listener);
            }
            Err(err) => tracing::debug!(port = candidate, "bind failed: {err}"),
        }
    }

    Err(ConfigError::InvalidValue {
        field: "port".to_string(),
        hint: Some(format!(
            "Ports {}-{} are all in use. Try a different port with --port.",
            port,
            port.saturating_add(PORT_ATTEMPTS - 1)
        )),
    }
    .into())
}
