//! Error types for hotbed-core.
//!
//! Every variant is `Clone`: a failed transform or load is handed to all
//! callers that were coalesced onto the same in-flight computation.

use std::path::PathBuf;

use crate::runtime::RuntimeError;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced by the module server.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A relative or absolute specifier did not map to any file.
    #[error("Failed to resolve import \"{specifier}\" from \"{}\". Does the file exist?", importer.display())]
    Resolution { specifier: String, importer: PathBuf },

    /// The transform pipeline failed for a module.
    #[error("Transform failed for {url}: {message}")]
    Transform { url: String, message: String },

    /// A server-side module threw while being evaluated.
    #[error("Error when evaluating SSR module {url}: {message}")]
    Evaluation {
        url: String,
        message: String,
        /// Stack with positions mapped back to original sources.
        stack: String,
    },

    /// The host runtime could not provide a foreign module.
    #[error("Cannot load module \"{specifier}\": {message}")]
    Foreign { specifier: String, message: String },

    /// No file backs the requested url.
    #[error("No module found for url {0}")]
    UrlNotFound(String),

    /// The server was assembled with missing or conflicting parts.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Platform I/O failure.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl Error {
    /// The url this error concerns, when it has one.
    pub fn url(&self) -> Option<&str> {
        match self {
            Error::Transform { url, .. } | Error::Evaluation { url, .. } => Some(url),
            Error::UrlNotFound(url) => Some(url),
            _ => None,
        }
    }

    /// Whether the error should be answered with a 404 rather than a 500.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::UrlNotFound(_) | Error::Runtime(RuntimeError::FileNotFound(_))
        )
    }
}
