//! hotbed CLI: an on-demand ES module dev server with hot updates.
//!
//! # Architecture
//!
//! - [`cli`] - Argument parsing with clap
//! - [`commands`] - Command implementations (`hotbed dev`)
//! - [`dev`] - HTTP server, file watcher and the built-in transform pipeline
//! - [`error`] - CLI error type and miette rendering
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - Colored status output for humans
//!
//! The module graph, transform cache and update logic live in
//! `hotbed-core`; configuration loading lives in `hotbed-config`.
//!
//! # Example
//!
//! ```rust,no_run
//! use hotbed_cli::{error::Result, logger};
//!
//! fn main() -> Result<()> {
//!     logger::init_logger(false, false, false);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result, ResultExt};
