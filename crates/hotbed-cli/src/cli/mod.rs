//! Command-line interface definition.
//!
//! - `hotbed dev [ROOT]` - serve a project with on-demand transforms and hot updates

mod commands;

use clap::Parser;

pub use commands::{Command, DevArgs};

/// hotbed - a dev server that transforms ES modules on request
#[derive(Parser, Debug)]
#[command(
    name = "hotbed",
    version,
    about = "A dev server that transforms ES modules on request",
    long_about = "hotbed serves a project's source files as native ES modules, transforming\n\
                  each one the first time the browser asks for it, and pushes hot updates\n\
                  to connected pages when files change."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
