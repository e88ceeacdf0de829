//! Miette diagnostic conversion for CLI errors.

use crate::error::CliError;
use miette::Report;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Config(e) => match e.hint() {
            Some(hint) => miette::miette!(help = hint.to_string(), "Configuration error: {}", e),
            None => miette::miette!("Configuration error: {}", e),
        },
        CliError::Core(e) => core_error_to_miette(e),
        _ => miette::miette!("{}", err),
    }
}

fn core_error_to_miette(err: hotbed_core::Error) -> Report {
    match err {
        hotbed_core::Error::Resolution { specifier, importer } => miette::miette!(
            help = "Check the import path and that the file exists",
            "Failed to resolve import '{}' from {}",
            specifier,
            importer.display()
        ),
        hotbed_core::Error::Evaluation {
            url,
            message,
            stack,
        } => miette::miette!("Error evaluating {}: {}\n{}", url, message, stack),
        other => miette::miette!("{}", other),
    }
}
