//! Command implementations for the hotbed CLI.
//!
//! Each command lives in its own module and exposes an `execute` function
//! taking the parsed arguments.

pub mod dev;

pub use dev::execute as dev_execute;
