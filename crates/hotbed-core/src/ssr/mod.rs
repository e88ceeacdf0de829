//! Server-side module loading.

mod eval;
mod host;
mod loader;
mod module;
mod stacktrace;

pub use eval::{EvalFailure, EvalScope, ImportFuture, ImportMeta, ModuleEvaluator};
pub use host::{HostModules, StaticHost};
pub use loader::SsrLoader;
pub use module::{Exports, ForeignModule, ImportedModule, SsrModule};
pub use stacktrace::rewrite_stacktrace;
