//! # hotbed-core
//!
//! The engine behind the hotbed dev server: it resolves import specifiers,
//! caches and coalesces module transforms, tracks the import graph, turns
//! file-system changes into hot-update instructions, fans those out to
//! connected browsers, and loads modules for server-side rendering.
//!
//! ## Architecture
//!
//! ```text
//!            file event                          request (url)
//!                │                                     │
//!                ▼                                     ▼
//!    ┌──────────────────────┐              ┌──────────────────────┐
//!    │  InvalidationEngine  │              │   TransformCache     │
//!    │  (boundaries, BFS)   │              │ (coalesce per url)   │
//!    └─────────┬────────────┘              └─────────┬────────────┘
//!              │                                     │
//!              │         ┌──────────────────┐        │
//!              └────────▶│   ModuleGraph    │◀───────┘
//!                        │ (url/file nodes, │◀──── SsrLoader
//!                        │  mirrored edges) │
//!                        └──────────────────┘
//!              │
//!              ▼
//!    ┌──────────────────────┐
//!    │     Broadcaster      │───▶ connected clients
//!    └──────────────────────┘
//! ```
//!
//! [`ModuleServer`] ties the pieces together and owns all per-process state.
//! Nothing in this crate lives in a global.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hotbed_core::{ModuleServer, FileEvent};
//!
//! let server = ModuleServer::builder("/project")
//!     .pipeline(MyPipeline)
//!     .build()?;
//!
//! let result = server.transform_request("/src/main.ts").await?;
//! let decision = server.handle_file_event(&FileEvent::changed("/project/src/main.ts"));
//! ```

pub mod cache;
pub mod error;
pub mod graph;
pub mod hmr;
pub mod resolver;
pub mod runtime;
pub mod server;
pub mod ssr;
pub mod transform;
pub mod url;

pub use cache::TransformCache;
pub use error::{Error, Result};
pub use graph::{ModuleGraph, ModuleInfo};
pub use hmr::{
    BoundaryKind, BoundaryPolicy, Broadcaster, ClientId, DefaultBoundaryPolicy, DeliveryFailure,
    FileEvent, FileEventKind, InvalidationEngine, PublishReport, UpdateDecision, UpdatePayload,
};
pub use resolver::{Resolved, Resolver, ResolverPlugin};
pub use runtime::memory::MemoryRuntime;
pub use runtime::native::NativeRuntime;
pub use runtime::{FileMetadata, Runtime, RuntimeError, RuntimeResult};
pub use server::{ModuleServer, ModuleServerBuilder};
pub use ssr::{
    EvalFailure, EvalScope, ForeignModule, HostModules, ImportMeta, ImportedModule,
    ModuleEvaluator, SsrLoader, SsrModule, StaticHost,
};
pub use transform::{
    ResolvedImport, TransformContext, TransformOutput, TransformPipeline, TransformResult,
};
