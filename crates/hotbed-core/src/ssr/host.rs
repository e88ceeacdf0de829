//! Host-provided (foreign) modules.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;

use super::module::ForeignModule;
use crate::error::{Error, Result};

/// The host runtime's own module system, used for bare specifiers the dev
/// server does not transform.
pub trait HostModules: Send + Sync {
    fn require(&self, specifier: &str, importer: &Path) -> Result<Arc<ForeignModule>>;
}

/// A fixed registry of foreign modules.
#[derive(Debug, Default)]
pub struct StaticHost {
    modules: RwLock<FxHashMap<String, Arc<ForeignModule>>>,
}

impl StaticHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, module: ForeignModule) {
        self.modules
            .write()
            .insert(module.specifier().to_string(), Arc::new(module));
    }

    pub fn with_module(self, module: ForeignModule) -> Self {
        self.register(module);
        self
    }
}

impl HostModules for StaticHost {
    fn require(&self, specifier: &str, importer: &Path) -> Result<Arc<ForeignModule>> {
        self.modules
            .read()
            .get(specifier)
            .cloned()
            .ok_or_else(|| Error::Foreign {
                specifier: specifier.to_string(),
                message: format!("not provided by the host (imported by {})", importer.display()),
            })
    }
}
