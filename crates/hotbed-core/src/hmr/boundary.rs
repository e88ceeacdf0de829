//! Deciding which modules stop update propagation.

use crate::graph::ModuleInfo;
use crate::url::{is_css_module, is_css_request};

/// How a boundary applies an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BoundaryKind {
    /// A script that replaces itself when it or a dependency changes.
    SelfAccepting,
    /// A stylesheet, swapped in place by the client.
    Style,
}

/// Classifies graph nodes as update boundaries.
pub trait BoundaryPolicy: Send + Sync {
    /// `None` means the change keeps propagating to `module`'s importers.
    fn classify(&self, module: &ModuleInfo) -> Option<BoundaryKind>;
}

/// Plain stylesheets are style boundaries. Scripts are boundaries when their
/// transform declared self-acceptance. CSS modules export class names to
/// JS, so they propagate like scripts.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBoundaryPolicy;

impl BoundaryPolicy for DefaultBoundaryPolicy {
    fn classify(&self, module: &ModuleInfo) -> Option<BoundaryKind> {
        if is_css_request(&module.url) && !is_css_module(&module.url) {
            Some(BoundaryKind::Style)
        } else if module.is_self_accepting {
            Some(BoundaryKind::SelfAccepting)
        } else {
            None
        }
    }
}
