//! Turning file changes into update decisions.

use rustc_hash::FxHashSet;
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use super::boundary::{BoundaryKind, BoundaryPolicy};
use super::payload::UpdatePayload;
use crate::graph::ModuleGraph;
use crate::url::{is_css_request, is_html_request, style_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    Changed,
    Added,
    Removed,
}

/// A debounced file-system notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub path: PathBuf,
    pub kind: FileEventKind,
}

impl FileEvent {
    pub fn changed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: FileEventKind::Changed,
        }
    }

    pub fn added(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: FileEventKind::Added,
        }
    }

    pub fn removed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: FileEventKind::Removed,
        }
    }
}

/// What connected clients should do about a file event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateDecision {
    /// No module uses the file.
    Unused,
    FullReload { path: String },
    /// Sorted, deduplicated.
    Updates(Vec<UpdatePayload>),
}

impl UpdateDecision {
    /// Payloads to broadcast, in order.
    pub fn payloads(&self) -> Vec<UpdatePayload> {
        match self {
            UpdateDecision::Unused => Vec::new(),
            UpdateDecision::FullReload { path } => vec![UpdatePayload::FullReload {
                path: Some(path.clone()),
            }],
            UpdateDecision::Updates(updates) => updates.clone(),
        }
    }
}

enum Propagation {
    Boundaries(BTreeMap<String, BoundaryKind>),
    /// An entry module was reached without passing a boundary.
    DeadEnd,
}

/// Strictly increasing millisecond clock.
#[derive(Debug, Default)]
struct HmrClock {
    last: AtomicU64,
}

impl HmrClock {
    fn next(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, candidate, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Invalidates affected modules and finds the boundaries that absorb a
/// change.
pub struct InvalidationEngine {
    graph: ModuleGraph,
    policy: Arc<dyn BoundaryPolicy>,
    clock: HmrClock,
}

impl InvalidationEngine {
    pub fn new(graph: ModuleGraph, policy: Arc<dyn BoundaryPolicy>) -> Self {
        Self {
            graph,
            policy,
            clock: HmrClock::default(),
        }
    }

    /// Apply `event` to the graph and decide how clients should react.
    ///
    /// Every url backed by the file is invalidated with one shared timestamp.
    /// Cached server modules of everything that transitively imports those
    /// urls are dropped too, since their evaluated exports captured the old
    /// code. The result depends only on graph state, never on traversal or
    /// hash-map order.
    pub fn handle_event(&self, event: &FileEvent) -> UpdateDecision {
        let urls = self.graph.urls_for_file(&event.path);
        let shown = display_path(&event.path);

        if urls.is_empty() {
            if is_html_request(&shown) && event.kind != FileEventKind::Added {
                info!("{} changed, reloading page", shown);
                return UpdateDecision::FullReload { path: shown };
            }
            debug!("{} has changed, but it is not currently in use", shown);
            return UpdateDecision::Unused;
        }

        let timestamp = self.clock.next();
        for url in &urls {
            self.graph.invalidate(url, timestamp);
        }
        for url in &urls {
            for importer in self.graph.transitive_importers(url) {
                self.graph.invalidate_importer(&importer, timestamp);
            }
        }

        if event.kind == FileEventKind::Removed && urls.iter().all(|url| is_css_request(url)) {
            return style_removal(&urls);
        }

        let mut updates: Vec<UpdatePayload> = Vec::new();
        for url in &urls {
            match self.propagate(url) {
                Propagation::DeadEnd => {
                    info!(url = %url, "no boundary accepts the change, reloading page");
                    return UpdateDecision::FullReload { path: url.clone() };
                }
                Propagation::Boundaries(boundaries) => {
                    for (boundary, kind) in boundaries {
                        updates.push(payload_for(boundary, kind, url, timestamp));
                    }
                }
            }
        }

        if updates.is_empty() {
            // Only cycles were reached; nothing can apply the change in place.
            return UpdateDecision::FullReload {
                path: urls[0].clone(),
            };
        }

        updates.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        updates.dedup();
        for update in &updates {
            info!("hmr {} {}", update.kind(), update.sort_key().0);
        }
        UpdateDecision::Updates(updates)
    }

    /// Breadth-first walk over importers, visiting each node once. Importers
    /// are taken in sorted order.
    fn propagate(&self, url: &str) -> Propagation {
        let mut boundaries = BTreeMap::new();
        let mut visited: FxHashSet<String> = FxHashSet::default();
        let mut queue: VecDeque<String> = VecDeque::from([url.to_string()]);

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            let Some(module) = self.graph.node(&current) else {
                continue;
            };

            if let Some(kind) = self.policy.classify(&module) {
                boundaries.insert(current, kind);
                continue;
            }
            if module.importers.is_empty() {
                return Propagation::DeadEnd;
            }
            queue.extend(
                module
                    .importers
                    .into_iter()
                    .filter(|importer| !visited.contains(importer)),
            );
        }
        Propagation::Boundaries(boundaries)
    }
}

fn style_removal(urls: &[String]) -> UpdateDecision {
    let mut removals: Vec<UpdatePayload> = urls
        .iter()
        .map(|url| UpdatePayload::StyleRemove { id: style_id(url) })
        .collect();
    removals.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    removals.dedup();
    UpdateDecision::Updates(removals)
}

fn payload_for(boundary: String, kind: BoundaryKind, changed: &str, timestamp: u64) -> UpdatePayload {
    match kind {
        BoundaryKind::Style => UpdatePayload::StyleUpdate {
            id: style_id(&boundary),
            url: boundary,
            timestamp,
        },
        BoundaryKind::SelfAccepting => UpdatePayload::Update {
            url: boundary,
            timestamp,
            accepted_path: changed.to_string(),
        },
    }
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
