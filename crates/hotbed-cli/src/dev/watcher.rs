//! File system watcher with debouncing for the dev server.
//!
//! Watches the project root recursively and turns notify events into
//! [`FileEvent`]s for the invalidation engine, skipping ignored directories
//! and hidden files.

use crate::error::{CliError, Result};
use hotbed_core::FileEvent;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

const CHANNEL_CAPACITY: usize = 256;

/// Recursive watcher; dropping it stops the notifications.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Start watching `root`. Must be called inside a tokio runtime.
    ///
    /// Events for one path are held until that path has been quiet for
    /// `debounce_ms`; only the last one is delivered, so a truncate followed
    /// by a write arrives as a single event after the write.
    pub fn new(
        root: PathBuf,
        ignore: Vec<String>,
        debounce_ms: u64,
    ) -> Result<(Self, mpsc::Receiver<FileEvent>)> {
        if !root.exists() {
            return Err(CliError::FileNotFound(root));
        }

        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let watch_root = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!("file watcher error: {err}");
                    return;
                }
            };

            for path in &event.paths {
                if should_ignore(path, &watch_root, &ignore) {
                    continue;
                }
                if let Some(change) = to_file_event(&event.kind, path) {
                    // The debouncer is gone once the server shuts down.
                    if raw_tx.send(change).is_err() {
                        return;
                    }
                }
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        tokio::spawn(debounce(raw_rx, tx, Duration::from_millis(debounce_ms)));
        tracing::debug!(root = %root.display(), debounce_ms, "watching for changes");

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Trailing-edge debounce per path. Runs until the watcher side closes,
/// then flushes whatever is still held.
async fn debounce(
    mut raw: mpsc::UnboundedReceiver<FileEvent>,
    tx: mpsc::Sender<FileEvent>,
    window: Duration,
) {
    let mut held: FxHashMap<PathBuf, (FileEvent, Instant)> = FxHashMap::default();

    loop {
        let next_due = held.values().map(|(_, due)| *due).min();
        let sleep = async {
            match next_due {
                Some(due) => tokio::time::sleep_until(due).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            event = raw.recv() => match event {
                Some(event) => {
                    let due = Instant::now() + window;
                    held.insert(event.path.clone(), (event, due));
                }
                None => break,
            },
            () = sleep => {
                let now = Instant::now();
                let mut ready: Vec<FileEvent> = Vec::new();
                held.retain(|_, (event, due)| {
                    if *due <= now {
                        ready.push(event.clone());
                        false
                    } else {
                        true
                    }
                });
                ready.sort_by(|a, b| a.path.cmp(&b.path));
                for event in ready {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    let mut rest: Vec<FileEvent> = held.into_values().map(|(event, _)| event).collect();
    rest.sort_by(|a, b| a.path.cmp(&b.path));
    for event in rest {
        if tx.send(event).await.is_err() {
            return;
        }
    }
}

fn to_file_event(kind: &EventKind, path: &Path) -> Option<FileEvent> {
    match kind {
        EventKind::Create(_) => Some(FileEvent::added(path)),
        EventKind::Modify(_) => Some(FileEvent::changed(path)),
        EventKind::Remove(_) => Some(FileEvent::removed(path)),
        _ => None,
    }
}

/// Paths outside `root`, inside an ignored directory, or hidden.
pub(crate) fn should_ignore(path: &Path, root: &Path, ignore: &[String]) -> bool {
    let Ok(rel) = path.strip_prefix(root) else {
        return true;
    };

    rel.components().any(|component| {
        let Some(name) = component.as_os_str().to_str() else {
            return false;
        };
        (name.starts_with('.') && name != "." && name != "..")
            || ignore.iter().any(|pattern| pattern == name)
    })
}
