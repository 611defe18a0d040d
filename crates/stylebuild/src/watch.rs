//! Rebuild on change.
//!
//! Copyright (c) 2026 stylebuild contributors
//!
//! Watches the directories holding the entry points and every file a build
//! reported as a dependency, and rebuilds when one of those files changes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use indexmap::IndexSet;
use notify::RecursiveMode;
use notify_debouncer_mini::{DebouncedEvent, Debouncer, new_debouncer};
use tracing::{debug, info, warn};

use crate::bundler::{BuildResult, Bundler};
use crate::error::{PluginError, Result};

/// Default debounce duration for filesystem events (in milliseconds).
const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// Events emitted by the filesystem watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A watched file was created, written, or removed
    Changed(PathBuf),
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

/// Debounced watcher over an explicit set of files.
///
/// notify watches directories, so each file's parent is watched
/// non-recursively and events for other files in it are dropped.
pub struct FileWatcher {
    debouncer: Debouncer<notify::RecommendedWatcher>,
    watched_dirs: HashSet<PathBuf>,
    files: Arc<Mutex<HashSet<PathBuf>>>,
    event_rx: mpsc::Receiver<WatchEvent>,
}

impl FileWatcher {
    pub fn new(config: &WatchConfig) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::channel();
        let files: Arc<Mutex<HashSet<PathBuf>>> = Arc::default();
        let filter = files.clone();

        let debouncer = new_debouncer(
            Duration::from_millis(config.debounce_ms),
            move |res: std::result::Result<Vec<DebouncedEvent>, notify::Error>| match res {
                Ok(events) => {
                    let Ok(files) = filter.lock() else {
                        return;
                    };
                    for event in events {
                        if !files.contains(&event.path) {
                            continue;
                        }
                        debug!(path = %event.path.display(), "File change detected");
                        if event_tx.send(WatchEvent::Changed(event.path)).is_err() {
                            debug!("Event receiver dropped, stopping watcher");
                            break;
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Filesystem watch error");
                }
            },
        )
        .map_err(|e| PluginError::Watch(format!("failed to create filesystem watcher: {e}")))?;

        info!(debounce_ms = config.debounce_ms, "Started filesystem watcher");
        Ok(Self {
            debouncer,
            watched_dirs: HashSet::new(),
            files,
            event_rx,
        })
    }

    /// Replace the set of watched files.
    pub fn set_files<'a>(&mut self, paths: impl IntoIterator<Item = &'a Path>) -> Result<()> {
        let mut files = HashSet::new();
        let mut dirs = HashSet::new();
        for path in paths {
            // Events arrive with resolved paths (macOS /var -> /private/var).
            if let Ok(canonical) = path.canonicalize() {
                files.insert(canonical);
            }
            files.insert(path.to_path_buf());
            if let Some(dir) = path.parent().filter(|dir| dir.is_dir()) {
                dirs.insert(dir.to_path_buf());
            }
        }

        for dir in self.watched_dirs.difference(&dirs) {
            if let Err(e) = self.debouncer.watcher().unwatch(dir) {
                debug!(path = %dir.display(), error = %e, "Failed to unwatch directory");
            }
        }
        for dir in dirs.difference(&self.watched_dirs) {
            self.debouncer
                .watcher()
                .watch(dir, RecursiveMode::NonRecursive)
                .map_err(|e| {
                    PluginError::Watch(format!("failed to watch {}: {e}", dir.display()))
                })?;
        }
        self.watched_dirs = dirs;

        match self.files.lock() {
            Ok(mut current) => *current = files,
            Err(_) => return Err(PluginError::Watch("watch table is poisoned".to_string())),
        }
        Ok(())
    }

    /// Block until the next change. `None` once the watcher has stopped.
    pub fn recv(&self) -> Option<WatchEvent> {
        self.event_rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<WatchEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Discard queued events, returning how many there were.
    pub fn drain(&self) -> usize {
        self.event_rx.try_iter().count()
    }
}

/// Build, then rebuild after every change, until the watcher stops.
///
/// A failed build keeps the previous dependencies watched, since a broken
/// stylesheet reports fewer of them.
pub fn run<F>(bundler: &Bundler, config: &WatchConfig, mut on_build: F) -> Result<()>
where
    F: FnMut(&BuildResult),
{
    let mut watcher = FileWatcher::new(config)?;
    let mut watched: IndexSet<PathBuf> = IndexSet::new();

    loop {
        let result = bundler.build();
        on_build(&result);

        if result.succeeded() {
            watched = result.watch_files;
        } else {
            watched.extend(result.watch_files);
        }
        watcher.set_files(watched.iter().map(PathBuf::as_path))?;
        info!(files = watched.len(), "Watching for changes");

        match watcher.recv() {
            Some(WatchEvent::Changed(path)) => {
                let extra = watcher.drain();
                info!(path = %path.display(), batched = extra, "Change detected, rebuilding");
            }
            None => return Ok(()),
        }
    }
}
