use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

/// Events sent from the file watcher to whoever owns the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    /// The catalog file was created or modified on disk.
    Changed(PathBuf),
}

/// Watches exactly one file: the catalog.
///
/// The parent directory is watched (editors often replace files by rename)
/// and events are filtered down to the catalog's file name. Removals are
/// ignored; a delete-then-recreate save shows up as the following create.
pub struct CatalogWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<FileEvent>,
}

/// Which event kinds trigger reconciliation.
fn is_relevant_kind(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

/// Whether one notify callback result is a change to the catalog file.
/// Backend errors are logged and count as no change.
fn touches_catalog(result: Result<Event, notify::Error>, target: Option<&OsStr>) -> bool {
    let event = match result {
        Ok(e) => e,
        Err(e) => {
            warn!(error = %e, paths = ?e.paths, "file watcher error");
            return false;
        }
    };
    is_relevant_kind(&event.kind) && event.paths.iter().any(|p| p.file_name() == target)
}

impl CatalogWatcher {
    /// Start watching `catalog_file`. Its parent directory must exist.
    pub fn start(catalog_file: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let dir = catalog_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let target: Option<OsString> = catalog_file.file_name().map(|n| n.to_os_string());
        let target_path = catalog_file.to_path_buf();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                if touches_catalog(result, target.as_deref()) {
                    let _ = tx.send(FileEvent::Changed(target_path.clone()));
                }
            },
            Config::default(),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        debug!(file = %catalog_file.display(), "watching catalog");
        Ok(CatalogWatcher {
            _watcher: watcher,
            rx,
        })
    }

    /// Non-blocking poll for pending file events.
    /// Returns all queued events (may be empty).
    pub fn poll(&self) -> Vec<FileEvent> {
        let mut events = Vec::new();
        while let Ok(evt) = self.rx.try_recv() {
            events.push(evt);
        }
        events
    }

    /// Block up to `timeout` for the next burst of events, then drain the
    /// queue after a short settle delay so one save yields one batch.
    pub fn wait(&self, timeout: Duration, settle: Duration) -> Vec<FileEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(first) => {
                let deadline = Instant::now() + settle;
                let mut events = vec![first];
                while let Some(left) = deadline.checked_duration_since(Instant::now()) {
                    match self.rx.recv_timeout(left) {
                        Ok(evt) => events.push(evt),
                        Err(_) => break,
                    }
                }
                events
            }
            Err(_) => Vec::new(),
        }
    }
}
