//! The catalog store: one authoritative in-memory `CatalogState` plus the
//! mutation API every view goes through.
//!
//! Every successful mutation runs the same sequence: apply the change,
//! persist it, then notify observers in subscription order. A mutation that
//! fails to persist leaves the in-memory state untouched, and a mutation that
//! turns out to be a no-op (unknown id) neither persists nor notifies.
//!
//! The store is single-threaded. Hosts that share it across threads must wrap
//! it in a mutex held across the whole call; cross-process writers take
//! `io::lock::CatalogLock` around it.

pub mod message;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::io::backup::{self, BackupFile};
use crate::io::catalog_io::{self, CatalogError, atomic_write};
use crate::io::paths::CatalogPaths;
use crate::io::watcher::FileEvent;
use crate::model::catalog::{CatalogState, UiSettingsPatch};
use crate::model::config::ShelfConfig;
use crate::model::entry::{ProjectEntry, generate_id};
use crate::ops::export::export_json;
use crate::ops::import::{self, ImportError, ImportShape, sanitize_icon};

pub use message::{ViewEvent, ViewRequest};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error("invalid project: {field} must not be empty")]
    InvalidEntry { field: &'static str },
    #[error("could not write {path}: {source}")]
    Export {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn FnMut(&CatalogState)>;

/// What the watcher-driven reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconcile {
    /// The file differed and replaced the in-memory state.
    Replaced,
    /// The file matched the in-memory state (e.g. our own write).
    Unchanged,
    /// The file could not be used; in-memory state kept.
    Rejected(String),
}

/// Outcome of a successful import or restore.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSummary {
    pub shape: ImportShape,
    pub imported: usize,
    pub replaced: usize,
    pub icons_cleared: usize,
    /// Backup of the state that was replaced, if one could be written.
    pub backup: Option<PathBuf>,
}

pub struct CatalogStore {
    paths: CatalogPaths,
    config: ShelfConfig,
    state: CatalogState,
    observers: Vec<(SubscriptionId, Callback)>,
    next_subscription: u64,
}

impl CatalogStore {
    /// Load the catalog from disk (seeding a default on first run).
    pub fn open(paths: CatalogPaths, config: ShelfConfig) -> Result<Self, StoreError> {
        let state = catalog_io::load(&paths)?;
        Ok(CatalogStore {
            paths,
            config,
            state,
            observers: Vec::new(),
            next_subscription: 0,
        })
    }

    /// The live state. Views re-read this after every notification.
    pub fn state(&self) -> &CatalogState {
        &self.state
    }

    pub fn paths(&self) -> &CatalogPaths {
        &self.paths
    }

    pub fn config(&self) -> &ShelfConfig {
        &self.config
    }

    pub fn get(&self, id: &str) -> Option<&ProjectEntry> {
        self.state.find(id)
    }

    // -----------------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------------

    /// Register a change observer. Called after every persisted change.
    pub fn subscribe(&mut self, callback: impl FnMut(&CatalogState) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(callback)));
        id
    }

    /// Remove an observer. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    fn notify(&mut self) {
        for (_, callback) in &mut self.observers {
            callback(&self.state);
        }
    }

    /// Persist `next`, adopt it, then notify.
    fn commit(&mut self, next: CatalogState) -> Result<(), StoreError> {
        catalog_io::save(&self.paths, &next)?;
        self.state = next;
        self.notify();
        Ok(())
    }

    /// Apply `change` to a copy of the state and commit the copy.
    fn apply<R>(&mut self, change: impl FnOnce(&mut CatalogState) -> R) -> Result<R, StoreError> {
        let mut next = self.state.clone();
        let result = change(&mut next);
        self.commit(next)?;
        Ok(result)
    }

    /// Like `apply`, but `change` returning `None` means nothing to do:
    /// no write and no notification.
    fn mutate<R>(
        &mut self,
        change: impl FnOnce(&mut CatalogState) -> Option<R>,
    ) -> Result<Option<R>, StoreError> {
        let mut next = self.state.clone();
        let Some(result) = change(&mut next) else {
            return Ok(None);
        };
        self.commit(next)?;
        Ok(Some(result))
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Append a new entry. A missing id is generated; an id that is already
    /// taken is replaced with a fresh one so ids stay unique.
    pub fn add_project(&mut self, entry: ProjectEntry) -> Result<ProjectEntry, StoreError> {
        let mut entry = prepare_entry(entry)?;
        let added = self.apply(|state| {
            if state.find(&entry.id).is_some() {
                entry.id = generate_id();
            }
            state.projects.push(entry.clone());
            entry
        })?;
        debug!(id = %added.id, name = %added.name, "project added");
        Ok(added)
    }

    /// Replace the entry with the same id in place, or append it.
    pub fn upsert_project(&mut self, entry: ProjectEntry) -> Result<ProjectEntry, StoreError> {
        let entry = prepare_entry(entry)?;
        let saved = self.apply(|state| {
            match state.position(&entry.id) {
                Some(idx) => state.projects[idx] = entry.clone(),
                None => state.projects.push(entry.clone()),
            }
            entry
        })?;
        debug!(id = %saved.id, "project saved");
        Ok(saved)
    }

    /// Remove an entry. Unknown ids are a no-op and return `None`.
    pub fn delete_project(&mut self, id: &str) -> Result<Option<ProjectEntry>, StoreError> {
        let removed = self.mutate(|state| {
            let idx = state.position(id)?;
            Some(state.projects.remove(idx))
        })?;
        if let Some(entry) = &removed {
            debug!(id = %entry.id, "project deleted");
        }
        Ok(removed)
    }

    /// Bump the click counter and last-accessed time. Unknown ids are a no-op.
    pub fn record_access(&mut self, id: &str) -> Result<Option<ProjectEntry>, StoreError> {
        let now = Utc::now();
        self.mutate(|state| {
            let entry = state.find_mut(id)?;
            entry.click_count = entry.click_count.saturating_add(1);
            entry.last_accessed = Some(now);
            Some(entry.clone())
        })
    }

    /// Flip favorite status, keeping the flag and the `favorite` tag in
    /// agreement. Returns the new status, or `None` for an unknown id.
    pub fn toggle_favorite(&mut self, id: &str) -> Result<Option<bool>, StoreError> {
        self.mutate(|state| {
            let entry = state.find_mut(id)?;
            let on = !entry.is_favorite;
            entry.set_favorite(on);
            Some(on)
        })
    }

    /// Shallow-merge display preferences.
    pub fn update_ui_settings(&mut self, patch: &UiSettingsPatch) -> Result<(), StoreError> {
        self.apply(|state| state.ui_settings.merge(patch))
    }

    /// Replace every project, backing up the current state first.
    /// Returns the backup path, if the backup could be written.
    pub fn replace_all(
        &mut self,
        projects: Vec<ProjectEntry>,
    ) -> Result<Option<PathBuf>, StoreError> {
        let backup = self.create_backup();
        self.apply(|state| {
            state.projects = projects;
            state.repair();
        })?;
        Ok(backup)
    }

    // -----------------------------------------------------------------------
    // Reload and reconciliation
    // -----------------------------------------------------------------------

    /// User-requested re-read of the catalog file. Any problem with the file
    /// is returned and the in-memory state is kept. A file that needed repair
    /// (generated ids, trimmed fields) is written back before it is adopted.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        let decoded = catalog_io::read_catalog(&self.paths)?;
        if decoded.repaired {
            catalog_io::save(&self.paths, &decoded.state)?;
        }
        self.state = decoded.state;
        self.notify();
        info!(projects = self.state.projects.len(), "catalog reloaded");
        Ok(())
    }

    /// Adopt the on-disk catalog after an external change. Never fails:
    /// unusable files are logged and ignored, and content identical to the
    /// in-memory state (such as the store's own writes) is a no-op.
    ///
    /// A hand edit that needed repair is written back in canonical form, so
    /// the ids adopted here are the ids the next read sees.
    pub fn reconcile_external(&mut self) -> Reconcile {
        match catalog_io::read_catalog(&self.paths) {
            Ok(decoded) => {
                if decoded.repaired
                    && let Err(e) = catalog_io::save(&self.paths, &decoded.state)
                {
                    warn!(error = %e, "could not write repaired catalog back");
                }
                if decoded.state == self.state {
                    return Reconcile::Unchanged;
                }
                self.state = decoded.state;
                self.notify();
                info!(
                    projects = self.state.projects.len(),
                    "catalog changed on disk, reloaded"
                );
                Reconcile::Replaced
            }
            Err(e) => {
                warn!(
                    path = %self.paths.catalog_file().display(),
                    error = %e,
                    "ignoring external catalog change"
                );
                Reconcile::Rejected(e.to_string())
            }
        }
    }

    /// Reconcile once for a batch of watcher events. Empty batches do nothing.
    pub fn handle_file_events(&mut self, events: &[FileEvent]) -> Option<Reconcile> {
        let catalog = self.paths.catalog_file();
        let relevant = events
            .iter()
            .any(|FileEvent::Changed(path)| same_file(path, &catalog));
        relevant.then(|| self.reconcile_external())
    }

    // -----------------------------------------------------------------------
    // Import, export, backups
    // -----------------------------------------------------------------------

    /// Import a document from text. Nothing changes unless every entry is valid.
    pub fn import_text(&mut self, text: &str) -> Result<ImportSummary, StoreError> {
        let normalized = import::normalize_text(text, self.config.icon_strip_threshold_bytes)?;
        let replaced = self.state.projects.len();
        let imported = normalized.projects.len();
        let backup = self.replace_all(normalized.projects)?;
        info!(shape = %normalized.shape, imported, replaced, "catalog imported");
        Ok(ImportSummary {
            shape: normalized.shape,
            imported,
            replaced,
            icons_cleared: normalized.icons_cleared,
            backup,
        })
    }

    /// Import a document from a file.
    pub fn import_file(&mut self, path: &Path) -> Result<ImportSummary, StoreError> {
        let text = fs::read_to_string(path).map_err(|source| ImportError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.import_text(&text)
    }

    /// Restore a backup file. Goes through the import pipeline, so the current
    /// state is itself backed up first.
    pub fn restore_backup(&mut self, backup: &Path) -> Result<ImportSummary, StoreError> {
        self.import_file(backup)
    }

    /// Write an export document for the current state. Returns the project count.
    pub fn export_to(&self, path: &Path) -> Result<usize, StoreError> {
        let text = export_json(&self.state, Utc::now())
            .map_err(|e| StoreError::Catalog(CatalogError::Serialize(e)))?;
        atomic_write(path, text.as_bytes()).map_err(|source| StoreError::Export {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.state.projects.len())
    }

    /// Best-effort backup of the current state.
    pub fn create_backup(&self) -> Option<PathBuf> {
        backup::create_backup(
            &self.paths.backup_dir(),
            &self.state,
            self.config.retention(),
        )
    }

    pub fn list_backups(&self) -> std::io::Result<Vec<BackupFile>> {
        backup::list_backups(&self.paths.backup_dir())
    }

    pub fn prune_backups(&self) -> std::io::Result<usize> {
        backup::prune_backups(&self.paths.backup_dir(), self.config.retention())
    }

    // -----------------------------------------------------------------------
    // View requests
    // -----------------------------------------------------------------------

    /// Dispatch a view request to the matching store method.
    pub fn handle(&mut self, request: ViewRequest) -> Result<(), StoreError> {
        match request {
            ViewRequest::SaveProject { project } => self.upsert_project(project).map(|_| ()),
            ViewRequest::DeleteProject { id } => self.delete_project(&id).map(|_| ()),
            ViewRequest::RecordAccess { id } => self.record_access(&id).map(|_| ()),
            ViewRequest::ToggleFavorite { id } => self.toggle_favorite(&id).map(|_| ()),
            ViewRequest::UpdateUiSettings { settings } => self.update_ui_settings(&settings),
            ViewRequest::Reload => self.reload(),
        }
    }
}

/// Validate caller input and bring it to canonical form.
fn prepare_entry(mut entry: ProjectEntry) -> Result<ProjectEntry, StoreError> {
    entry.icon = sanitize_icon(&entry.icon);
    entry.repair();
    if entry.name.is_empty() {
        return Err(StoreError::InvalidEntry { field: "name" });
    }
    if entry.path.is_empty() {
        return Err(StoreError::InvalidEntry { field: "path" });
    }
    Ok(entry)
}

fn same_file(a: &Path, b: &Path) -> bool {
    a == b || a.file_name() == b.file_name()
}
