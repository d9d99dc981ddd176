use std::time::Duration;

use tracing::info;

use super::{CmdResult, open_locked};
use crate::io::paths::CatalogPaths;
use crate::io::watcher::CatalogWatcher;
use crate::store::{Reconcile, ViewEvent};

/// How long one wait on the watcher blocks before looping.
const POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Events arriving within this window after the first are one save.
const SETTLE: Duration = Duration::from_millis(100);

/// Follow the catalog file until interrupted, printing every change.
///
/// The lock is only held while the store opens (which may seed the file).
/// Reconciling writes only to canonicalize a hand edit that needed repair.
pub fn cmd_watch(paths: &CatalogPaths, json: bool) -> CmdResult {
    let mut store = {
        let (_lock, store) = open_locked(paths)?;
        store
    };
    let watcher = CatalogWatcher::start(&paths.catalog_file())?;

    store.subscribe(move |state| {
        if json {
            if let Ok(line) = serde_json::to_string(&ViewEvent::StateChanged) {
                println!("{}", line);
            }
        } else {
            println!("catalog changed: {} projects", state.projects.len());
        }
    });

    info!(file = %paths.catalog_file().display(), "watching for changes");
    if !json {
        eprintln!("watching {} (ctrl-c to stop)", paths.catalog_file().display());
    }

    loop {
        let events = watcher.wait(POLL_INTERVAL, SETTLE);
        if let Some(Reconcile::Rejected(reason)) = store.handle_file_events(&events)
            && !json
        {
            eprintln!("ignored change: {}", reason);
        }
    }
}
