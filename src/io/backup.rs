use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::io::catalog_io::atomic_write;
use crate::model::catalog::CatalogState;
use crate::ops::export::export_json;

const BACKUP_PREFIX: &str = "projects-backup-";
const BACKUP_EXT: &str = ".json";

/// A backup file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    pub path: PathBuf,
    pub file_name: String,
}

/// Fixed-width, zero-padded timestamp that sorts lexicographically in time order.
pub fn backup_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H-%M-%S-%6fZ").to_string()
}

pub fn backup_file_name(now: DateTime<Utc>) -> String {
    format!("{}{}{}", BACKUP_PREFIX, backup_timestamp(now), BACKUP_EXT)
}

fn is_backup_name(name: &str) -> bool {
    name.starts_with(BACKUP_PREFIX) && name.ends_with(BACKUP_EXT)
}

/// Pick a backup path for `now` that is not taken yet. Collisions move the
/// timestamp forward by a microsecond so name order stays time order.
fn next_backup_path(dir: &Path, mut now: DateTime<Utc>) -> PathBuf {
    loop {
        let path = dir.join(backup_file_name(now));
        if !path.exists() {
            return path;
        }
        now += Duration::microseconds(1);
    }
}

/// Write a full export of `state` into `dir`, then prune to `retain` files.
/// Returns the new backup's path.
pub fn try_create_backup(
    dir: &Path,
    state: &CatalogState,
    retain: usize,
    now: DateTime<Utc>,
) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = next_backup_path(dir, now);
    let text = export_json(state, now).map_err(io::Error::other)?;
    atomic_write(&path, text.as_bytes())?;
    debug!(path = %path.display(), projects = state.projects.len(), "backup written");
    if let Err(e) = prune_backups(dir, retain) {
        warn!(dir = %dir.display(), error = %e, "could not prune backups");
    }
    Ok(path)
}

/// Best-effort backup: failures are logged, never returned.
pub fn create_backup(dir: &Path, state: &CatalogState, retain: usize) -> Option<PathBuf> {
    match try_create_backup(dir, state, retain, Utc::now()) {
        Ok(path) => Some(path),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "could not create backup");
            None
        }
    }
}

/// List backups newest-first. A missing directory is an empty list.
pub fn list_backups(dir: &Path) -> io::Result<Vec<BackupFile>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut backups = Vec::new();
    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !is_backup_name(&file_name) || !entry.path().is_file() {
            continue;
        }
        backups.push(BackupFile {
            path: entry.path(),
            file_name,
        });
    }
    backups.sort_by(|a, b| b.file_name.cmp(&a.file_name));
    Ok(backups)
}

/// Delete all but the newest `retain` backups. Returns how many were removed.
pub fn prune_backups(dir: &Path, retain: usize) -> io::Result<usize> {
    let backups = list_backups(dir)?;
    let mut removed = 0;
    for stale in backups.iter().skip(retain) {
        fs::remove_file(&stale.path)?;
        removed += 1;
    }
    if removed > 0 {
        debug!(dir = %dir.display(), removed, "pruned backups");
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn timestamp_format_is_sortable() {
        let name = backup_file_name(at(0));
        assert_eq!(name, "projects-backup-2026-01-02T03-04-05-000000Z.json");
        assert!(backup_file_name(at(1)) > name);
        assert!(backup_file_name(at(3600 * 24 * 40)) > backup_file_name(at(3600 * 24 * 9)));
    }

    #[test]
    fn list_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let backups = list_backups(&tmp.path().join("nope")).unwrap();
        assert!(backups.is_empty());
    }

    #[test]
    fn retention_keeps_newest() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("backups");
        let state = CatalogState::seeded();
        for i in 0..8 {
            try_create_backup(&dir, &state, 5, at(i)).unwrap();
        }
        let backups = list_backups(&dir).unwrap();
        assert_eq!(backups.len(), 5);
        let expected: Vec<String> = (3..8).rev().map(|i| backup_file_name(at(i))).collect();
        let names: Vec<String> = backups.into_iter().map(|b| b.file_name).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn same_instant_does_not_overwrite() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("backups");
        let state = CatalogState::seeded();
        let a = try_create_backup(&dir, &state, 5, at(0)).unwrap();
        let b = try_create_backup(&dir, &state, 5, at(0)).unwrap();
        assert_ne!(a, b);
        let backups = list_backups(&dir).unwrap();
        assert_eq!(backups.len(), 2);
        assert_eq!(backups[0].path, b);
    }

    #[test]
    fn prune_ignores_foreign_files() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("backups");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("notes.txt"), "keep me").unwrap();
        let state = CatalogState::seeded();
        for i in 0..3 {
            try_create_backup(&dir, &state, 10, at(i)).unwrap();
        }
        assert_eq!(prune_backups(&dir, 1).unwrap(), 2);
        assert!(dir.join("notes.txt").exists());
        assert_eq!(list_backups(&dir).unwrap().len(), 1);
    }

    #[test]
    fn backup_failure_is_swallowed() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let result = create_backup(&blocker.join("backups"), &CatalogState::seeded(), 5);
        assert!(result.is_none());
    }

    #[test]
    fn backup_content_is_an_export() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("backups");
        let path = try_create_backup(&dir, &CatalogState::seeded(), 5, at(0)).unwrap();
        let v: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(v["metadata"]["projectCount"], 1);
        assert_eq!(v["projects"][0]["id"], "example-project");
    }
}
