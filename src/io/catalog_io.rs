use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::io::paths::CatalogPaths;
use crate::model::catalog::{CatalogState, UiSettings};
use crate::ops::import::{ImportError, normalize_entry};

/// Error type for catalog persistence
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("could not create directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("catalog is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("missing or invalid `projects` array")]
    MissingProjects,
    #[error(transparent)]
    Entry(ImportError),
    #[error("catalog does not match the expected schema: {0}")]
    Schema(#[source] serde_json::Error),
    #[error("could not serialize catalog: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create `dir` and its parents.
pub fn ensure_dir(dir: &Path) -> Result<(), CatalogError> {
    fs::create_dir_all(dir).map_err(|source| CatalogError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// A parsed catalog plus whether it had to be canonicalised.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub state: CatalogState,
    /// The file differs from the canonical encoding of `state` (generated
    /// ids, trimmed or filled fields). Callers write `state` back so that
    /// generated ids survive.
    pub repaired: bool,
}

/// Parse catalog text.
///
/// Each entry goes through the same validation as an import, so an empty
/// `name`/`path` or a missing or unknown `kind` rejects the document. With
/// `require_projects`, a document lacking a `projects` array is rejected;
/// otherwise the field defaults to empty.
pub fn decode_catalog(text: &str, require_projects: bool) -> Result<Decoded, CatalogError> {
    let value: Value = serde_json::from_str(text).map_err(CatalogError::Parse)?;
    let obj = value.as_object().ok_or(CatalogError::MissingProjects)?;
    let raw_projects: &[Value] = match obj.get("projects") {
        Some(Value::Array(items)) => items,
        None if !require_projects => &[],
        _ => return Err(CatalogError::MissingProjects),
    };

    let projects = raw_projects
        .iter()
        .enumerate()
        .map(|(index, raw)| normalize_entry(index, raw).map(|(entry, _)| entry))
        .collect::<Result<Vec<_>, _>>()
        .map_err(CatalogError::Entry)?;
    let ui_settings: UiSettings = match obj.get("uiSettings") {
        Some(raw) => serde_json::from_value(raw.clone()).map_err(CatalogError::Schema)?,
        None => UiSettings::default(),
    };

    let mut state = CatalogState {
        projects,
        ui_settings,
    };
    state.repair();
    let canonical = serde_json::to_value(&state).map_err(CatalogError::Serialize)?;
    Ok(Decoded {
        repaired: canonical != value,
        state,
    })
}

/// Serialize a catalog the way it is stored on disk.
pub fn encode_catalog(state: &CatalogState) -> Result<String, CatalogError> {
    let mut text = serde_json::to_string_pretty(state).map_err(CatalogError::Serialize)?;
    text.push('\n');
    Ok(text)
}

/// Read the catalog file strictly: a missing file, bad JSON, an invalid
/// entry or a document without a `projects` array is an error.
pub fn read_catalog(paths: &CatalogPaths) -> Result<Decoded, CatalogError> {
    let path = paths.catalog_file();
    let text = fs::read_to_string(&path).map_err(|source| CatalogError::Read { path, source })?;
    decode_catalog(&text, true)
}

/// Load the catalog at startup.
///
/// A missing or unparsable file yields the seeded default, which is written
/// back immediately so the file exists afterwards. An unparsable file is
/// copied aside first; if the copy fails the file is left as it is. A valid
/// file that needed repair is written back in canonical form. Only a failure
/// to create the storage directory is returned as an error.
pub fn load(paths: &CatalogPaths) -> Result<CatalogState, CatalogError> {
    ensure_dir(paths.root())?;
    let path = paths.catalog_file();

    let failure = match fs::read_to_string(&path) {
        Ok(text) => match decode_catalog(&text, false) {
            Ok(decoded) => {
                let state = decoded.state;
                debug!(path = %path.display(), projects = state.projects.len(), "catalog loaded");
                if decoded.repaired {
                    match save(paths, &state) {
                        Ok(()) => debug!(path = %path.display(), "wrote repaired catalog"),
                        Err(e) => warn!(error = %e, "could not write repaired catalog"),
                    }
                }
                return Ok(state);
            }
            Err(e) => {
                let bak = paths.corrupt_copy();
                if let Err(copy_err) = fs::copy(&path, &bak) {
                    warn!(
                        path = %path.display(),
                        backup = %bak.display(),
                        error = %e,
                        copy_error = %copy_err,
                        "could not parse catalog or preserve a copy; leaving the file untouched"
                    );
                    return Ok(CatalogState::seeded());
                }
                warn!(
                    path = %path.display(),
                    backup = %bak.display(),
                    error = %e,
                    "could not parse catalog, starting from the default"
                );
                e
            }
        },
        Err(source) => CatalogError::Read {
            path: path.clone(),
            source,
        },
    };

    debug!(reason = %failure, "seeding default catalog");
    let state = CatalogState::seeded();
    if let Err(e) = save(paths, &state) {
        warn!(error = %e, "could not write seeded catalog");
    } else {
        info!(path = %path.display(), "created catalog");
    }
    Ok(state)
}

/// Persist the catalog as pretty-printed JSON, replacing the file atomically.
pub fn save(paths: &CatalogPaths, state: &CatalogState) -> Result<(), CatalogError> {
    ensure_dir(paths.root())?;
    let path = paths.catalog_file();
    let text = encode_catalog(state)?;
    atomic_write(&path, text.as_bytes()).map_err(|source| CatalogError::Write { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entry::{ProjectEntry, ProjectKind};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn temp_paths() -> (TempDir, CatalogPaths) {
        let tmp = TempDir::new().unwrap();
        let paths = CatalogPaths::new(tmp.path().join("shelf"));
        (tmp, paths)
    }

    #[test]
    fn load_missing_seeds_and_persists() {
        let (_tmp, paths) = temp_paths();
        let state = load(&paths).unwrap();
        assert_eq!(state, CatalogState::seeded());
        assert!(paths.catalog_file().exists());
        let again = read_catalog(&paths).unwrap();
        assert_eq!(again.state, state);
        assert!(!again.repaired);
    }

    #[test]
    fn load_corrupt_keeps_copy() {
        let (_tmp, paths) = temp_paths();
        fs::create_dir_all(paths.root()).unwrap();
        fs::write(paths.catalog_file(), "{ not json").unwrap();
        let state = load(&paths).unwrap();
        assert_eq!(state, CatalogState::seeded());
        assert_eq!(
            fs::read_to_string(paths.corrupt_copy()).unwrap(),
            "{ not json"
        );
    }

    #[cfg(unix)]
    #[test]
    fn load_corrupt_without_copy_leaves_file() {
        let (_tmp, paths) = temp_paths();
        fs::create_dir_all(paths.root()).unwrap();
        fs::write(paths.catalog_file(), "{ not json").unwrap();
        // A non-empty directory where the copy should go makes the copy fail.
        fs::create_dir(paths.corrupt_copy()).unwrap();
        fs::write(paths.corrupt_copy().join("occupied"), "x").unwrap();

        let state = load(&paths).unwrap();
        assert_eq!(state, CatalogState::seeded());
        assert_eq!(
            fs::read_to_string(paths.catalog_file()).unwrap(),
            "{ not json"
        );
    }

    #[test]
    fn load_persists_generated_ids() {
        let (_tmp, paths) = temp_paths();
        fs::create_dir_all(paths.root()).unwrap();
        fs::write(
            paths.catalog_file(),
            r#"{"projects":[{"name":"a","path":"/a","kind":"local"}]}"#,
        )
        .unwrap();
        let first = load(&paths).unwrap();
        let second = load(&paths).unwrap();
        assert_eq!(first.projects[0].id, second.projects[0].id);
        assert_eq!(first, second);
        assert!(!read_catalog(&paths).unwrap().repaired);
    }

    #[test]
    fn invalid_entries_are_rejected() {
        for text in [
            r#"{"projects":[{"id":"e","name":"","path":"/p","kind":"local"}]}"#,
            r#"{"projects":[{"id":"e","name":"n","path":"  ","kind":"local"}]}"#,
            r#"{"projects":[{"id":"e","name":"n","path":"/p"}]}"#,
        ] {
            assert!(
                matches!(decode_catalog(text, true), Err(CatalogError::Entry(_))),
                "accepted {}",
                text
            );
        }
        let err = decode_catalog(r#"{"projects":[{"name":"n","path":"/p"}]}"#, true).unwrap_err();
        assert_eq!(err.to_string(), "invalid project at index 0: missing kind");
    }

    #[test]
    fn load_treats_invalid_entry_as_corrupt() {
        let (_tmp, paths) = temp_paths();
        fs::create_dir_all(paths.root()).unwrap();
        let text = r#"{"projects":[{"name":"","path":"","kind":"ssh"}]}"#;
        fs::write(paths.catalog_file(), text).unwrap();
        assert_eq!(load(&paths).unwrap(), CatalogState::seeded());
        assert_eq!(fs::read_to_string(paths.corrupt_copy()).unwrap(), text);
    }

    #[test]
    fn load_fills_missing_fields() {
        let (_tmp, paths) = temp_paths();
        fs::create_dir_all(paths.root()).unwrap();
        fs::write(
            paths.catalog_file(),
            r#"{"projects":[{"name":"a","path":"/a","kind":"ssh"}]}"#,
        )
        .unwrap();
        let state = load(&paths).unwrap();
        assert_eq!(state.projects.len(), 1);
        assert!(!state.projects[0].id.is_empty());
        assert_eq!(state.projects[0].color, ProjectKind::Ssh.default_color());
        assert_eq!(state.ui_settings, Default::default());
    }

    #[test]
    fn load_without_projects_field_is_empty() {
        let (_tmp, paths) = temp_paths();
        fs::create_dir_all(paths.root()).unwrap();
        fs::write(paths.catalog_file(), r#"{"uiSettings":{"compactMode":true}}"#).unwrap();
        let state = load(&paths).unwrap();
        assert!(state.projects.is_empty());
        assert!(state.ui_settings.compact_mode);
    }

    #[test]
    fn load_fails_when_root_cannot_be_created() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let paths = CatalogPaths::new(blocker.join("shelf"));
        assert!(matches!(load(&paths), Err(CatalogError::CreateDir { .. })));
    }

    #[test]
    fn save_then_read_round_trip() {
        let (_tmp, paths) = temp_paths();
        let mut state = CatalogState::default();
        let mut e = ProjectEntry::new("box", "me@box:/srv", ProjectKind::Ssh);
        e.id = "box".into();
        e.set_favorite(true);
        state.projects.push(e);
        save(&paths, &state).unwrap();
        let text = fs::read_to_string(paths.catalog_file()).unwrap();
        assert!(text.contains("\n  \"projects\": ["));
        let decoded = read_catalog(&paths).unwrap();
        assert_eq!(decoded.state, state);
        assert!(!decoded.repaired);
    }

    #[test]
    fn strict_read_requires_projects() {
        assert!(matches!(
            decode_catalog(r#"{"uiSettings":{}}"#, true),
            Err(CatalogError::MissingProjects)
        ));
        assert!(matches!(
            decode_catalog(r#"{"projects":{}}"#, false),
            Err(CatalogError::MissingProjects)
        ));
        assert!(matches!(
            decode_catalog("[]", false),
            Err(CatalogError::MissingProjects)
        ));
        assert!(matches!(
            decode_catalog(r#"{"projects":[{"name":"a","path":"/a","kind":"ftp"}]}"#, true),
            Err(CatalogError::Entry(ImportError::InvalidKind { index: 0, .. }))
        ));
    }

    #[test]
    fn atomic_write_overwrites() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.json");
        atomic_write(&path, b"{}").unwrap();
        atomic_write(&path, b"[]").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
        let leftovers = fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
