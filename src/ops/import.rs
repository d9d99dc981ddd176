//! Turn an arbitrary JSON document into a validated list of catalog entries.
//!
//! Documents are matched against known shapes in a fixed order, first match
//! wins:
//!
//! 1. an object with a `projects` array (the native and export formats)
//! 2. a bare array of entries
//! 3. an object with a `folders` array (editor workspace files)
//! 4. the first array-valued field of an object, in document key order
//!
//! The selected array is then validated entry by entry. A single invalid
//! entry rejects the whole document.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use base64::Engine;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::model::entry::{ProjectEntry, ProjectKind, dedup_tags, generate_id};

/// Prefix every accepted icon must start with.
pub const ICON_DATA_URL_PREFIX: &str = "data:image/";

/// Name given to workspace folders that do not carry one.
pub const IMPORTED_FOLDER_NAME: &str = "Imported Project";

/// Tag stamped on entries created from workspace folders.
pub const IMPORTED_TAG: &str = "imported";

/// Error type for import operations
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("import file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(
        "missing or invalid `projects` array: expected an object with a `projects` array, \
         a bare array of projects, or a workspace file with a `folders` array"
    )]
    UnrecognizedShape,
    #[error("invalid project at index {index}: expected an object")]
    NotAnObject { index: usize },
    #[error("invalid project at index {index}: missing {field}")]
    MissingField { index: usize, field: &'static str },
    #[error(
        "invalid project at index {index}: unknown kind {value} \
         (expected local, workspace, ssh or ssh-workspace)"
    )]
    InvalidKind { index: usize, value: String },
}

/// Which document shape the entries were taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportShape {
    Native,
    BareArray,
    WorkspaceFolders,
    /// Fallback: the named field was the first array in the object.
    ArrayField(String),
}

impl fmt::Display for ImportShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportShape::Native => write!(f, "projects list"),
            ImportShape::BareArray => write!(f, "bare array"),
            ImportShape::WorkspaceFolders => write!(f, "workspace folders"),
            ImportShape::ArrayField(name) => write!(f, "`{}` field", name),
        }
    }
}

/// Result of normalizing a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub shape: ImportShape,
    pub projects: Vec<ProjectEntry>,
    /// Icons that were present but malformed and have been cleared.
    pub icons_cleared: usize,
}

/// A shape matcher declined the document; try the next one.
struct TryNext;

type Attempt<'a> = Result<(ImportShape, Cow<'a, [Value]>), TryNext>;

fn native_shape(doc: &Value) -> Attempt<'_> {
    match doc.get("projects") {
        Some(Value::Array(items)) => Ok((ImportShape::Native, Cow::Borrowed(items.as_slice()))),
        _ => Err(TryNext),
    }
}

fn bare_array(doc: &Value) -> Attempt<'_> {
    match doc {
        Value::Array(items) => Ok((ImportShape::BareArray, Cow::Borrowed(items.as_slice()))),
        _ => Err(TryNext),
    }
}

fn workspace_folders(doc: &Value) -> Attempt<'_> {
    match doc.get("folders") {
        Some(Value::Array(folders)) => {
            let items = folders.iter().map(folder_to_entry).collect();
            Ok((ImportShape::WorkspaceFolders, Cow::Owned(items)))
        }
        _ => Err(TryNext),
    }
}

fn first_array_field(doc: &Value) -> Attempt<'_> {
    let obj = doc.as_object().ok_or(TryNext)?;
    obj.iter()
        .find_map(|(key, value)| match value {
            Value::Array(items) => Some((
                ImportShape::ArrayField(key.clone()),
                Cow::Borrowed(items.as_slice()),
            )),
            _ => None,
        })
        .ok_or(TryNext)
}

const SHAPES: [for<'a> fn(&'a Value) -> Attempt<'a>; 4] =
    [native_shape, bare_array, workspace_folders, first_array_field];

/// Pick the candidate entries array out of a document.
fn select_entries(doc: &Value) -> Result<(ImportShape, Cow<'_, [Value]>), ImportError> {
    SHAPES
        .iter()
        .find_map(|shape| shape(doc).ok())
        .ok_or(ImportError::UnrecognizedShape)
}

/// Map one workspace folder element to a raw entry object.
/// Non-objects are passed through so validation reports them by index.
fn folder_to_entry(folder: &Value) -> Value {
    let Some(obj) = folder.as_object() else {
        return folder.clone();
    };
    let name = non_empty_str(obj, "name").unwrap_or(IMPORTED_FOLDER_NAME);
    let path = non_empty_str(obj, "path")
        .map(str::to_string)
        .or_else(|| non_empty_str(obj, "uri").map(folder_uri_to_path))
        .or_else(|| non_empty_str(obj, "name").map(str::to_string))
        .unwrap_or_default();
    json!({
        "name": name,
        "path": path,
        "kind": ProjectKind::Workspace.as_str(),
        "color": ProjectKind::Workspace.default_color(),
        "tags": [IMPORTED_TAG],
    })
}

/// `file://` URIs become plain paths; other schemes are kept verbatim.
fn folder_uri_to_path(uri: &str) -> String {
    match uri.strip_prefix("file://") {
        Some(rest) => rest.to_string(),
        None => uri.to_string(),
    }
}

fn non_empty_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Icons
// ---------------------------------------------------------------------------

/// Return the icon if it is a well-formed base64 image data URL, else empty.
pub fn sanitize_icon(icon: &str) -> String {
    if icon_is_valid(icon) {
        icon.to_string()
    } else {
        String::new()
    }
}

fn icon_is_valid(icon: &str) -> bool {
    let Some(rest) = icon.strip_prefix(ICON_DATA_URL_PREFIX) else {
        return false;
    };
    let Some((_, payload)) = rest.split_once(";base64,") else {
        return false;
    };
    !payload.is_empty()
        && base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .is_ok()
}

static ICON_PAYLOAD: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#""icon"\s*:\s*"data:[^"]*""#).ok());

/// Blank out every embedded icon payload in raw JSON text. A no-op when the
/// text has none.
pub fn strip_icon_payloads(text: &str) -> Cow<'_, str> {
    match ICON_PAYLOAD.as_ref() {
        Some(re) => re.replace_all(text, r#""icon": """#),
        None => Cow::Borrowed(text),
    }
}

// ---------------------------------------------------------------------------
// Entry validation
// ---------------------------------------------------------------------------

/// Validate one raw entry (object, then `name`, `path`, `kind`) and build
/// its canonical form. The flag reports an icon that had to be cleared.
pub fn normalize_entry(index: usize, raw: &Value) -> Result<(ProjectEntry, bool), ImportError> {
    let obj = raw.as_object().ok_or(ImportError::NotAnObject { index })?;

    let name = non_empty_str(obj, "name").ok_or(ImportError::MissingField {
        index,
        field: "name",
    })?;
    let path = non_empty_str(obj, "path").ok_or(ImportError::MissingField {
        index,
        field: "path",
    })?;
    let kind = match obj.get("kind") {
        None | Some(Value::Null) => {
            return Err(ImportError::MissingField {
                index,
                field: "kind",
            });
        }
        Some(Value::String(s)) => {
            ProjectKind::parse_kind(s).ok_or_else(|| ImportError::InvalidKind {
                index,
                value: format!("\"{}\"", s),
            })?
        }
        Some(other) => {
            return Err(ImportError::InvalidKind {
                index,
                value: other.to_string(),
            });
        }
    };

    let mut entry = ProjectEntry::new(name, path, kind);
    if let Some(id) = non_empty_str(obj, "id") {
        entry.id = id.to_string();
    }
    if let Some(description) = obj.get("description").and_then(Value::as_str) {
        entry.description = description.to_string();
    }
    if let Some(color) = non_empty_str(obj, "color") {
        entry.color = color.to_string();
    }
    if let Some(group) = non_empty_str(obj, "group") {
        entry.group = Some(group.to_string());
    }

    let mut icon_cleared = false;
    if let Some(icon) = obj.get("icon").and_then(Value::as_str) {
        entry.icon = sanitize_icon(icon);
        icon_cleared = !icon.is_empty() && entry.icon.is_empty();
    }

    if let Some(Value::Array(tags)) = obj.get("tags") {
        entry.tags = tags
            .iter()
            .filter_map(Value::as_str)
            .map(|t| t.trim().to_string())
            .collect();
        dedup_tags(&mut entry.tags);
    }
    let flagged = obj
        .get("isFavorite")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let favorite = flagged || entry.has_tag(crate::model::entry::FAVORITE_TAG);
    entry.set_favorite(favorite);

    entry.click_count = obj.get("clickCount").map(parse_count).unwrap_or(0);
    entry.last_accessed = obj.get("lastAccessed").and_then(parse_timestamp);

    entry.repair();
    Ok((entry, icon_cleared))
}

fn parse_count(v: &Value) -> u64 {
    v.as_u64()
        .or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
        .unwrap_or(0)
}

/// RFC 3339 strings, or integers as epoch milliseconds.
fn parse_timestamp(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}

/// Validate and normalize a parsed document.
pub fn normalize_document(doc: &Value) -> Result<Normalized, ImportError> {
    let (shape, items) = select_entries(doc)?;

    let mut projects = Vec::with_capacity(items.len());
    let mut icons_cleared = 0;
    for (index, raw) in items.iter().enumerate() {
        let (entry, cleared) = normalize_entry(index, raw)?;
        if cleared {
            icons_cleared += 1;
        }
        projects.push(entry);
    }

    // Ids must stay unique; later duplicates get a fresh one.
    let mut seen = HashSet::new();
    for entry in &mut projects {
        if !seen.insert(entry.id.clone()) {
            entry.id = generate_id();
            seen.insert(entry.id.clone());
        }
    }

    debug!(%shape, projects = projects.len(), icons_cleared, "normalized import");
    Ok(Normalized {
        shape,
        projects,
        icons_cleared,
    })
}

/// Parse and normalize raw document text. Text longer than
/// `strip_threshold` bytes has its icon payloads removed before parsing.
pub fn normalize_text(text: &str, strip_threshold: usize) -> Result<Normalized, ImportError> {
    let text = if text.len() > strip_threshold {
        debug!(bytes = text.len(), "stripping icon payloads from large import");
        strip_icon_payloads(text)
    } else {
        Cow::Borrowed(text)
    };
    let doc: Value = serde_json::from_str(&text)?;
    normalize_document(&doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PNG_1PX: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn normalize(text: &str) -> Result<Normalized, ImportError> {
        normalize_text(text, usize::MAX)
    }

    #[test]
    fn native_shape_wins() {
        let n = normalize(
            r#"{"folders":[{"path":"/ws"}],"projects":[{"name":"A","path":"/a","kind":"local"}]}"#,
        )
        .unwrap();
        assert_eq!(n.shape, ImportShape::Native);
        assert_eq!(n.projects.len(), 1);
        assert_eq!(n.projects[0].name, "A");
    }

    #[test]
    fn bare_array_fills_defaults() {
        let n = normalize(r#"[{"name":"A","path":"/tmp/a","kind":"local"}]"#).unwrap();
        assert_eq!(n.shape, ImportShape::BareArray);
        let e = &n.projects[0];
        assert!(!e.id.is_empty());
        assert_eq!(e.color, ProjectKind::Local.default_color());
        assert!(e.tags.is_empty());
        assert_eq!(e.description, "");
        assert_eq!(e.icon, "");
        assert!(!e.is_favorite);
        assert_eq!(e.click_count, 0);
    }

    #[test]
    fn workspace_folders_become_workspace_entries() {
        let n = normalize(r#"{"folders":[{"name":"F","path":"/ws"}]}"#).unwrap();
        assert_eq!(n.shape, ImportShape::WorkspaceFolders);
        let e = &n.projects[0];
        assert_eq!(e.kind, ProjectKind::Workspace);
        assert_eq!(e.name, "F");
        assert_eq!(e.path, "/ws");
        assert_eq!(e.color, ProjectKind::Workspace.default_color());
        assert_eq!(e.tags, vec![IMPORTED_TAG]);
    }

    #[test]
    fn workspace_folder_fallbacks() {
        let n = normalize(
            r#"{"folders":[{"uri":"file:///home/me/app"},{"uri":"vscode-remote://ssh-remote+box/srv"}]}"#,
        )
        .unwrap();
        assert_eq!(n.projects[0].name, IMPORTED_FOLDER_NAME);
        assert_eq!(n.projects[0].path, "/home/me/app");
        assert_eq!(n.projects[1].path, "vscode-remote://ssh-remote+box/srv");
    }

    #[test]
    fn workspace_folder_without_location_is_rejected() {
        let err = normalize(r#"{"folders":[{"path":"/ok"},{}]}"#).unwrap_err();
        // `{}` has no name either, so the default name is used and path stays empty
        assert!(matches!(
            err,
            ImportError::MissingField {
                index: 1,
                field: "path"
            }
        ));
    }

    #[test]
    fn first_array_field_in_key_order() {
        let n = normalize(
            r#"{"title":"mine","zeta":[{"name":"Z","path":"/z","kind":"ssh"}],"alpha":[]}"#,
        )
        .unwrap();
        assert_eq!(n.shape, ImportShape::ArrayField("zeta".into()));
        assert_eq!(n.projects[0].name, "Z");
    }

    #[test]
    fn unrecognized_shapes() {
        for doc in [r#"{"projects":{}}"#, r#"{"a":1}"#, "42", r#""text""#] {
            let err = normalize(doc).unwrap_err();
            assert!(matches!(err, ImportError::UnrecognizedShape), "{doc}");
        }
        assert!(
            ImportError::UnrecognizedShape
                .to_string()
                .contains("`projects`")
        );
    }

    #[test]
    fn missing_path_names_index_and_field() {
        let err = normalize(r#"{"projects": [{"name": "x"}]}"#).unwrap_err();
        assert!(matches!(
            err,
            ImportError::MissingField {
                index: 0,
                field: "path"
            }
        ));
        assert_eq!(err.to_string(), "invalid project at index 0: missing path");
    }

    #[test]
    fn blank_name_is_missing() {
        let err = normalize(r#"[{"name":"ok","path":"/a","kind":"local"},{"name":"  ","path":"/b","kind":"local"}]"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid project at index 1: missing name");
    }

    #[test]
    fn invalid_kind_is_rejected_not_coerced() {
        let err = normalize(r#"[{"name":"a","path":"/a","kind":"remote"}]"#).unwrap_err();
        match err {
            ImportError::InvalidKind { index, value } => {
                assert_eq!(index, 0);
                assert_eq!(value, "\"remote\"");
            }
            other => panic!("unexpected error: {other}"),
        }
        let err = normalize(r#"[{"name":"a","path":"/a","kind":3}]"#).unwrap_err();
        assert!(matches!(err, ImportError::InvalidKind { .. }));
        let err = normalize(r#"[{"name":"a","path":"/a"}]"#).unwrap_err();
        assert!(matches!(err, ImportError::MissingField { field: "kind", .. }));
    }

    #[test]
    fn non_object_entry() {
        let err = normalize(r#"[{"name":"a","path":"/a","kind":"local"}, "b"]"#).unwrap_err();
        assert!(matches!(err, ImportError::NotAnObject { index: 1 }));
    }

    #[test]
    fn favorite_flag_and_tag_reconciled() {
        let n = normalize(
            r#"[
                {"name":"a","path":"/a","kind":"local","isFavorite":true},
                {"name":"b","path":"/b","kind":"local","tags":["favorite","x","x"]}
            ]"#,
        )
        .unwrap();
        assert!(n.projects[0].is_favorite);
        assert_eq!(n.projects[0].tags, vec!["favorite"]);
        assert!(n.projects[1].is_favorite);
        assert_eq!(n.projects[1].tags, vec!["favorite", "x"]);
    }

    #[test]
    fn duplicate_ids_are_reassigned() {
        let n = normalize(
            r#"[{"id":"1","name":"a","path":"/a","kind":"local"},{"id":"1","name":"b","path":"/b","kind":"local"}]"#,
        )
        .unwrap();
        assert_eq!(n.projects[0].id, "1");
        assert_ne!(n.projects[1].id, "1");
    }

    #[test]
    fn timestamps_and_counts() {
        let n = normalize(
            r#"[
                {"name":"a","path":"/a","kind":"local","clickCount":4,"lastAccessed":"2026-01-02T03:04:05Z"},
                {"name":"b","path":"/b","kind":"local","clickCount":-1,"lastAccessed":1767323045000},
                {"name":"c","path":"/c","kind":"local","lastAccessed":"yesterday"}
            ]"#,
        )
        .unwrap();
        assert_eq!(n.projects[0].click_count, 4);
        assert_eq!(
            n.projects[0].last_accessed.unwrap().to_rfc3339(),
            "2026-01-02T03:04:05+00:00"
        );
        assert_eq!(n.projects[1].click_count, 0);
        assert_eq!(
            n.projects[1].last_accessed.unwrap().timestamp(),
            1_767_323_045
        );
        assert!(n.projects[2].last_accessed.is_none());
    }

    #[test]
    fn icon_sanitization() {
        assert_eq!(sanitize_icon(PNG_1PX), PNG_1PX);
        assert_eq!(sanitize_icon(""), "");
        assert_eq!(sanitize_icon("https://example.com/icon.png"), "");
        assert_eq!(sanitize_icon("data:image/png;base64,@@not-base64@@"), "");
        assert_eq!(sanitize_icon("data:image/png;base64,"), "");
        assert_eq!(sanitize_icon("data:text/plain;base64,aGk="), "");
    }

    #[test]
    fn bad_icon_does_not_block_import() {
        let doc = format!(
            r#"[{{"name":"a","path":"/a","kind":"local","icon":"{}"}},{{"name":"b","path":"/b","kind":"local","icon":"not an icon"}}]"#,
            PNG_1PX
        );
        let n = normalize(&doc).unwrap();
        assert_eq!(n.projects[0].icon, PNG_1PX);
        assert_eq!(n.projects[1].icon, "");
        assert_eq!(n.icons_cleared, 1);
    }

    #[test]
    fn large_documents_lose_icons_before_parsing() {
        let doc = format!(
            r#"{{"projects":[{{"name":"a","path":"/a","kind":"local","icon":"{}"}}]}}"#,
            PNG_1PX
        );
        let n = normalize_text(&doc, 10).unwrap();
        assert_eq!(n.projects[0].icon, "");
        assert_eq!(n.icons_cleared, 0);
    }

    #[test]
    fn strip_is_safe_without_icons() {
        let text = r#"{"projects":[{"name":"a","path":"/a","kind":"local"}]}"#;
        assert_eq!(strip_icon_payloads(text), text);
        let n = normalize_text(text, 0).unwrap();
        assert_eq!(n.projects.len(), 1);
    }

    #[test]
    fn invalid_json() {
        assert!(matches!(normalize("{"), Err(ImportError::Parse(_))));
    }
}
