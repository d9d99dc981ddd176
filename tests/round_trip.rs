use pretty_assertions::assert_eq;
use shelf::io::paths::CatalogPaths;
use shelf::model::config::ShelfConfig;
use shelf::ops::import::ImportShape;
use shelf::store::CatalogStore;
use std::fs;
use tempfile::TempDir;

const PNG_1PX: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

fn open_store(tmp: &TempDir) -> CatalogStore {
    let paths = CatalogPaths::new(tmp.path().join("root"));
    CatalogStore::open(paths, ShelfConfig::default()).unwrap()
}

/// Import `doc`, export, import the export again: the projects must not move.
fn assert_export_round_trip(doc: &str, shape: ImportShape) {
    let tmp = TempDir::new().unwrap();
    let mut store = open_store(&tmp);

    let summary = store.import_text(doc).unwrap();
    assert_eq!(summary.shape, shape);
    let imported = store.state().projects.clone();

    let export = tmp.path().join("export.json");
    store.export_to(&export).unwrap();
    let again = store.import_file(&export).unwrap();
    assert_eq!(again.shape, ImportShape::Native);
    assert_eq!(store.state().projects, imported);

    // What is on disk is what is in memory.
    let on_disk: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.paths().catalog_file()).unwrap()).unwrap();
    assert_eq!(
        on_disk["projects"],
        serde_json::to_value(&store.state().projects).unwrap()
    );
}

#[test]
fn round_trip_native_document() {
    let doc = format!(
        r#"{{
  "projects": [
    {{"id": "a", "name": "Alpha", "path": "/src/alpha", "kind": "local", "icon": "{}"}},
    {{"id": "b", "name": "Beta", "path": "me@box:/srv/beta", "kind": "ssh",
      "group": "servers", "tags": ["favorite"], "clickCount": 4,
      "lastAccessed": "2026-03-01T10:00:00Z"}}
  ]
}}"#,
        PNG_1PX
    );
    assert_export_round_trip(&doc, ImportShape::Native);
}

#[test]
fn round_trip_bare_array() {
    assert_export_round_trip(
        r#"[{"name": "Only", "path": "/only.code-workspace", "kind": "workspace"}]"#,
        ImportShape::BareArray,
    );
}

#[test]
fn round_trip_workspace_folders() {
    assert_export_round_trip(
        r#"{"folders": [{"path": "/srv/one"}, {"uri": "file:///srv/two", "name": "Two"}]}"#,
        ImportShape::WorkspaceFolders,
    );
}

#[test]
fn round_trip_first_array_field() {
    assert_export_round_trip(
        r#"{"version": 2, "items": [{"name": "I", "path": "/i", "kind": "ssh-workspace"}], "other": []}"#,
        ImportShape::ArrayField("items".to_string()),
    );
}

#[test]
fn favorite_tag_and_flag_agree_after_import() {
    let tmp = TempDir::new().unwrap();
    let mut store = open_store(&tmp);
    store
        .import_text(
            r#"[{"name": "t", "path": "/t", "kind": "local", "tags": ["favorite"]},
                {"name": "f", "path": "/f", "kind": "local", "isFavorite": true}]"#,
        )
        .unwrap();
    for entry in &store.state().projects {
        assert!(entry.is_favorite);
        assert!(entry.has_tag("favorite"));
    }
}
