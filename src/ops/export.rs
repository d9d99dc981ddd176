use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::model::catalog::{CatalogState, UiSettings};
use crate::model::entry::ProjectEntry;

/// Schema version stamped into every export and backup.
pub const EXPORT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub version: String,
    pub export_date: String,
    pub project_count: usize,
}

/// A catalog file plus a `metadata` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub projects: Vec<ProjectEntry>,
    pub ui_settings: UiSettings,
    pub metadata: ExportMetadata,
}

/// Build the export document for `state` as of `now`.
pub fn export_document(state: &CatalogState, now: DateTime<Utc>) -> ExportDocument {
    ExportDocument {
        projects: state.projects.clone(),
        ui_settings: state.ui_settings.clone(),
        metadata: ExportMetadata {
            version: EXPORT_VERSION.to_string(),
            export_date: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            project_count: state.projects.len(),
        },
    }
}

/// Pretty-printed export JSON.
pub fn export_json(state: &CatalogState, now: DateTime<Utc>) -> Result<String, serde_json::Error> {
    let mut text = serde_json::to_string_pretty(&export_document(state, now))?;
    text.push('\n');
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn metadata_block() {
        let state = CatalogState::seeded();
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let v: serde_json::Value =
            serde_json::from_str(&export_json(&state, now).unwrap()).unwrap();
        assert_eq!(v["metadata"]["version"], "1.0.0");
        assert_eq!(v["metadata"]["exportDate"], "2026-03-04T05:06:07.000Z");
        assert_eq!(v["metadata"]["projectCount"], 1);
        assert!(v["projects"].is_array());
        assert!(v["uiSettings"].is_object());
    }
}
