use serde::{Deserialize, Serialize};

use crate::model::catalog::UiSettingsPatch;
use crate::model::entry::ProjectEntry;

/// Requests a view sends to the store. Each maps to exactly one store method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ViewRequest {
    /// Create or update an entry (upsert by id).
    SaveProject { project: ProjectEntry },
    DeleteProject { id: String },
    RecordAccess { id: String },
    ToggleFavorite { id: String },
    UpdateUiSettings { settings: UiSettingsPatch },
    Reload,
}

impl ViewRequest {
    /// Parse a JSON message.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// The one signal views receive: re-read the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ViewEvent {
    StateChanged,
}
