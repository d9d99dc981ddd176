use serde::{Deserialize, Deserializer, Serialize};

use super::entry::{ProjectEntry, ProjectKind};

/// How views lay out the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    List,
    Grid,
}

impl ViewMode {
    pub fn parse_mode(s: &str) -> Option<Self> {
        match s {
            "list" => Some(ViewMode::List),
            "grid" => Some(ViewMode::Grid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::List => "list",
            ViewMode::Grid => "grid",
        }
    }
}

impl std::fmt::Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display preferences persisted next to the projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UiSettings {
    #[serde(default)]
    pub compact_mode: bool,
    #[serde(default)]
    pub view_mode: ViewMode,
    /// Last-selected group filter (None = show all groups)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_group: Option<String>,
}

/// A partial `UiSettings` update. Absent fields are left alone;
/// `selectedGroup: null` clears the filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UiSettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compact_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_mode: Option<ViewMode>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub selected_group: Option<Option<String>>,
}

/// Distinguish an explicit `null` from a missing field.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl UiSettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.compact_mode.is_none() && self.view_mode.is_none() && self.selected_group.is_none()
    }
}

impl UiSettings {
    /// Shallow-merge a patch into these settings.
    pub fn merge(&mut self, patch: &UiSettingsPatch) {
        if let Some(compact) = patch.compact_mode {
            self.compact_mode = compact;
        }
        if let Some(mode) = patch.view_mode {
            self.view_mode = mode;
        }
        if let Some(group) = &patch.selected_group {
            self.selected_group = group.clone().filter(|g| !g.trim().is_empty());
        }
    }
}

/// The root aggregate persisted to `projects.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CatalogState {
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
    #[serde(default)]
    pub ui_settings: UiSettings,
}

impl CatalogState {
    /// The state written on first run or when the catalog file is unusable.
    pub fn seeded() -> Self {
        CatalogState {
            projects: vec![example_entry()],
            ui_settings: UiSettings::default(),
        }
    }

    pub fn find(&self, id: &str) -> Option<&ProjectEntry> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut ProjectEntry> {
        self.projects.iter_mut().find(|p| p.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.projects.iter().position(|p| p.id == id)
    }

    /// Group names in first-seen display order, "Ungrouped" included.
    pub fn groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = Vec::new();
        for p in &self.projects {
            let label = p.group_label();
            if !groups.iter().any(|g| g == label) {
                groups.push(label.to_string());
            }
        }
        groups
    }

    /// Repair every entry and make ids unique. Later duplicates get a fresh id.
    pub fn repair(&mut self) {
        let mut seen = std::collections::HashSet::new();
        for p in &mut self.projects {
            p.repair();
            if !seen.insert(p.id.clone()) {
                p.id = super::entry::generate_id();
                seen.insert(p.id.clone());
            }
        }
    }
}

/// The single entry a fresh catalog starts with.
pub fn example_entry() -> ProjectEntry {
    let mut entry = ProjectEntry::new("Example Project", "~/projects/example", ProjectKind::Local);
    entry.id = "example-project".to_string();
    entry.description = "An example entry. Edit or remove it to get started.".to_string();
    entry.tags = vec!["example".to_string()];
    entry
}
