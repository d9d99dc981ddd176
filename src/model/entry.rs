use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag that mirrors `is_favorite`. The two are always written together.
pub const FAVORITE_TAG: &str = "favorite";

/// What a catalog entry points at. Drives icon, default color and how the
/// host opens it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectKind {
    #[default]
    Local,
    Workspace,
    Ssh,
    SshWorkspace,
}

impl ProjectKind {
    pub const ALL: [ProjectKind; 4] = [
        ProjectKind::Local,
        ProjectKind::Workspace,
        ProjectKind::Ssh,
        ProjectKind::SshWorkspace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectKind::Local => "local",
            ProjectKind::Workspace => "workspace",
            ProjectKind::Ssh => "ssh",
            ProjectKind::SshWorkspace => "ssh-workspace",
        }
    }

    /// Parse a wire value. Unknown values are rejected, never coerced.
    pub fn parse_kind(s: &str) -> Option<Self> {
        match s {
            "local" => Some(ProjectKind::Local),
            "workspace" => Some(ProjectKind::Workspace),
            "ssh" => Some(ProjectKind::Ssh),
            "ssh-workspace" => Some(ProjectKind::SshWorkspace),
            _ => None,
        }
    }

    pub fn default_color(&self) -> &'static str {
        match self {
            ProjectKind::Local => "#3b82f6",
            ProjectKind::Workspace => "#8b5cf6",
            ProjectKind::Ssh => "#10b981",
            ProjectKind::SshWorkspace => "#f59e0b",
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, ProjectKind::Ssh | ProjectKind::SshWorkspace)
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEntry {
    /// Sole identity key. Empty means "not assigned yet".
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub path: String,
    /// Required on the wire; a missing kind is an error, never `local`.
    pub kind: ProjectKind,
    #[serde(default)]
    pub description: String,
    /// Image data URL, or empty.
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub click_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<DateTime<Utc>>,
}

impl ProjectEntry {
    /// A new entry with no id yet and every optional field defaulted.
    pub fn new(name: impl Into<String>, path: impl Into<String>, kind: ProjectKind) -> Self {
        ProjectEntry {
            id: String::new(),
            name: name.into(),
            path: path.into(),
            kind,
            description: String::new(),
            icon: String::new(),
            color: kind.default_color().to_string(),
            tags: Vec::new(),
            group: None,
            is_favorite: false,
            click_count: 0,
            last_accessed: None,
        }
    }

    /// Assign a fresh id when none is set. Returns true if one was generated.
    pub fn ensure_id(&mut self) -> bool {
        if self.id.trim().is_empty() {
            self.id = generate_id();
            true
        } else {
            false
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Add a tag unless already present.
    pub fn add_tag(&mut self, tag: &str) {
        if !self.has_tag(tag) {
            self.tags.push(tag.to_string());
        }
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.retain(|t| t != tag);
    }

    /// Set favorite status, keeping the flag and the tag in agreement.
    pub fn set_favorite(&mut self, on: bool) {
        self.is_favorite = on;
        if on {
            self.add_tag(FAVORITE_TAG);
        } else {
            self.remove_tag(FAVORITE_TAG);
        }
    }

    /// Display bucket; entries without a group land in "Ungrouped".
    pub fn group_label(&self) -> &str {
        match self.group.as_deref() {
            Some(g) if !g.trim().is_empty() => g,
            _ => "Ungrouped",
        }
    }

    /// Bring an entry to canonical form in place: trimmed identity and
    /// display fields, derivable defaults filled, favorite flag and tag
    /// agreeing.
    ///
    /// Every path into the catalog (store mutations, import, reading the
    /// file) ends here, so exporting and re-importing is lossless.
    pub fn repair(&mut self) {
        trim_in_place(&mut self.id);
        trim_in_place(&mut self.name);
        trim_in_place(&mut self.path);
        trim_in_place(&mut self.color);
        self.ensure_id();
        if self.color.is_empty() {
            self.color = self.kind.default_color().to_string();
        }
        for tag in &mut self.tags {
            trim_in_place(tag);
        }
        dedup_tags(&mut self.tags);
        let favorite = self.is_favorite || self.has_tag(FAVORITE_TAG);
        self.set_favorite(favorite);
        self.group = self
            .group
            .take()
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty());
    }
}

fn trim_in_place(s: &mut String) {
    let trimmed = s.trim();
    if trimmed.len() != s.len() {
        *s = trimmed.to_string();
    }
}

/// Generate an opaque entry id.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Remove duplicate and blank tags, keeping first occurrences in order.
pub fn dedup_tags(tags: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    tags.retain(|t| !t.trim().is_empty() && seen.insert(t.clone()));
}
