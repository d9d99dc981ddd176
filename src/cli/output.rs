use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::io::backup::BackupFile;
use crate::io::paths::abbreviate_path;
use crate::model::catalog::CatalogState;
use crate::model::entry::ProjectEntry;
use crate::store::ImportSummary;
use crate::util::text::{pad_to_width, relative_time_from, truncate_to_width};

/// Longest name column before truncation.
const MAX_NAME_WIDTH: usize = 32;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ImportJson {
    pub shape: String,
    pub imported: usize,
    pub replaced: usize,
    pub icons_cleared: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
}

impl From<&ImportSummary> for ImportJson {
    fn from(s: &ImportSummary) -> Self {
        ImportJson {
            shape: s.shape.to_string(),
            imported: s.imported,
            replaced: s.replaced,
            icons_cleared: s.icons_cleared,
            backup: s.backup.as_ref().map(|p| p.display().to_string()),
        }
    }
}

#[derive(Serialize)]
pub struct BackupJson {
    pub file: String,
    pub path: String,
}

impl From<&BackupFile> for BackupJson {
    fn from(b: &BackupFile) -> Self {
        BackupJson {
            file: b.file_name.clone(),
            path: b.path.display().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

/// Width of the name column for a set of entries.
pub fn name_column_width<'a>(entries: impl IntoIterator<Item = &'a ProjectEntry>) -> usize {
    entries
        .into_iter()
        .map(|e| crate::util::text::display_width(&e.name))
        .max()
        .unwrap_or(0)
        .clamp(4, MAX_NAME_WIDTH)
}

/// One line per entry: favorite marker, name, kind, path, last opened.
pub fn format_entry_line(entry: &ProjectEntry, name_width: usize, now: DateTime<Utc>) -> String {
    let star = if entry.is_favorite { '*' } else { ' ' };
    let name = pad_to_width(&truncate_to_width(&entry.name, name_width), name_width);
    let kind = pad_to_width(entry.kind.as_str(), 13);
    let mut line = format!(
        "{} {}  {}  {}",
        star,
        name,
        kind,
        abbreviate_path(&entry.path)
    );
    if let Some(at) = &entry.last_accessed {
        line.push_str(&format!("  ({})", relative_time_from(at, now)));
    }
    line
}

/// Render entries under group headings, in display order.
pub fn format_listing(state: &CatalogState, entries: &[&ProjectEntry], now: DateTime<Utc>) -> String {
    let mut out = String::new();
    if entries.is_empty() {
        out.push_str("No projects.\n");
        return out;
    }
    let width = name_column_width(entries.iter().copied());
    let compact = state.ui_settings.compact_mode;

    for group in state.groups() {
        let members: Vec<&&ProjectEntry> =
            entries.iter().filter(|e| e.group_label() == group).collect();
        if members.is_empty() {
            continue;
        }
        out.push_str(&format!("{}\n", group));
        for entry in members {
            out.push_str("  ");
            out.push_str(&format_entry_line(entry, width, now));
            out.push('\n');
            if !compact && !entry.description.is_empty() {
                out.push_str(&format!("      {}\n", entry.description));
            }
        }
    }
    out
}

/// Multi-line detail view for `show`.
pub fn format_entry_detail(entry: &ProjectEntry, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", entry.name));
    out.push_str(&format!("  id:          {}\n", entry.id));
    out.push_str(&format!("  kind:        {}\n", entry.kind));
    out.push_str(&format!("  path:        {}\n", entry.path));
    out.push_str(&format!("  group:       {}\n", entry.group_label()));
    out.push_str(&format!("  color:       {}\n", entry.color));
    if !entry.tags.is_empty() {
        out.push_str(&format!("  tags:        {}\n", entry.tags.join(", ")));
    }
    out.push_str(&format!(
        "  favorite:    {}\n",
        if entry.is_favorite { "yes" } else { "no" }
    ));
    out.push_str(&format!("  opened:      {} times", entry.click_count));
    if let Some(at) = &entry.last_accessed {
        out.push_str(&format!(", last {}", relative_time_from(at, now)));
    }
    out.push('\n');
    if !entry.icon.is_empty() {
        out.push_str("  icon:        yes\n");
    }
    if !entry.description.is_empty() {
        out.push_str(&format!("\n  {}\n", entry.description));
    }
    out
}

pub fn format_import_summary(summary: &ImportSummary) -> String {
    let mut out = format!(
        "imported {} projects from {} (replaced {})\n",
        summary.imported, summary.shape, summary.replaced
    );
    if summary.icons_cleared > 0 {
        out.push_str(&format!(
            "cleared {} malformed icon(s)\n",
            summary.icons_cleared
        ));
    }
    match &summary.backup {
        Some(path) => out.push_str(&format!("previous catalog saved to {}\n", path.display())),
        None => out.push_str("warning: previous catalog could not be backed up\n"),
    }
    out
}
