use clap::{Args, Parser, Subcommand};

use crate::model::catalog::ViewMode;
use crate::model::entry::ProjectKind;

#[derive(Parser)]
#[command(name = "shelf", about = concat!("shelf v", env!("CARGO_PKG_VERSION"), " - every project you work on, one list"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use a different storage root (default: $SHELF_HOME or ~/.config/shelf)
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List catalog entries
    List(ListArgs),
    /// Show one entry
    Show(IdArg),
    /// Add a new entry
    Add(AddArgs),
    /// Edit an existing entry
    Edit(EditArgs),
    /// Remove an entry
    Remove(IdArg),
    /// Record that an entry was opened and print its path
    Open(IdArg),
    /// Toggle favorite status
    Fav(IdArg),
    /// Change display preferences
    Ui(UiArgs),
    /// Replace the catalog with the projects in a JSON file
    Import(FileArg),
    /// Write the catalog and metadata to a JSON file
    Export(FileArg),
    /// Re-read the catalog file from disk
    Reload,
    /// Manage backups
    Backup(BackupCmd),
    /// Watch the catalog file and print every change
    Watch,
    /// Apply a JSON view request, e.g. '{"type":"toggleFavorite","id":"..."}'
    Send(SendArgs),
    /// Print the catalog file path
    Path,
    /// Show or change settings
    Config(ConfigCmd),
}

fn parse_kind_arg(s: &str) -> Result<ProjectKind, String> {
    ProjectKind::parse_kind(s)
        .ok_or_else(|| format!("unknown kind '{}' (expected local, workspace, ssh or ssh-workspace)", s))
}

fn parse_view_arg(s: &str) -> Result<ViewMode, String> {
    ViewMode::parse_mode(s).ok_or_else(|| format!("unknown view '{}' (expected list or grid)", s))
}

// ---------------------------------------------------------------------------
// Entry args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct IdArg {
    /// Entry id
    pub id: String,
}

#[derive(Args)]
pub struct FileArg {
    /// Path to the JSON file
    pub file: String,
}

#[derive(Args)]
pub struct ListArgs {
    /// Only entries in this group ("Ungrouped" for entries without one)
    #[arg(long)]
    pub group: Option<String>,
    /// Ignore the saved group filter
    #[arg(long, conflicts_with = "group")]
    pub all: bool,
    /// Only favorites
    #[arg(long)]
    pub favorites: bool,
    /// Only entries of this kind
    #[arg(long, value_parser = parse_kind_arg)]
    pub kind: Option<ProjectKind>,
}

#[derive(Args)]
pub struct AddArgs {
    /// Display name
    pub name: String,
    /// Folder, workspace file, or user@host:/path for remotes
    pub path: String,
    /// local, workspace, ssh or ssh-workspace
    #[arg(long, default_value = "local", value_parser = parse_kind_arg)]
    pub kind: ProjectKind,
    #[arg(long)]
    pub description: Option<String>,
    /// Display color (default depends on kind)
    #[arg(long)]
    pub color: Option<String>,
    #[arg(long)]
    pub group: Option<String>,
    /// Tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Icon as an image data URL
    #[arg(long)]
    pub icon: Option<String>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Entry id
    pub id: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub path: Option<String>,
    #[arg(long, value_parser = parse_kind_arg)]
    pub kind: Option<ProjectKind>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub color: Option<String>,
    #[arg(long)]
    pub group: Option<String>,
    /// Remove the entry from its group
    #[arg(long, conflicts_with = "group")]
    pub no_group: bool,
    /// Replace tags (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Icon as an image data URL ("" to clear)
    #[arg(long)]
    pub icon: Option<String>,
}

#[derive(Args)]
pub struct UiArgs {
    /// Compact layout on or off
    #[arg(long)]
    pub compact: Option<bool>,
    /// list or grid
    #[arg(long, value_parser = parse_view_arg)]
    pub view: Option<ViewMode>,
    /// Remember a group filter
    #[arg(long)]
    pub group: Option<String>,
    /// Clear the remembered group filter
    #[arg(long, conflicts_with = "group")]
    pub all_groups: bool,
}

#[derive(Args)]
pub struct SendArgs {
    /// JSON request
    pub request: String,
}

// ---------------------------------------------------------------------------
// Backups
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct BackupCmd {
    #[command(subcommand)]
    pub action: Option<BackupAction>,
}

#[derive(Subcommand)]
pub enum BackupAction {
    /// List backups, newest first (default)
    List,
    /// Back up the current catalog now
    Create,
    /// Delete backups beyond the retention count
    Prune,
    /// Replace the catalog with a backup
    Restore(FileArg),
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective settings (default)
    Show,
    /// Set a value in config.toml
    Set(ConfigSetArgs),
}

#[derive(Args)]
pub struct ConfigSetArgs {
    /// backup_retention or icon_strip_threshold_bytes
    pub key: String,
    pub value: String,
}
