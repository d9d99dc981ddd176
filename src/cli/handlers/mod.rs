mod backup;
mod watch;

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

use chrono::Utc;
use serde::Serialize;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::lock::CatalogLock;
use crate::io::paths::CatalogPaths;
use crate::model::catalog::UiSettingsPatch;
use crate::model::entry::ProjectEntry;
use crate::store::{CatalogStore, ViewEvent, ViewRequest};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let paths = CatalogPaths::resolve(cli.root.as_deref().map(Path::new));

    match cli.command {
        // Read commands
        Commands::List(args) => cmd_list(&paths, args, json),
        Commands::Show(args) => cmd_show(&paths, args, json),
        Commands::Path => cmd_path(&paths, json),

        // Write commands
        Commands::Add(args) => cmd_add(&paths, args, json),
        Commands::Edit(args) => cmd_edit(&paths, args, json),
        Commands::Remove(args) => cmd_remove(&paths, args, json),
        Commands::Open(args) => cmd_open(&paths, args, json),
        Commands::Fav(args) => cmd_fav(&paths, args, json),
        Commands::Ui(args) => cmd_ui(&paths, args, json),
        Commands::Reload => cmd_reload(&paths, json),
        Commands::Send(args) => cmd_send(&paths, args, json),

        // Whole-catalog commands
        Commands::Import(args) => backup::cmd_import(&paths, args, json),
        Commands::Export(args) => backup::cmd_export(&paths, args, json),
        Commands::Backup(cmd) => backup::cmd_backup(&paths, cmd, json),
        Commands::Config(cmd) => backup::cmd_config(&paths, cmd, json),

        Commands::Watch => watch::cmd_watch(&paths, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open_store(paths: &CatalogPaths) -> Result<CatalogStore, Box<dyn std::error::Error>> {
    let config = config_io::read_config(paths)?;
    Ok(CatalogStore::open(paths.clone(), config)?)
}

/// Open the store with the cross-process lock held. Keep the lock alive for
/// as long as the store may write. The wait for the lock comes from
/// `lock_timeout_ms` in config.toml.
fn open_locked(
    paths: &CatalogPaths,
) -> Result<(CatalogLock, CatalogStore), Box<dyn std::error::Error>> {
    let config = config_io::read_config(paths)?;
    let lock = CatalogLock::for_catalog(paths, &config)?;
    let store = CatalogStore::open(paths.clone(), config)?;
    Ok((lock, store))
}

fn not_found(id: &str) -> String {
    format!("project not found: {}", id)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn warn_if_icon_cleared(requested: Option<&str>, entry: &ProjectEntry) {
    if let Some(icon) = requested
        && !icon.is_empty()
        && entry.icon.is_empty()
    {
        eprintln!("warning: icon is not a valid image data URL, cleared");
    }
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(paths: &CatalogPaths, args: ListArgs, json: bool) -> CmdResult {
    let (_lock, store) = open_locked(paths)?;
    let state = store.state();

    let group = if args.all {
        None
    } else {
        args.group
            .clone()
            .or_else(|| state.ui_settings.selected_group.clone())
    };
    let entries: Vec<&ProjectEntry> = state
        .projects
        .iter()
        .filter(|e| group.as_deref().is_none_or(|g| e.group_label() == g))
        .filter(|e| !args.favorites || e.is_favorite)
        .filter(|e| args.kind.is_none_or(|k| e.kind == k))
        .collect();

    if json {
        return print_json(&entries);
    }
    print!("{}", format_listing(state, &entries, Utc::now()));
    Ok(())
}

fn cmd_show(paths: &CatalogPaths, args: IdArg, json: bool) -> CmdResult {
    let (_lock, store) = open_locked(paths)?;
    let entry = store.get(&args.id).ok_or_else(|| not_found(&args.id))?;
    if json {
        return print_json(entry);
    }
    print!("{}", format_entry_detail(entry, Utc::now()));
    Ok(())
}

#[derive(Serialize)]
struct PathsJson {
    root: String,
    catalog: String,
    backups: String,
    config: String,
}

fn cmd_path(paths: &CatalogPaths, json: bool) -> CmdResult {
    if json {
        return print_json(&PathsJson {
            root: paths.root().display().to_string(),
            catalog: paths.catalog_file().display().to_string(),
            backups: paths.backup_dir().display().to_string(),
            config: paths.config_file().display().to_string(),
        });
    }
    println!("{}", paths.catalog_file().display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(paths: &CatalogPaths, args: AddArgs, json: bool) -> CmdResult {
    let (_lock, mut store) = open_locked(paths)?;

    let mut entry = ProjectEntry::new(args.name, args.path, args.kind);
    if let Some(description) = args.description {
        entry.description = description;
    }
    if let Some(color) = args.color {
        entry.color = color;
    }
    entry.group = args.group;
    entry.tags = args.tags;
    if let Some(icon) = &args.icon {
        entry.icon = icon.clone();
    }

    let added = store.add_project(entry)?;
    warn_if_icon_cleared(args.icon.as_deref(), &added);
    if json {
        return print_json(&added);
    }
    println!("{}", added.id);
    Ok(())
}

fn cmd_edit(paths: &CatalogPaths, args: EditArgs, json: bool) -> CmdResult {
    let (_lock, mut store) = open_locked(paths)?;
    let mut entry = store
        .get(&args.id)
        .cloned()
        .ok_or_else(|| not_found(&args.id))?;

    if let Some(name) = args.name {
        entry.name = name;
    }
    if let Some(path) = args.path {
        entry.path = path;
    }
    if let Some(kind) = args.kind {
        // A color still at the old kind's default follows the new kind
        if entry.color == entry.kind.default_color() {
            entry.color = kind.default_color().to_string();
        }
        entry.kind = kind;
    }
    if let Some(description) = args.description {
        entry.description = description;
    }
    if let Some(color) = args.color {
        entry.color = color;
    }
    if args.no_group {
        entry.group = None;
    } else if let Some(group) = args.group {
        entry.group = Some(group);
    }
    if !args.tags.is_empty() {
        entry.tags = args.tags;
    }
    if let Some(icon) = &args.icon {
        entry.icon = icon.clone();
    }

    let saved = store.upsert_project(entry)?;
    warn_if_icon_cleared(args.icon.as_deref(), &saved);
    if json {
        return print_json(&saved);
    }
    println!("updated {}", saved.id);
    Ok(())
}

fn cmd_remove(paths: &CatalogPaths, args: IdArg, json: bool) -> CmdResult {
    let (_lock, mut store) = open_locked(paths)?;
    let removed = store
        .delete_project(&args.id)?
        .ok_or_else(|| not_found(&args.id))?;
    if json {
        return print_json(&removed);
    }
    println!("removed {} ({})", removed.id, removed.name);
    Ok(())
}

fn cmd_open(paths: &CatalogPaths, args: IdArg, json: bool) -> CmdResult {
    let (_lock, mut store) = open_locked(paths)?;
    let entry = store
        .record_access(&args.id)?
        .ok_or_else(|| not_found(&args.id))?;
    if json {
        return print_json(&entry);
    }
    println!("{}", entry.path);
    Ok(())
}

#[derive(Serialize)]
struct FavoriteJson<'a> {
    id: &'a str,
    favorite: bool,
}

fn cmd_fav(paths: &CatalogPaths, args: IdArg, json: bool) -> CmdResult {
    let (_lock, mut store) = open_locked(paths)?;
    let on = store
        .toggle_favorite(&args.id)?
        .ok_or_else(|| not_found(&args.id))?;
    if json {
        return print_json(&FavoriteJson {
            id: &args.id,
            favorite: on,
        });
    }
    println!("{}: favorite {}", args.id, if on { "on" } else { "off" });
    Ok(())
}

fn cmd_ui(paths: &CatalogPaths, args: UiArgs, json: bool) -> CmdResult {
    let (_lock, mut store) = open_locked(paths)?;
    let patch = UiSettingsPatch {
        compact_mode: args.compact,
        view_mode: args.view,
        selected_group: if args.all_groups {
            Some(None)
        } else {
            args.group.map(Some)
        },
    };
    if !patch.is_empty() {
        store.update_ui_settings(&patch)?;
    }

    let ui = &store.state().ui_settings;
    if json {
        return print_json(ui);
    }
    println!("compact: {}", if ui.compact_mode { "on" } else { "off" });
    println!("view:    {}", ui.view_mode);
    println!("group:   {}", ui.selected_group.as_deref().unwrap_or("(all)"));
    Ok(())
}

fn cmd_reload(paths: &CatalogPaths, json: bool) -> CmdResult {
    let (_lock, mut store) = open_locked(paths)?;
    store.reload()?;
    if json {
        return print_json(store.state());
    }
    println!("reloaded {} projects", store.state().projects.len());
    Ok(())
}

/// Apply one view request. In JSON mode every notification the request
/// causes is printed as a `stateChanged` event line.
fn cmd_send(paths: &CatalogPaths, args: SendArgs, json: bool) -> CmdResult {
    let request = ViewRequest::from_json(&args.request)
        .map_err(|e| format!("invalid request: {}", e))?;
    let (_lock, mut store) = open_locked(paths)?;

    let changes = Rc::new(Cell::new(0usize));
    let counter = changes.clone();
    store.subscribe(move |_| {
        counter.set(counter.get() + 1);
        if json && let Ok(line) = serde_json::to_string(&ViewEvent::StateChanged) {
            println!("{}", line);
        }
    });

    store.handle(request)?;
    if !json {
        if changes.get() > 0 {
            println!("ok");
        } else {
            println!("no change");
        }
    }
    Ok(())
}
