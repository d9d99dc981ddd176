use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{CmdResult, open_locked, print_json};
use crate::cli::commands::{BackupAction, BackupCmd, ConfigAction, ConfigCmd, FileArg};
use crate::cli::output::{BackupJson, ImportJson, format_import_summary};
use crate::io::config_io;
use crate::io::paths::CatalogPaths;

// ---------------------------------------------------------------------------
// Import / export
// ---------------------------------------------------------------------------

pub fn cmd_import(paths: &CatalogPaths, args: FileArg, json: bool) -> CmdResult {
    let (_lock, mut store) = open_locked(paths)?;
    let summary = store.import_file(Path::new(&args.file))?;
    if json {
        return print_json(&ImportJson::from(&summary));
    }
    print!("{}", format_import_summary(&summary));
    Ok(())
}

#[derive(Serialize)]
struct ExportJson {
    file: String,
    projects: usize,
}

pub fn cmd_export(paths: &CatalogPaths, args: FileArg, json: bool) -> CmdResult {
    let (_lock, store) = open_locked(paths)?;
    let count = store.export_to(Path::new(&args.file))?;
    if json {
        return print_json(&ExportJson {
            file: args.file,
            projects: count,
        });
    }
    println!("exported {} projects to {}", count, args.file);
    Ok(())
}

// ---------------------------------------------------------------------------
// Backups
// ---------------------------------------------------------------------------

pub fn cmd_backup(paths: &CatalogPaths, cmd: BackupCmd, json: bool) -> CmdResult {
    match cmd.action.unwrap_or(BackupAction::List) {
        BackupAction::List => backup_list(paths, json),
        BackupAction::Create => backup_create(paths, json),
        BackupAction::Prune => backup_prune(paths, json),
        BackupAction::Restore(args) => backup_restore(paths, args, json),
    }
}

fn backup_list(paths: &CatalogPaths, json: bool) -> CmdResult {
    let (_lock, store) = open_locked(paths)?;
    let backups = store.list_backups()?;
    if json {
        let items: Vec<BackupJson> = backups.iter().map(BackupJson::from).collect();
        return print_json(&items);
    }
    if backups.is_empty() {
        println!("No backups.");
    }
    for b in &backups {
        println!("{}", b.file_name);
    }
    Ok(())
}

fn backup_create(paths: &CatalogPaths, json: bool) -> CmdResult {
    let (_lock, store) = open_locked(paths)?;
    let path = store
        .create_backup()
        .ok_or("could not write backup (see log for details)")?;
    if json {
        return print_json(&serde_json::json!({ "path": path.display().to_string() }));
    }
    println!("{}", path.display());
    Ok(())
}

fn backup_prune(paths: &CatalogPaths, json: bool) -> CmdResult {
    let (_lock, store) = open_locked(paths)?;
    let removed = store.prune_backups()?;
    if json {
        return print_json(&serde_json::json!({ "removed": removed }));
    }
    println!("removed {} backup(s)", removed);
    Ok(())
}

/// A bare file name that does not exist as given is looked up in the
/// backup directory.
fn resolve_backup(paths: &CatalogPaths, file: &str) -> PathBuf {
    let given = PathBuf::from(file);
    if given.exists() || given.components().count() > 1 {
        return given;
    }
    paths.backup_dir().join(given)
}

fn backup_restore(paths: &CatalogPaths, args: FileArg, json: bool) -> CmdResult {
    let (_lock, mut store) = open_locked(paths)?;
    let source = resolve_backup(paths, &args.file);
    let summary = store.restore_backup(&source)?;
    if json {
        return print_json(&ImportJson::from(&summary));
    }
    println!("restored {}", source.display());
    print!("{}", format_import_summary(&summary));
    Ok(())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

pub fn cmd_config(paths: &CatalogPaths, cmd: ConfigCmd, json: bool) -> CmdResult {
    let config = match cmd.action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => config_io::read_config(paths)?,
        ConfigAction::Set(args) => config_io::set_config_value(paths, &args.key, &args.value)?,
    };
    if json {
        return print_json(&config);
    }
    print!("{}", toml::to_string(&config)?);
    Ok(())
}
