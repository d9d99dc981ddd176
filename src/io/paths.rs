use std::path::{Path, PathBuf};

/// File name of the catalog inside the storage root.
pub const CATALOG_FILE: &str = "projects.json";
/// Directory (inside the storage root) that holds backups.
pub const BACKUP_DIR: &str = "backups";
pub const CONFIG_FILE: &str = "config.toml";
pub const LOCK_FILE: &str = ".lock";

/// Every on-disk location the catalog uses, derived from one storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPaths {
    root: PathBuf,
}

impl CatalogPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CatalogPaths { root: root.into() }
    }

    /// Resolve the storage root: explicit override, then `SHELF_HOME`,
    /// then `$XDG_CONFIG_HOME/shelf`, then `~/.config/shelf`.
    pub fn resolve(override_root: Option<&Path>) -> Self {
        if let Some(root) = override_root {
            return Self::new(root);
        }
        if let Ok(home) = std::env::var("SHELF_HOME")
            && !home.is_empty()
        {
            return Self::new(home);
        }
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .ok()
            .filter(|d| !d.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| home_dir().join(".config"));
        Self::new(config_dir.join("shelf"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn catalog_file(&self) -> PathBuf {
        self.root.join(CATALOG_FILE)
    }

    /// Where an unparsable catalog is preserved before it is replaced.
    pub fn corrupt_copy(&self) -> PathBuf {
        self.root.join(format!("{}.bak", CATALOG_FILE))
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.root.join(BACKUP_DIR)
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn lock_file(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }
}

/// Get the user's home directory
pub fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/"))
}

/// Abbreviate a path by replacing $HOME with ~
pub fn abbreviate_path(path: &str) -> String {
    if let Ok(home) = std::env::var("HOME")
        && !home.is_empty()
        && let Some(rest) = path.strip_prefix(&home)
        && (rest.is_empty() || rest.starts_with('/'))
    {
        return format!("~{}", rest);
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_root_wins() {
        let paths = CatalogPaths::resolve(Some(Path::new("/tmp/shelf-root")));
        assert_eq!(paths.root(), Path::new("/tmp/shelf-root"));
        assert_eq!(
            paths.catalog_file(),
            PathBuf::from("/tmp/shelf-root/projects.json")
        );
        assert_eq!(paths.backup_dir(), PathBuf::from("/tmp/shelf-root/backups"));
        assert_eq!(
            paths.corrupt_copy(),
            PathBuf::from("/tmp/shelf-root/projects.json.bak")
        );
        assert_eq!(paths.lock_file(), PathBuf::from("/tmp/shelf-root/.lock"));
    }

    #[test]
    fn abbreviate_home() {
        let home = std::env::var("HOME").unwrap_or_default();
        if home.is_empty() || home == "/" {
            return;
        }
        let p = format!("{}/code/shelf", home);
        assert_eq!(abbreviate_path(&p), "~/code/shelf");
        assert_eq!(abbreviate_path("/elsewhere"), "/elsewhere");
    }
}
