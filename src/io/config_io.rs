use std::fs;
use std::path::PathBuf;

use crate::io::catalog_io::atomic_write;
use crate::io::paths::CatalogPaths;
use crate::model::config::ShelfConfig;

/// Error type for config.toml handling
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config.toml: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("could not parse config.toml: {0}")]
    Edit(#[from] toml_edit::TomlError),
    #[error("unknown config key `{0}` (expected backup_retention, icon_strip_threshold_bytes or lock_timeout_ms)")]
    UnknownKey(String),
    #[error("invalid value for `{key}`: expected a non-negative integer, found `{value}`")]
    InvalidValue { key: String, value: String },
}

const KNOWN_KEYS: [&str; 3] = [
    "backup_retention",
    "icon_strip_threshold_bytes",
    "lock_timeout_ms",
];

/// Read config.toml. A missing file yields the defaults.
pub fn read_config(paths: &CatalogPaths) -> Result<ShelfConfig, ConfigError> {
    let path = paths.config_file();
    match fs::read_to_string(&path) {
        Ok(text) => Ok(toml::from_str(&text)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ShelfConfig::default()),
        Err(source) => Err(ConfigError::Read { path, source }),
    }
}

/// Set one key in config.toml, keeping the rest of the file as written.
/// The edited document must still parse as a valid config.
pub fn set_config_value(
    paths: &CatalogPaths,
    key: &str,
    value: &str,
) -> Result<ShelfConfig, ConfigError> {
    if !KNOWN_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey(key.to_string()));
    }
    let number: i64 = value
        .trim()
        .parse()
        .ok()
        .filter(|n| *n >= 0)
        .ok_or_else(|| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })?;

    let path = paths.config_file();
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(source) => return Err(ConfigError::Read { path, source }),
    };

    let mut doc: toml_edit::DocumentMut = text.parse()?;
    doc[key] = toml_edit::value(number);
    let updated = doc.to_string();
    let config: ShelfConfig = toml::from_str(&updated)?;

    fs::create_dir_all(paths.root()).map_err(|source| ConfigError::Write {
        path: paths.root().to_path_buf(),
        source,
    })?;
    atomic_write(&path, updated.as_bytes())
        .map_err(|source| ConfigError::Write { path, source })?;
    Ok(config)
}
