use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings from config.toml in the storage root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelfConfig {
    /// Number of backup files kept after each backup. Minimum 1.
    #[serde(default = "default_backup_retention")]
    pub backup_retention: usize,
    /// Import documents larger than this have their icon payloads stripped
    /// before parsing.
    #[serde(default = "default_icon_strip_threshold")]
    pub icon_strip_threshold_bytes: usize,
    /// How long a command waits for another shelf process to release the
    /// catalog lock. Zero means a single attempt.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for ShelfConfig {
    fn default() -> Self {
        ShelfConfig {
            backup_retention: default_backup_retention(),
            icon_strip_threshold_bytes: default_icon_strip_threshold(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl ShelfConfig {
    pub fn retention(&self) -> usize {
        self.backup_retention.max(1)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

pub const DEFAULT_BACKUP_RETENTION: usize = 5;

fn default_backup_retention() -> usize {
    DEFAULT_BACKUP_RETENTION
}

/// 5 MiB
fn default_icon_strip_threshold() -> usize {
    5 * 1024 * 1024
}

fn default_lock_timeout_ms() -> u64 {
    5000
}
