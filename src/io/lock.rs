use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::io::paths::CatalogPaths;
use crate::model::config::ShelfConfig;

/// Advisory lock serializing catalog writes between shelf processes.
///
/// An exclusive flock on `<root>/.lock`, held for the whole apply, persist,
/// notify sequence of a command and for the full length of an import. The
/// holder writes its pid into the file so a waiting process can say who it
/// is waiting for.
#[derive(Debug)]
pub struct CatalogLock {
    _file: File,
    path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file at {path}: {source}")]
    CreateError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{}", timeout_message(.path, .holder, .waited))]
    Timeout {
        path: PathBuf,
        holder: Option<u32>,
        waited: Duration,
    },
}

fn timeout_message(path: &Path, holder: &Option<u32>, waited: &Duration) -> String {
    let who = match holder {
        Some(pid) => format!("shelf process {}", pid),
        None => "another shelf process".to_string(),
    };
    format!(
        "catalog is locked by {} ({}); gave up after {} ms (raise lock_timeout_ms to wait longer)",
        who,
        path.display(),
        waited.as_millis()
    )
}

/// Pause between attempts while the lock is held elsewhere.
const RETRY_INTERVAL: Duration = Duration::from_millis(10);

impl CatalogLock {
    /// Lock the catalog under `paths`, waiting as long as `config` allows.
    pub fn for_catalog(paths: &CatalogPaths, config: &ShelfConfig) -> Result<Self, LockError> {
        Self::acquire(&paths.lock_file(), config.lock_timeout())
    }

    /// Acquire the lock file at `lock_path`, waiting up to `timeout`.
    /// A zero timeout makes exactly one attempt.
    pub fn acquire(lock_path: &Path, timeout: Duration) -> Result<Self, LockError> {
        let create_error = |source| LockError::CreateError {
            path: lock_path.to_path_buf(),
            source,
        };
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(create_error)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(lock_path)
            .map_err(create_error)?;

        let start = Instant::now();
        loop {
            if try_lock(&file).is_ok() {
                record_holder(&mut file);
                debug!(path = %lock_path.display(), "catalog lock acquired");
                return Ok(CatalogLock {
                    _file: file,
                    path: lock_path.to_path_buf(),
                });
            }
            if start.elapsed() >= timeout {
                return Err(LockError::Timeout {
                    path: lock_path.to_path_buf(),
                    holder: read_holder(lock_path),
                    waited: timeout,
                });
            }
            std::thread::sleep(RETRY_INTERVAL);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Overwrite the lock file with our pid. Best-effort: the flock is what
/// excludes other writers, the pid only improves the timeout message.
fn record_holder(file: &mut File) {
    let written = file
        .set_len(0)
        .and_then(|()| file.write_all(std::process::id().to_string().as_bytes()))
        .and_then(|()| file.flush());
    if let Err(e) = written {
        debug!(error = %e, "could not record lock holder");
    }
}

fn read_holder(lock_path: &Path) -> Option<u32> {
    fs::read_to_string(lock_path).ok()?.trim().parse().ok()
}

/// Try to acquire an exclusive flock on the file (non-blocking)
#[cfg(unix)]
fn try_lock(file: &File) -> Result<(), std::io::Error> {
    use std::os::unix::io::AsRawFd;
    let fd = file.as_raw_fd();
    let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<(), std::io::Error> {
    Ok(())
}
