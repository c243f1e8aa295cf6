//! Cross-Process File Lock
//!
//! Serializes read-modify-write access to a file across processes using a
//! `<path>.lock` sidecar. The sidecar is created with an exclusive
//! create-new open, so exactly one contender wins; its existence is the
//! lock. It holds the owner PID and the acquisition time, one per line.
//!
//! There is no heartbeat. A holder that crashes leaves the sidecar behind
//! until [`force_remove_lock`] is called, or until it ages past
//! [`LockOptions::stale_after`] when that is configured.
//!
//! Re-acquiring a path already held by the same task is not detected and
//! waits until the timeout fires.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::LockError;

/// Maximum time to wait for a lock
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Delay between acquisition attempts
pub const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(100);

// == Lock Options ==
#[derive(Debug, Clone, PartialEq)]
pub struct LockOptions {
    /// Total budget for acquiring the lock
    pub timeout: Duration,
    /// Sleep between attempts while the sidecar exists
    pub retry_interval: Duration,
    /// When set, a sidecar whose recorded timestamp is older than this is
    /// removed and acquisition retried. Unparsable sidecars are never stale.
    pub stale_after: Option<Duration>,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            timeout: LOCK_TIMEOUT,
            retry_interval: LOCK_RETRY_INTERVAL,
            stale_after: None,
        }
    }
}

// == Lock Info ==
/// Diagnostic contents of a lock sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockInfo {
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
}

impl LockInfo {
    fn current() -> Self {
        Self {
            pid: std::process::id(),
            acquired_at: Utc::now(),
        }
    }

    /// Time elapsed since the lock was taken; zero if the clock went back.
    pub fn age(&self) -> Duration {
        (Utc::now() - self.acquired_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    fn parse(content: &str) -> Option<Self> {
        let mut lines = content.trim().lines();
        let pid = lines.next()?.trim().parse().ok()?;
        let acquired_at = DateTime::parse_from_rfc3339(lines.next()?.trim())
            .ok()?
            .with_timezone(&Utc);
        Some(Self { pid, acquired_at })
    }

    fn render(&self) -> String {
        format!(
            "{}\n{}\n",
            self.pid,
            self.acquired_at.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}

/// Sidecar path for `path`: the same path with `.lock` appended.
pub fn lock_path_for(path: &Path) -> PathBuf {
    let mut lock_path = path.as_os_str().to_os_string();
    lock_path.push(".lock");
    PathBuf::from(lock_path)
}

// == With File Lock ==
/// Runs `operation` while holding the lock for `path`, using default options.
pub async fn with_file_lock<T, E, F, Fut>(path: impl AsRef<Path>, operation: F) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<LockError>,
{
    with_file_lock_opts(path, &LockOptions::default(), operation).await
}

/// Runs `operation` while holding the lock for `path`.
///
/// The operation is never started if the lock cannot be acquired within
/// `options.timeout`. The lock is released whatever the outcome, and the
/// operation's own result or error is returned unchanged.
pub async fn with_file_lock_opts<T, E, F, Fut>(
    path: impl AsRef<Path>,
    options: &LockOptions,
    operation: F,
) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<LockError>,
{
    let guard = acquire(path.as_ref(), options).await?;
    let result = operation().await;
    guard.release().await;
    result
}

async fn acquire(path: &Path, options: &LockOptions) -> Result<LockGuard, LockError> {
    let lock_path = lock_path_for(path);
    if let Some(dir) = lock_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| LockError::io(dir, e))?;
    }

    let started = Instant::now();
    loop {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .await
        {
            Ok(mut file) => {
                // Guard first so a failed write still removes the sidecar
                let guard = LockGuard::new(lock_path.clone());
                let info = LockInfo::current();
                file.write_all(info.render().as_bytes())
                    .await
                    .map_err(|e| LockError::io(&lock_path, e))?;
                file.flush().await.map_err(|e| LockError::io(&lock_path, e))?;
                debug!(lock = %lock_path.display(), "Acquired file lock");
                return Ok(guard);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if let Some(stale_after) = options.stale_after {
                    if remove_if_stale(&lock_path, stale_after).await {
                        continue;
                    }
                }

                let waited = started.elapsed();
                if waited >= options.timeout {
                    return Err(LockError::Timeout {
                        path: path.to_path_buf(),
                        lock_path,
                        waited,
                    });
                }
                tokio::time::sleep(options.retry_interval.min(options.timeout - waited)).await;
            }
            Err(e) => return Err(LockError::io(&lock_path, e)),
        }
    }
}

async fn remove_if_stale(lock_path: &Path, stale_after: Duration) -> bool {
    let info = match read_lock_record(lock_path).await {
        Some(info) => info,
        None => return false,
    };
    if info.age() <= stale_after {
        return false;
    }

    warn!(
        lock = %lock_path.display(),
        pid = info.pid,
        acquired_at = %info.acquired_at,
        "Removing stale file lock"
    );
    match fs::remove_file(lock_path).await {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => true,
        Err(e) => {
            warn!(lock = %lock_path.display(), error = %e, "Failed to remove stale file lock");
            false
        }
    }
}

async fn read_lock_record(lock_path: &Path) -> Option<LockInfo> {
    let content = fs::read_to_string(lock_path).await.ok()?;
    LockInfo::parse(&content)
}

// == Lock Guard ==
/// Owns a held sidecar. Dropping it without `release` (the wrapped future
/// was cancelled) still removes the sidecar, synchronously.
struct LockGuard {
    lock_path: PathBuf,
    released: bool,
}

impl LockGuard {
    fn new(lock_path: PathBuf) -> Self {
        Self {
            lock_path,
            released: false,
        }
    }

    async fn release(mut self) {
        self.released = true;
        match fs::remove_file(&self.lock_path).await {
            Ok(()) => debug!(lock = %self.lock_path.display(), "Released file lock"),
            Err(e) => warn!(
                lock = %self.lock_path.display(),
                error = %e,
                "Failed to release file lock"
            ),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.lock_path) {
            warn!(
                lock = %self.lock_path.display(),
                error = %e,
                "Failed to release abandoned file lock"
            );
        }
    }
}

// == Inspection ==
/// True while the sidecar for `path` exists.
pub fn is_file_locked(path: impl AsRef<Path>) -> bool {
    lock_path_for(path.as_ref()).exists()
}

/// Owner and acquisition time of the current lock, or None when the file is
/// unlocked or the sidecar cannot be parsed.
pub async fn get_lock_info(path: impl AsRef<Path>) -> Option<LockInfo> {
    read_lock_record(&lock_path_for(path.as_ref())).await
}

/// Deletes the sidecar unconditionally. An already-missing sidecar is not an
/// error. Judging whether the lock is really stale is up to the caller.
pub async fn force_remove_lock(path: impl AsRef<Path>) -> Result<(), LockError> {
    let lock_path = lock_path_for(path.as_ref());
    match fs::remove_file(&lock_path).await {
        Ok(()) => {
            warn!(lock = %lock_path.display(), "Force-removed file lock");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(LockError::io(lock_path, e)),
    }
}
