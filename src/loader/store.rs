use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

/// Durable response cache keyed by request URL.
///
/// The sled database is opened on first use. If it cannot be opened the store stays
/// usable but empty: reads miss and writes report `false`.
#[derive(Clone)]
pub struct CacheStore {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    db: Mutex<DbSlot>,
}

enum DbSlot {
    Unopened,
    Open(sled::Db),
    Unavailable,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                path: path.into(),
                db: Mutex::new(DbSlot::Unopened),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        let inner = self.inner.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || inner.get(&key))
            .await
            .unwrap_or_else(|e| {
                log::warn!("cache read task failed: {e}");
                None
            })
    }

    pub async fn put(&self, key: &str, value: &Value) -> bool {
        let bytes = match serde_json::to_vec(value) {
            Ok(b) => b,
            Err(e) => {
                log::warn!("cache write skipped for {key}: {e}");
                return false;
            }
        };
        let inner = self.inner.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || inner.put(&key, bytes))
            .await
            .unwrap_or_else(|e| {
                log::warn!("cache write task failed: {e}");
                false
            })
    }

    pub async fn clear(&self) -> bool {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.clear())
            .await
            .unwrap_or(false)
    }

    pub async fn flush(&self) -> bool {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.flush())
            .await
            .unwrap_or(false)
    }

    /// Number of cached responses, `None` when the store is unavailable.
    pub async fn len(&self) -> Option<usize> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.db().map(|db| db.len()))
            .await
            .unwrap_or(None)
    }
}

impl Inner {
    fn db(&self) -> Option<sled::Db> {
        let mut slot = self.db.lock();
        match &*slot {
            DbSlot::Open(db) => return Some(db.clone()),
            DbSlot::Unavailable => return None,
            DbSlot::Unopened => {}
        }
        match open_cache_dir(&self.path) {
            Ok(db) => {
                log::debug!("cache store opened at {}", self.path.display());
                *slot = DbSlot::Open(db.clone());
                Some(db)
            }
            Err(e) => {
                log::warn!("cache store unavailable, continuing without it: {e}");
                *slot = DbSlot::Unavailable;
                None
            }
        }
    }

    fn get(&self, key: &str) -> Option<Value> {
        let db = self.db()?;
        let raw = match db.get(key.as_bytes()) {
            Ok(Some(v)) => v,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("cache read failed for {key}: {e}");
                return None;
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("ignoring malformed cache entry for {key}: {e}");
                None
            }
        }
    }

    fn put(&self, key: &str, bytes: Vec<u8>) -> bool {
        let Some(db) = self.db() else {
            return false;
        };
        match db.insert(key.as_bytes(), bytes) {
            Ok(_) => {
                log::debug!("cache write {key}");
                true
            }
            Err(e) => {
                log::warn!("cache write failed for {key}: {e}");
                false
            }
        }
    }

    fn clear(&self) -> bool {
        let Some(db) = self.db() else {
            return false;
        };
        if let Err(e) = db.clear() {
            log::warn!("cache clear failed: {e}");
            return false;
        }
        db.flush().is_ok()
    }

    fn flush(&self) -> bool {
        match self.db() {
            Some(db) => db.flush().is_ok(),
            None => false,
        }
    }
}

/// Why sled refused to open a directory.
#[derive(Debug, thiserror::Error)]
enum OpenFailure {
    /// The on-disk layout is unusable; the directory has to go.
    #[error("damaged store: {0}")]
    Damaged(String),
    /// Anything else, e.g. another process holding the lock. The data stays put.
    #[error(transparent)]
    Refused(sled::Error),
}

fn try_open(path: &Path) -> Result<sled::Db, OpenFailure> {
    // sled panics on some damaged layouts (e.g. blobs deleted by hand) instead of
    // returning an error.
    match std::panic::catch_unwind(|| sled::open(path)) {
        Ok(Ok(db)) => Ok(db),
        Ok(Err(e @ (sled::Error::Corruption { .. } | sled::Error::ReportableBug(_)))) => {
            Err(OpenFailure::Damaged(e.to_string()))
        }
        Ok(Err(e)) => Err(OpenFailure::Refused(e)),
        Err(_) => Err(OpenFailure::Damaged("sled panicked while opening".to_string())),
    }
}

/// Opens the sled directory at `path`.
///
/// Only a damaged store is quarantined (renamed to `<name>.corrupt.<unix_ms>` beside it)
/// and recreated once. Lock contention and I/O errors are returned untouched so a
/// concurrent user of the same directory keeps its data.
pub fn open_cache_dir(path: &Path) -> anyhow::Result<sled::Db> {
    std::fs::create_dir_all(path)?;
    match try_open(path) {
        Ok(db) => Ok(db),
        Err(OpenFailure::Refused(e)) => Err(e.into()),
        Err(OpenFailure::Damaged(reason)) => {
            log::warn!("cache store at {} is damaged ({reason})", path.display());
            let moved_to = quarantine(path)?;
            log::warn!("moved damaged cache to {}", moved_to.display());
            std::fs::create_dir_all(path)?;
            try_open(path).map_err(|e| anyhow::anyhow!("recreated cache store unusable: {e}"))
        }
    }
}

fn quarantine(path: &Path) -> anyhow::Result<PathBuf> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("cache");
    let stamp = chrono::Utc::now().timestamp_millis();
    let target = path.with_file_name(format!("{name}.corrupt.{stamp}"));
    std::fs::rename(path, &target).map_err(|e| {
        anyhow::anyhow!("cannot move damaged cache to {}: {e}", target.display())
    })?;
    Ok(target)
}
