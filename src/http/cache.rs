use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

/// Errors raised by the response cache backends
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backend-level failures (lock poisoning, corrupt rows)
    #[error("cache backend error: {0}")]
    Backend(String),

    /// SQLite errors from the on-disk store
    #[error("cache sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Entry metadata encoding errors
    #[error("cache encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Filesystem errors while preparing the store location
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A response retained by the cache, with the validators needed for
/// conditional revalidation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: DateTime<Utc>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl StoredResponse {
    /// Returns how long ago the entry was stored, saturating at zero
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.stored_at).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Storage seam for cached responses.
///
/// Entries older than the store's TTL behave as misses and are deleted on
/// sight; expired rows are additionally swept at most once per revalidate
/// interval.
#[cfg_attr(test, automock)]
pub trait CacheStore: Send + Sync {
    /// Look up a non-expired entry for the given request key
    fn get(&self, key: &str) -> Result<Option<StoredResponse>, CacheError>;

    /// Insert or replace the entry for the given request key
    fn put(&self, key: &str, response: &StoredResponse) -> Result<(), CacheError>;

    /// Drop the entry for the given request key, if any
    fn remove(&self, key: &str) -> Result<(), CacheError>;
}

/// Tracks when the last expiry sweep ran so backends only pay for it once
/// per revalidate interval
struct SweepClock {
    last_sweep: Mutex<Instant>,
    interval: Duration,
}

impl SweepClock {
    fn new(interval: Duration) -> Self {
        Self {
            last_sweep: Mutex::new(Instant::now()),
            interval,
        }
    }

    /// Returns true when a sweep is due, resetting the clock
    fn due(&self) -> Result<bool, CacheError> {
        let mut last = self
            .last_sweep
            .lock()
            .map_err(|_| CacheError::Backend("sweep clock lock poisoned".into()))?;
        if last.elapsed() >= self.interval {
            *last = Instant::now();
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

/// In-process response cache backed by a hash map
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoredResponse>>,
    ttl: Duration,
    sweep: SweepClock,
}

impl MemoryStore {
    /// Creates an empty in-memory store with the given entry TTL and sweep
    /// interval
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            sweep: SweepClock::new(sweep_interval),
        }
    }

    fn write_entries(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, StoredResponse>>, CacheError> {
        self.entries
            .write()
            .map_err(|_| CacheError::Backend("memory store lock poisoned".into()))
    }

    fn sweep_expired(&self) -> Result<(), CacheError> {
        let now = Utc::now();
        let mut entries = self.write_entries()?;
        let before = entries.len();
        entries.retain(|_, entry| entry.age(now) < self.ttl);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "swept expired cache entries");
        }
        Ok(())
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<StoredResponse>, CacheError> {
        if self.sweep.due()? {
            self.sweep_expired()?;
        }

        let mut entries = self.write_entries()?;
        match entries.get(key) {
            Some(entry) if entry.age(Utc::now()) < self.ttl => Ok(Some(entry.clone())),
            Some(_) => {
                // Expired entries are misses
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, response: &StoredResponse) -> Result<(), CacheError> {
        self.write_entries()?.insert(key.to_owned(), response.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.write_entries()?.remove(key);
        Ok(())
    }
}

const CACHE_SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS http_cache (
    key TEXT PRIMARY KEY,
    status INTEGER NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    stored_at INTEGER NOT NULL,
    etag TEXT,
    last_modified TEXT
);
";

/// On-disk response cache backed by a single-file SQLite database
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: PathBuf,
    ttl: Duration,
    sweep: SweepClock,
}

impl SqliteStore {
    /// Opens (creating if needed) the store at `path` with the given entry
    /// TTL and sweep interval
    pub fn open<P: AsRef<Path>>(
        path: P,
        ttl: Duration,
        sweep_interval: Duration,
    ) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch(CACHE_SCHEMA_SQL)?;

        debug!(path = %path.display(), "opened sqlite response cache");
        Ok(Self {
            conn: Mutex::new(conn),
            path,
            ttl,
            sweep: SweepClock::new(sweep_interval),
        })
    }

    /// Location of the backing database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, CacheError> {
        self.conn
            .lock()
            .map_err(|_| CacheError::Backend("sqlite store lock poisoned".into()))
    }

    fn sweep_expired(&self) -> Result<(), CacheError> {
        let cutoff = Utc::now().timestamp() - self.ttl.as_secs() as i64;
        let conn = self.lock_conn()?;
        let removed = conn.execute("DELETE FROM http_cache WHERE stored_at < ?1", params![cutoff])?;
        if removed > 0 {
            debug!(removed, "swept expired cache entries");
        }
        Ok(())
    }

    fn row_to_entry(
        status: u16,
        headers_json: String,
        body: Vec<u8>,
        stored_at: i64,
        etag: Option<String>,
        last_modified: Option<String>,
    ) -> Result<StoredResponse, CacheError> {
        let stored_at = Utc
            .timestamp_opt(stored_at, 0)
            .single()
            .ok_or_else(|| CacheError::Backend("corrupt stored_at column".into()))?;
        let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
        Ok(StoredResponse {
            status,
            headers,
            body,
            stored_at,
            etag,
            last_modified,
        })
    }
}

impl CacheStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<StoredResponse>, CacheError> {
        if self.sweep.due()? {
            self.sweep_expired()?;
        }

        let row = {
            let conn = self.lock_conn()?;
            conn.query_row(
                "SELECT status, headers, body, stored_at, etag, last_modified
                 FROM http_cache WHERE key = ?1",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, u16>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            )
            .optional()?
        };

        let Some((status, headers_json, body, stored_at, etag, last_modified)) = row else {
            return Ok(None);
        };

        let entry =
            Self::row_to_entry(status, headers_json, body, stored_at, etag, last_modified)?;
        if entry.age(Utc::now()) >= self.ttl {
            // Expired entries are misses
            self.remove(key)?;
            return Ok(None);
        }
        Ok(Some(entry))
    }

    fn put(&self, key: &str, response: &StoredResponse) -> Result<(), CacheError> {
        let headers_json = serde_json::to_string(&response.headers)?;
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO http_cache
             (key, status, headers, body, stored_at, etag, last_modified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                key,
                response.status,
                headers_json,
                response.body,
                response.stored_at.timestamp(),
                response.etag,
                response.last_modified,
            ],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM http_cache WHERE key = ?1", params![key])?;
        Ok(())
    }
}
