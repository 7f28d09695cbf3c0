//! Versioned key/value persistence with migration and capacity management.
//!
//! [`DurableStore`] serializes whole documents as JSON and hands them to a
//! [`StoreBackend`]. Writes are whole-value replacements; the last writer of
//! a key wins.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::db::Database;
use crate::config::StorageConfig;
use crate::models::session::SessionKind;
use crate::{AppError, Result};

/// Boxed future returned by [`StoreBackend`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// One durable collection per concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// Exam session history.
    ExamSessions,
    /// Quiz session history.
    QuizSessions,
    /// Flashcard decks.
    Decks,
    /// Device preferences.
    Preferences,
}

impl StoreKey {
    /// Storage key string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExamSessions => "exam_sessions",
            Self::QuizSessions => "quiz_sessions",
            Self::Decks => "decks",
            Self::Preferences => "preferences",
        }
    }

    /// Key holding the history for `kind`.
    #[must_use]
    pub fn for_sessions(kind: SessionKind) -> Self {
        match kind {
            SessionKind::Exam => Self::ExamSessions,
            SessionKind::Quiz => Self::QuizSessions,
        }
    }
}

/// Raw stored value with its schema version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    /// Schema version the payload was written with.
    pub schema_version: u32,
    /// JSON document.
    pub payload: String,
}

impl StoredRecord {
    /// Bytes charged against the quota for storing this record under `key`.
    #[must_use]
    pub fn charged_bytes(&self, key: &str) -> u64 {
        (key.len() + self.payload.len()) as u64
    }
}

/// Raw storage underneath [`DurableStore`].
///
/// Implementations enforce their own hard quota and report it as
/// [`AppError::QuotaExceeded`].
pub trait StoreBackend: Send + Sync {
    /// Read the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the read fails.
    fn read<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<StoredRecord>>;

    /// Replace the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::QuotaExceeded` if the write would exceed the hard
    /// quota, or `AppError::Db` if the write fails.
    fn write<'a>(&'a self, key: &'a str, record: StoredRecord) -> StoreFuture<'a, ()>;

    /// Delete `key`; returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool>;

    /// Bytes used by every key except `key`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    fn usage_excluding<'a>(&'a self, key: &'a str) -> StoreFuture<'a, u64>;
}

/// A document type persisted under a [`StoreKey`].
pub trait Versioned: Serialize + DeserializeOwned + Default {
    /// Version written by this build.
    const SCHEMA_VERSION: u32;

    /// Upgrade a document written at `from_version` to the current shape.
    ///
    /// Missing fields are filled with safe defaults; never fails.
    #[must_use]
    fn migrate(from_version: u32, key: StoreKey, value: serde_json::Value) -> serde_json::Value {
        let _ = (from_version, key);
        value
    }
}

/// A document holding timestamped records that can be capped.
pub trait Collection: Versioned {
    /// Keep the `max_entries` most recently created records; returns how
    /// many were dropped.
    fn retain_newest(&mut self, max_entries: usize) -> usize;
}

/// Sort newest first by `created` and truncate to `max_entries`.
pub fn keep_newest<T>(
    items: &mut Vec<T>,
    max_entries: usize,
    created: impl Fn(&T) -> DateTime<Utc>,
) -> usize {
    if items.len() <= max_entries {
        return 0;
    }
    items.sort_by_key(|item| std::cmp::Reverse(created(item)));
    let dropped = items.len() - max_entries;
    items.truncate(max_entries);
    dropped
}

/// Versioned persistence facade shared by every stateful component.
#[derive(Clone)]
pub struct DurableStore {
    backend: Arc<dyn StoreBackend>,
    soft_warning_bytes: u64,
}

impl DurableStore {
    /// Wrap an arbitrary backend.
    #[must_use]
    pub fn new(backend: Arc<dyn StoreBackend>, storage: &StorageConfig) -> Self {
        Self {
            backend,
            soft_warning_bytes: storage.soft_warning_bytes,
        }
    }

    /// Store backed by the `kv_store` table.
    #[must_use]
    pub fn sqlite(db: Arc<Database>, storage: &StorageConfig) -> Self {
        Self::new(
            Arc::new(SqliteBackend::new(db, storage.hard_quota_bytes)),
            storage,
        )
    }

    /// Store backed by process memory.
    #[must_use]
    pub fn in_memory(storage: &StorageConfig) -> Self {
        Self::new(
            Arc::new(MemoryBackend::with_quota(storage.hard_quota_bytes)),
            storage,
        )
    }

    /// Load the document under `key`, migrating older versions.
    ///
    /// A missing key yields `T::default()`.
    ///
    /// A document that cannot be decoded, even after migration, is logged and
    /// replaced by `T::default()`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the read fails.
    pub async fn load<T: Versioned>(&self, key: StoreKey) -> Result<T> {
        let Some(record) = self.backend.read(key.as_str()).await? else {
            debug!(key = key.as_str(), "no stored document, using default");
            return Ok(T::default());
        };

        match decode(key, &record) {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(key = key.as_str(), %err, "stored document unreadable, using default");
                Ok(T::default())
            }
        }
    }

    /// Serialize and write `value` under `key`.
    ///
    /// Projected usage above the soft threshold is logged; the write is still
    /// attempted and the backend's hard quota decides.
    ///
    /// # Errors
    ///
    /// Returns `AppError::QuotaExceeded` if the backend refuses the write,
    /// `AppError::Serialization` if encoding fails, or `AppError::Db`.
    pub async fn save<T: Versioned>(&self, key: StoreKey, value: &T) -> Result<()> {
        let record = StoredRecord {
            schema_version: T::SCHEMA_VERSION,
            payload: serde_json::to_string(value)?,
        };

        let others = self.backend.usage_excluding(key.as_str()).await?;
        let projected = others + record.charged_bytes(key.as_str());
        if projected > self.soft_warning_bytes {
            warn!(
                key = key.as_str(),
                bytes = projected,
                threshold = self.soft_warning_bytes,
                "storage usage above soft warning threshold"
            );
        }

        self.backend.write(key.as_str(), record).await?;
        debug!(key = key.as_str(), bytes = projected, "document saved");
        Ok(())
    }

    /// Delete the document under `key`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn remove(&self, key: StoreKey) -> Result<bool> {
        self.backend.remove(key.as_str()).await
    }

    /// Keep only the `max_entries` most recently created records of the
    /// collection under `key`; returns how many were dropped.
    ///
    /// # Errors
    ///
    /// Propagates load and save failures.
    pub async fn evict_oldest<T: Collection>(
        &self,
        key: StoreKey,
        max_entries: usize,
    ) -> Result<usize> {
        let mut collection: T = self.load(key).await?;
        let dropped = collection.retain_newest(max_entries);
        if dropped > 0 {
            self.save(key, &collection).await?;
            info!(key = key.as_str(), dropped, max_entries, "evicted oldest records");
        }
        Ok(dropped)
    }
}

/// Parse and, when older than `T`, migrate a stored record.
fn decode<T: Versioned>(key: StoreKey, record: &StoredRecord) -> Result<T> {
    let mut value: serde_json::Value = serde_json::from_str(&record.payload)?;
    if record.schema_version < T::SCHEMA_VERSION {
        info!(
            key = key.as_str(),
            from = record.schema_version,
            to = T::SCHEMA_VERSION,
            "migrating stored document"
        );
        value = T::migrate(record.schema_version, key, value);
    } else if record.schema_version > T::SCHEMA_VERSION {
        warn!(
            key = key.as_str(),
            stored = record.schema_version,
            supported = T::SCHEMA_VERSION,
            "stored document is newer than this build"
        );
    }

    Ok(serde_json::from_value(value)?)
}

/// [`StoreBackend`] over the `kv_store` table.
#[derive(Clone)]
pub struct SqliteBackend {
    db: Arc<Database>,
    hard_quota_bytes: u64,
}

impl SqliteBackend {
    /// Create a backend with the given hard quota.
    #[must_use]
    pub fn new(db: Arc<Database>, hard_quota_bytes: u64) -> Self {
        Self {
            db,
            hard_quota_bytes,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    schema_version: i64,
    payload: String,
}

impl RecordRow {
    fn into_record(self) -> Result<StoredRecord> {
        let schema_version = u32::try_from(self.schema_version)
            .map_err(|_| AppError::Db(format!("invalid schema_version: {}", self.schema_version)))?;
        Ok(StoredRecord {
            schema_version,
            payload: self.payload,
        })
    }
}

fn to_u64(bytes: i64) -> u64 {
    u64::try_from(bytes).unwrap_or_default()
}

impl StoreBackend for SqliteBackend {
    fn read<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<StoredRecord>> {
        Box::pin(async move {
            let row: Option<RecordRow> =
                sqlx::query_as("SELECT schema_version, payload FROM kv_store WHERE key = ?1")
                    .bind(key)
                    .fetch_optional(self.db.as_ref())
                    .await?;
            row.map(RecordRow::into_record).transpose()
        })
    }

    fn write<'a>(&'a self, key: &'a str, record: StoredRecord) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let charged = record.charged_bytes(key);
            let mut tx = self.db.begin().await?;

            let (others,): (i64,) = sqlx::query_as(
                "SELECT COALESCE(SUM(byte_len), 0) FROM kv_store WHERE key != ?1",
            )
            .bind(key)
            .fetch_one(&mut *tx)
            .await?;

            let projected = to_u64(others) + charged;
            if projected > self.hard_quota_bytes {
                return Err(AppError::QuotaExceeded(format!(
                    "writing {key} needs {projected} bytes, quota is {}",
                    self.hard_quota_bytes
                )));
            }

            let byte_len = i64::try_from(charged)
                .map_err(|_| AppError::Db("record too large".into()))?;
            sqlx::query(
                "INSERT INTO kv_store (key, schema_version, payload, byte_len, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(key) DO UPDATE SET
                    schema_version = excluded.schema_version,
                    payload = excluded.payload,
                    byte_len = excluded.byte_len,
                    updated_at = excluded.updated_at",
            )
            .bind(key)
            .bind(i64::from(record.schema_version))
            .bind(&record.payload)
            .bind(byte_len)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(())
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM kv_store WHERE key = ?1")
                .bind(key)
                .execute(self.db.as_ref())
                .await?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn usage_excluding<'a>(&'a self, key: &'a str) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            let (bytes,): (i64,) = sqlx::query_as(
                "SELECT COALESCE(SUM(byte_len), 0) FROM kv_store WHERE key != ?1",
            )
            .bind(key)
            .fetch_one(self.db.as_ref())
            .await?;
            Ok(to_u64(bytes))
        })
    }
}

/// In-process [`StoreBackend`], used as a test double and for throwaway runs.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, StoredRecord>>,
    hard_quota_bytes: Option<u64>,
}

impl MemoryBackend {
    /// Backend without a quota.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that refuses writes beyond `hard_quota_bytes`.
    #[must_use]
    pub fn with_quota(hard_quota_bytes: u64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            hard_quota_bytes: Some(hard_quota_bytes),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, StoredRecord>>> {
        self.entries
            .lock()
            .map_err(|_| AppError::Db("memory store lock poisoned".into()))
    }

    fn usage_of(entries: &HashMap<String, StoredRecord>, excluded: &str) -> u64 {
        entries
            .iter()
            .filter(|(key, _)| key.as_str() != excluded)
            .map(|(key, record)| record.charged_bytes(key))
            .sum()
    }
}

impl StoreBackend for MemoryBackend {
    fn read<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<StoredRecord>> {
        let result = self.lock().map(|entries| entries.get(key).cloned());
        Box::pin(async move { result })
    }

    fn write<'a>(&'a self, key: &'a str, record: StoredRecord) -> StoreFuture<'a, ()> {
        let result = self.lock().and_then(|mut entries| {
            if let Some(quota) = self.hard_quota_bytes {
                let projected = Self::usage_of(&entries, key) + record.charged_bytes(key);
                if projected > quota {
                    return Err(AppError::QuotaExceeded(format!(
                        "writing {key} needs {projected} bytes, quota is {quota}"
                    )));
                }
            }
            entries.insert(key.to_owned(), record);
            Ok(())
        });
        Box::pin(async move { result })
    }

    fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool> {
        let result = self.lock().map(|mut entries| entries.remove(key).is_some());
        Box::pin(async move { result })
    }

    fn usage_excluding<'a>(&'a self, key: &'a str) -> StoreFuture<'a, u64> {
        let result = self.lock().map(|entries| Self::usage_of(&entries, key));
        Box::pin(async move { result })
    }
}
