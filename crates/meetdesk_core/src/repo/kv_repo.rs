//! Namespaced key-value repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Store one whole-collection JSON blob per `{workspace}:{entity}` key.
//! - Version every key so split read/write callers can detect conflicts.
//! - Serialize read-modify-write sequences through `atomic`.
//! - Hand out monotonic per-prefix code numbers.
//!
//! # Invariants
//! - A key's version starts at 1 and grows by exactly 1 per write.
//! - `atomic` never nests: inside an open transaction it just runs the closure,
//!   and commit (with it, durability of already-emitted events) is up to the
//!   transaction owner.
//! - Corrupt blobs surface as `RepoError::Serialization`, never as defaults.

use crate::db::DbError;
use crate::model::kind::EntityKind;
use crate::model::workspace::WorkspaceId;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Namespace used for process-wide metadata keys.
pub const META_NAMESPACE: &str = "__app";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for key-value persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Stored blob could not be (de)serialized.
    Serialization {
        key: String,
        source: serde_json::Error,
    },
    /// Optimistic write lost against a concurrent writer.
    Conflict {
        key: String,
        expected: Option<u64>,
        actual: Option<u64>,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization { key, source } => {
                write!(f, "invalid stored value for `{key}`: {source}")
            }
            Self::Conflict {
                key,
                expected,
                actual,
            } => write!(
                f,
                "write conflict on `{key}`: expected version {}, found {}",
                display_version(*expected),
                display_version(*actual)
            ),
            Self::InvalidData(message) => write!(f, "invalid store data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization { source, .. } => Some(source),
            Self::Conflict { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

fn display_version(version: Option<u64>) -> String {
    version.map_or_else(|| "none".to_string(), |value| value.to_string())
}

/// Storage key for one persisted blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// Workspace-scoped collection or singleton.
    Entity {
        workspace: WorkspaceId,
        kind: EntityKind,
    },
    /// Process-wide metadata, outside every workspace.
    Meta(&'static str),
}

impl StoreKey {
    pub fn entity(workspace: &WorkspaceId, kind: EntityKind) -> Self {
        Self::Entity {
            workspace: workspace.clone(),
            kind,
        }
    }
}

impl Display for StoreKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entity { workspace, kind } => write!(f, "{workspace}:{kind}"),
            Self::Meta(name) => write!(f, "{META_NAMESPACE}:{name}"),
        }
    }
}

/// Raw stored blob with its write version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    pub value: String,
    pub version: u64,
}

/// Decoded blob with its write version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub value: T,
    /// `None` when nothing is persisted yet and `value` is a default.
    pub version: Option<u64>,
}

/// Repository interface for the namespaced backing store.
pub trait KvRepository {
    fn get(&self, key: &StoreKey) -> RepoResult<Option<VersionedValue>>;
    /// Unconditional write; returns the new version.
    fn put(&self, key: &StoreKey, value: &str) -> RepoResult<u64>;
    /// Writes only when the stored version equals `expected`
    /// (`None` = key must be absent).
    fn put_if_version(&self, key: &StoreKey, expected: Option<u64>, value: &str)
        -> RepoResult<u64>;
    /// Removes the key; returns whether it existed.
    fn delete(&self, key: &StoreKey) -> RepoResult<bool>;
    /// Raw key strings starting with `prefix`, sorted.
    fn keys_with_prefix(&self, prefix: &str) -> RepoResult<Vec<String>>;
    /// Increments the `(workspace, prefix)` counter and returns the new value.
    ///
    /// The counter never falls below `floor + 1`, which lets callers seed it
    /// from the number of records that already carry codes.
    fn next_code(&self, workspace: &WorkspaceId, prefix: &str, floor: u64) -> RepoResult<u64>;
    /// Runs `f` inside one exclusive write transaction.
    ///
    /// When the connection already has an open transaction, `f` joins it
    /// and nothing commits here: the caller that opened it owns the commit.
    /// Services notify as soon as their own `atomic` returns, so inside a
    /// caller-owned transaction observers may hear about writes that are
    /// not committed yet and may still roll back.
    fn atomic<T, E, F>(&self, f: F) -> Result<T, E>
    where
        Self: Sized,
        E: From<RepoError>,
        F: FnOnce(&Self) -> Result<T, E>;

    /// Reads and decodes a JSON blob.
    fn read_json<T: DeserializeOwned>(&self, key: &StoreKey) -> RepoResult<Option<Versioned<T>>> {
        let Some(stored) = self.get(key)? else {
            return Ok(None);
        };
        let value =
            serde_json::from_str(&stored.value).map_err(|source| RepoError::Serialization {
                key: key.to_string(),
                source,
            })?;
        Ok(Some(Versioned {
            value,
            version: Some(stored.version),
        }))
    }

    /// Encodes and writes a JSON blob unconditionally.
    fn write_json<T: Serialize>(&self, key: &StoreKey, value: &T) -> RepoResult<u64> {
        let encoded = encode_json(key, value)?;
        self.put(key, &encoded)
    }

    /// Encodes and writes a JSON blob guarded by `expected` version.
    fn write_json_if_version<T: Serialize>(
        &self,
        key: &StoreKey,
        expected: Option<u64>,
        value: &T,
    ) -> RepoResult<u64> {
        let encoded = encode_json(key, value)?;
        self.put_if_version(key, expected, &encoded)
    }
}

fn encode_json<T: Serialize>(key: &StoreKey, value: &T) -> RepoResult<String> {
    serde_json::to_string(value).map_err(|source| RepoError::Serialization {
        key: key.to_string(),
        source,
    })
}

/// SQLite-backed key-value repository.
#[derive(Clone, Copy)]
pub struct SqliteKvRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteKvRepository<'conn> {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn current_version(&self, key: &str) -> RepoResult<Option<u64>> {
        let version = self
            .conn
            .query_row(
                "SELECT version FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        version.map(version_from_db).transpose()
    }
}

impl KvRepository for SqliteKvRepository<'_> {
    fn get(&self, key: &StoreKey) -> RepoResult<Option<VersionedValue>> {
        let row = self
            .conn
            .query_row(
                "SELECT value, version FROM kv_entries WHERE key = ?1;",
                [key.to_string()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        match row {
            Some((value, version)) => Ok(Some(VersionedValue {
                value,
                version: version_from_db(version)?,
            })),
            None => Ok(None),
        }
    }

    fn put(&self, key: &StoreKey, value: &str) -> RepoResult<u64> {
        let version: i64 = self.conn.query_row(
            "INSERT INTO kv_entries (key, value, version, updated_at)
             VALUES (?1, ?2, 1, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                version = kv_entries.version + 1,
                updated_at = excluded.updated_at
             RETURNING version;",
            params![key.to_string(), value],
            |row| row.get(0),
        )?;
        version_from_db(version)
    }

    fn put_if_version(
        &self,
        key: &StoreKey,
        expected: Option<u64>,
        value: &str,
    ) -> RepoResult<u64> {
        self.atomic(|repo| {
            let key_text = key.to_string();
            let actual = repo.current_version(&key_text)?;
            if actual != expected {
                return Err(RepoError::Conflict {
                    key: key_text,
                    expected,
                    actual,
                });
            }
            repo.put(key, value)
        })
    }

    fn delete(&self, key: &StoreKey) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM kv_entries WHERE key = ?1;", [key.to_string()])?;
        Ok(changed > 0)
    }

    fn keys_with_prefix(&self, prefix: &str) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT key
             FROM kv_entries
             WHERE substr(key, 1, length(?1)) = ?1
             ORDER BY key ASC;",
        )?;
        let mut rows = stmt.query([prefix])?;
        let mut keys = Vec::new();
        while let Some(row) = rows.next()? {
            keys.push(row.get(0)?);
        }
        Ok(keys)
    }

    fn next_code(&self, workspace: &WorkspaceId, prefix: &str, floor: u64) -> RepoResult<u64> {
        let floor = i64::try_from(floor)
            .map_err(|_| RepoError::InvalidData(format!("code floor {floor} out of range")))?;
        let value: i64 = self.conn.query_row(
            "INSERT INTO code_counters (workspace, prefix, value)
             VALUES (?1, ?2, ?3 + 1)
             ON CONFLICT(workspace, prefix) DO UPDATE SET
                value = MAX(code_counters.value, ?3) + 1
             RETURNING value;",
            params![workspace.as_str(), prefix, floor],
            |row| row.get(0),
        )?;
        version_from_db(value)
    }

    fn atomic<T, E, F>(&self, f: F) -> Result<T, E>
    where
        Self: Sized,
        E: From<RepoError>,
        F: FnOnce(&Self) -> Result<T, E>,
    {
        if !self.conn.is_autocommit() {
            return f(self);
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;
        // Dropping `tx` on the error path rolls the whole sequence back.
        let value = f(self)?;
        tx.commit().map_err(RepoError::from)?;
        Ok(value)
    }
}

fn version_from_db(value: i64) -> RepoResult<u64> {
    u64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("negative version/counter value {value}")))
}
