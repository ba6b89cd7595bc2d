//! SQLite record store
//!
//! Connections come from an r2d2 pool. Every connection is keyed for
//! SQLCipher when a passphrase is configured, and the schema is created on
//! open.
//!
//! - `records` - Expense record queries and the `RecordStore` implementation
//! - `audit` - Audit log of API and CLI access

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tempfile::TempPath;
use tracing::info;

use crate::error::{Error, Result};

mod audit;
mod records;

pub use audit::AuditEntry;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable holding the SQLCipher passphrase
pub const DB_KEY_ENV: &str = "TRACKIFY_DB_KEY";

const POOL_SIZE: u32 = 10;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Turn a passphrase into a raw 256-bit SQLCipher key (hex encoded)
///
/// The salt is fixed so a passphrase opens the same database from any path.
/// Changing it makes every existing encrypted database unreadable.
fn sqlcipher_key(passphrase: &str) -> Result<String> {
    const SALT: &[u8] = b"trackify-sqlcipher-v1";

    let mut key = [0u8; 32];
    argon2::Argon2::default()
        .hash_password_into(passphrase.as_bytes(), SALT, &mut key)
        .map_err(|e| Error::Encryption(format!("Key derivation failed: {}", e)))?;
    Ok(hex::encode(key))
}

/// Parse a stored RFC 3339 timestamp
pub(crate) fn parse_timestamp(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Pooled handle to the record store; clones share the pool
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    db_path: String,
    /// Backing file of an `in_memory` database, removed with the last clone
    temp_file: Option<Arc<TempPath>>,
}

impl Database {
    /// Open an encrypted database keyed from `TRACKIFY_DB_KEY`
    ///
    /// Fails when the variable is unset; `new_unencrypted` is the explicit
    /// opt-out for development.
    pub fn new(path: &str) -> Result<Self> {
        let passphrase = std::env::var(DB_KEY_ENV).map_err(|_| {
            Error::Encryption(format!(
                "{} is not set. Set it to your database passphrase, or pass --no-encrypt \
                 to use a plaintext database (development only).",
                DB_KEY_ENV
            ))
        })?;
        Self::new_with_key(path, Some(&passphrase))
    }

    /// Open a plaintext database (development and tests only)
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let key_pragma = passphrase
            .map(sqlcipher_key)
            .transpose()?
            .map(|key| format!("PRAGMA key = \"x'{}'\";", key));

        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            if let Some(ref pragma) = key_pragma {
                conn.execute_batch(pragma)?;
            }
            conn.busy_timeout(BUSY_TIMEOUT)
        });
        let pool = Pool::builder().max_size(POOL_SIZE).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
            temp_file: None,
        };
        db.create_schema()?;
        Ok(db)
    }

    /// Fresh plaintext database in the temp directory (for tests)
    ///
    /// A file rather than `:memory:`, since every pooled connection to
    /// `:memory:` would see its own empty database.
    pub fn in_memory() -> Result<Self> {
        let temp_path = tempfile::Builder::new()
            .prefix("trackify_test_")
            .suffix(".db")
            .tempfile()?
            .into_temp_path();

        let mut db = Self::new_unencrypted(&temp_path.to_string_lossy())?;
        db.temp_file = Some(Arc::new(temp_path));
        Ok(db)
    }

    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn create_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            CREATE TABLE IF NOT EXISTS records (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                amount REAL NOT NULL,
                category TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                date TEXT NOT NULL,                        -- RFC 3339, UTC
                created_at TEXT NOT NULL                   -- RFC 3339, UTC
            );

            CREATE INDEX IF NOT EXISTS idx_records_user_date ON records(user_id, date);

            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY,
                timestamp TEXT NOT NULL,                   -- RFC 3339, UTC
                user_id TEXT NOT NULL,
                action TEXT NOT NULL,
                entity_type TEXT,
                entity_id TEXT,
                details TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_audit_user ON audit_log(user_id);
            "#,
        )?;

        info!(path = %self.db_path, "Database schema ready");
        Ok(())
    }
}
