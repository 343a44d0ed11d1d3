//! SQLCipher connection pool
//!
//! r2d2-based connection pooling for SQLCipher encrypted databases. Each
//! connection gets the encryption key and performance pragmas applied on
//! checkout initialization.

use std::path::Path;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, Row, ToSql};
use tracing::{debug, info, warn};

use super::error::{StorageError, StorageResult};

/// SQLCipher pool configuration
#[derive(Debug, Clone)]
pub struct SqlCipherPoolConfig {
    /// Maximum number of connections in the pool
    pub max_size: u32,

    /// Connection checkout timeout
    pub connection_timeout: Duration,

    /// Busy timeout for SQLite operations
    pub busy_timeout: Duration,

    /// Enable WAL journal mode
    pub enable_wal: bool,

    /// Enable foreign key constraints
    pub enable_foreign_keys: bool,
}

impl Default for SqlCipherPoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            connection_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_millis(5000),
            enable_wal: true,
            enable_foreign_keys: true,
        }
    }
}

fn configure_sqlcipher(conn: &Connection, key: &str) -> rusqlite::Result<()> {
    conn.pragma_update(None, "key", key)?;
    conn.pragma_update(None, "cipher_compatibility", 4)?;
    Ok(())
}

fn apply_connection_pragmas(
    conn: &Connection,
    config: &SqlCipherPoolConfig,
) -> rusqlite::Result<()> {
    let mut pragma_sql = String::new();
    if config.enable_wal {
        pragma_sql.push_str("PRAGMA journal_mode=WAL;\n");
        pragma_sql.push_str("PRAGMA wal_autocheckpoint=1000;\n");
    }
    pragma_sql.push_str("PRAGMA synchronous=NORMAL;\n");
    if config.enable_foreign_keys {
        pragma_sql.push_str("PRAGMA foreign_keys=ON;\n");
    }
    conn.execute_batch(&pragma_sql)?;
    conn.busy_timeout(config.busy_timeout)?;
    Ok(())
}

/// SQLCipher connection pool
///
/// Manages a pool of encrypted SQLite connections using r2d2. WAL mode keeps
/// readers from blocking writers within a process.
pub struct SqlCipherPool {
    pool: Pool<SqliteConnectionManager>,
}

impl std::fmt::Debug for SqlCipherPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlCipherPool").field("state", &self.pool.state()).finish()
    }
}

impl SqlCipherPool {
    /// Create a new SQLCipher connection pool.
    ///
    /// Verifies a first connection can read the database with the given key
    /// before returning, so a wrong key fails fast.
    ///
    /// # Errors
    /// Returns an error if the database file can't be accessed, the
    /// encryption key is wrong, or pool creation fails.
    pub fn new(
        path: &Path,
        encryption_key: String,
        config: SqlCipherPoolConfig,
    ) -> StorageResult<Self> {
        info!(db_path = ?path, pool_size = config.max_size, "creating SQLCipher connection pool");

        let init_config = config.clone();
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            configure_sqlcipher(conn, &encryption_key)?;
            apply_connection_pragmas(conn, &init_config)?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .map_err(|e| {
                warn!("failed to create connection pool: {e}");
                let msg = e.to_string().to_lowercase();
                if msg.contains("file is not a database")
                    || msg.contains("file is encrypted")
                    || msg.contains("notadb")
                {
                    StorageError::WrongKeyOrNotEncrypted
                } else {
                    StorageError::Connection(format!("failed to create pool: {e}"))
                }
            })?;

        // A key mismatch only surfaces on the first real read.
        {
            let conn = pool.get().map_err(StorageError::from)?;
            conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
                .map_err(|e| match e.sqlite_error_code() {
                    Some(rusqlite::ErrorCode::NotADatabase) => {
                        StorageError::WrongKeyOrNotEncrypted
                    }
                    _ => StorageError::from(e),
                })?;
        }

        debug!("SQLCipher pool ready");
        Ok(Self { pool })
    }

    /// Check out a connection from the pool.
    ///
    /// # Errors
    /// Returns `PoolExhausted` when checkout times out.
    pub fn get_connection(&self) -> StorageResult<SqlCipherConnection> {
        let conn = self.pool.get().map_err(|_| StorageError::PoolExhausted)?;
        Ok(SqlCipherConnection { inner: conn })
    }
}

/// Pooled SQLCipher connection wrapper.
///
/// Returned to the pool when dropped. Exposes the small query surface the
/// repositories need, mapping rusqlite errors into `StorageError`.
pub struct SqlCipherConnection {
    inner: PooledConnection<SqliteConnectionManager>,
}

impl SqlCipherConnection {
    /// Execute a statement, returning the affected row count.
    pub fn execute(&self, sql: &str, params: &[&dyn ToSql]) -> StorageResult<usize> {
        self.inner.execute(sql, params).map_err(StorageError::from)
    }

    /// Execute a batch of statements (schema setup, pragmas).
    pub fn execute_batch(&self, sql: &str) -> StorageResult<()> {
        self.inner.execute_batch(sql).map_err(StorageError::from)
    }

    /// Run a query expected to return exactly one row.
    pub fn query_row<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> StorageResult<T>
    where
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.inner.query_row(sql, params, f).map_err(StorageError::from)
    }

    /// Run a query expected to return zero or one row.
    pub fn query_optional<T, F>(
        &self,
        sql: &str,
        params: &[&dyn ToSql],
        f: F,
    ) -> StorageResult<Option<T>>
    where
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        match self.inner.query_row(sql, params, f) {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::from(e)),
        }
    }

    /// Run a query and collect every row through the mapping closure.
    pub fn query_map<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> StorageResult<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self.inner.prepare(sql).map_err(StorageError::from)?;
        let rows = stmt.query_map(params, f).map_err(StorageError::from)?;
        rows.collect::<rusqlite::Result<Vec<T>>>().map_err(StorageError::from)
    }

    /// Access the underlying rusqlite connection for transactions.
    pub fn inner(&mut self) -> &mut rusqlite::Connection {
        &mut self.inner
    }
}
