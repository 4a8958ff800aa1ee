//! SQLite connection wrapper.

use std::sync::Arc;

use async_trait::async_trait;
use entities_schema::StoredValue;
use rusqlite::params_from_iter;
use tokio_rusqlite::Connection;
use tracing::{debug, info, instrument};

use crate::config::{DatabasePath, SqliteConfig};
use crate::error::{SqliteError, SqliteResult};
use crate::executor::{Executor, Statement};
use crate::row::SqliteRow;
use crate::types::to_sqlite_params;

/// A handle to an open SQLite database.
///
/// Cloning the handle is cheap; all clones share the same underlying
/// connection and its single background thread, so statements issued through
/// any clone are serialized.
#[derive(Clone)]
pub struct SqliteConnection {
    conn: Connection,
    config: Arc<SqliteConfig>,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.config.path_str())
            .finish()
    }
}

impl SqliteConnection {
    /// Open a connection and apply the configured pragmas.
    #[instrument(skip(config), fields(path = %config.path_str()))]
    pub async fn open(config: SqliteConfig) -> SqliteResult<Self> {
        let conn = match &config.path {
            DatabasePath::Memory => Connection::open_in_memory().await,
            DatabasePath::File(path) => Connection::open(path).await,
        }
        .map_err(|e| SqliteError::open(config.path_str(), e))?;

        let init_sql = config.init_sql();
        conn.call(move |conn| Ok(conn.execute_batch(&init_sql)?))
            .await?;

        info!(path = %config.path_str(), "SQLite connection opened");

        Ok(Self {
            conn,
            config: Arc::new(config),
        })
    }

    /// Open a private in-memory database.
    pub async fn open_in_memory() -> SqliteResult<Self> {
        Self::open(SqliteConfig::memory()).await
    }

    /// Open a connection from a connection string.
    pub async fn open_url(url: &str) -> SqliteResult<Self> {
        Self::open(SqliteConfig::from_url(url)?).await
    }

    /// The configuration the connection was opened with.
    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Get the inner connection.
    pub fn inner(&self) -> &Connection {
        &self.conn
    }
}

#[async_trait]
impl Executor for SqliteConnection {
    async fn query(&self, sql: &str, params: Vec<StoredValue>) -> SqliteResult<Vec<SqliteRow>> {
        let sql = sql.to_string();
        debug!(sql = %sql, params = params.len(), "Executing query");
        let params = to_sqlite_params(params);

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let columns: Vec<String> = stmt
                    .column_names()
                    .iter()
                    .map(|s| s.to_string())
                    .collect();

                let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
                    SqliteRow::from_row(row, &columns)
                })?;

                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
            .map_err(SqliteError::from)
    }

    async fn execute(&self, sql: &str, params: Vec<StoredValue>) -> SqliteResult<usize> {
        let sql = sql.to_string();
        debug!(sql = %sql, params = params.len(), "Executing statement");
        let params = to_sqlite_params(params);

        self.conn
            .call(move |conn| Ok(conn.execute(&sql, params_from_iter(params.iter()))?))
            .await
            .map_err(SqliteError::from)
    }

    async fn insert(&self, sql: &str, params: Vec<StoredValue>) -> SqliteResult<i64> {
        let sql = sql.to_string();
        debug!(sql = %sql, params = params.len(), "Executing insert");
        let params = to_sqlite_params(params);

        self.conn
            .call(move |conn| {
                conn.execute(&sql, params_from_iter(params.iter()))?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(SqliteError::from)
    }

    async fn execute_batch(&self, sql: &str) -> SqliteResult<()> {
        let sql = sql.to_string();
        debug!(sql = %sql, "Executing batch");

        self.conn
            .call(move |conn| Ok(conn.execute_batch(&sql)?))
            .await
            .map_err(SqliteError::from)
    }

    async fn execute_atomic(&self, statements: Vec<Statement>) -> SqliteResult<()> {
        debug!(statements = statements.len(), "Executing transaction");
        let statements: Vec<_> = statements
            .into_iter()
            .map(|s| (s.sql, to_sqlite_params(s.params)))
            .collect();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for (sql, params) in &statements {
                    tx.execute(sql, params_from_iter(params.iter()))?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(SqliteError::from)
    }
}
