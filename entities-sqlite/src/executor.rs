//! The statement execution seam.

use async_trait::async_trait;
use entities_schema::StoredValue;
use tracing::debug;

use crate::error::SqliteResult;
use crate::row::SqliteRow;

/// A single SQL statement with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// SQL text.
    pub sql: String,
    /// Positional parameters.
    pub params: Vec<StoredValue>,
}

impl Statement {
    /// A statement without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// A statement with positional parameters.
    pub fn with_params(sql: impl Into<String>, params: Vec<StoredValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

impl From<String> for Statement {
    fn from(sql: String) -> Self {
        Self::new(sql)
    }
}

impl From<&str> for Statement {
    fn from(sql: &str) -> Self {
        Self::new(sql)
    }
}

/// Runs statements against a database.
///
/// Everything above the storage layer talks to the database through this
/// trait, so it can be driven by any connection implementation.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a query and return all rows.
    async fn query(&self, sql: &str, params: Vec<StoredValue>) -> SqliteResult<Vec<SqliteRow>>;

    /// Run a statement and return the number of affected rows.
    async fn execute(&self, sql: &str, params: Vec<StoredValue>) -> SqliteResult<usize>;

    /// Run an insert and return the last inserted rowid.
    async fn insert(&self, sql: &str, params: Vec<StoredValue>) -> SqliteResult<i64>;

    /// Run several parameterless statements separated by semicolons.
    async fn execute_batch(&self, sql: &str) -> SqliteResult<()>;

    /// Run statements in a single transaction. Nothing is kept if one fails.
    async fn execute_atomic(&self, statements: Vec<Statement>) -> SqliteResult<()>;

    /// Run statements strictly in order, each after the previous one
    /// completed. The first failure aborts the remaining statements.
    async fn execute_sequence(&self, statements: &[String]) -> SqliteResult<()> {
        for (step, sql) in statements.iter().enumerate() {
            debug!(step = step + 1, total = statements.len(), sql = %sql, "Executing sequence step");
            self.execute(sql, Vec::new()).await?;
        }
        Ok(())
    }

    /// Run a query and return the first row, if any.
    async fn query_optional(&self, sql: &str, params: Vec<StoredValue>) -> SqliteResult<Option<SqliteRow>> {
        Ok(self.query(sql, params).await?.into_iter().next())
    }
}
