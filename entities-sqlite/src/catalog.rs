//! Reads of the live schema catalog (`sqlite_master`).

use entities_schema::{StoredValue, is_reserved_name};
use tracing::instrument;

use crate::error::{SqliteError, SqliteResult};
use crate::executor::Executor;

/// A table as recorded in the live catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTable {
    /// Table name.
    pub name: String,
    /// The `CREATE TABLE` text SQLite keeps for the table.
    pub sql: String,
}

/// List every table in the catalog, in creation order.
#[instrument(skip(executor))]
pub async fn list_tables<E: Executor + ?Sized>(executor: &E) -> SqliteResult<Vec<CatalogTable>> {
    let rows = executor
        .query(
            "SELECT name, sql FROM sqlite_master WHERE type = 'table' ORDER BY rowid",
            Vec::new(),
        )
        .await?;

    rows.into_iter()
        .map(|row| {
            let name = row
                .get_text("name")
                .ok_or_else(|| SqliteError::catalog("table entry without a name"))?
                .to_string();
            let sql = row.get_text("sql").unwrap_or_default().to_string();
            Ok(CatalogTable { name, sql })
        })
        .collect()
}

/// List the caller's tables, leaving out the engine's own bookkeeping tables.
pub async fn user_tables<E: Executor + ?Sized>(executor: &E) -> SqliteResult<Vec<CatalogTable>> {
    Ok(list_tables(executor)
        .await?
        .into_iter()
        .filter(|table| !is_reserved_name(&table.name))
        .collect())
}

/// Check whether a table exists.
pub async fn table_exists<E: Executor + ?Sized>(executor: &E, name: &str) -> SqliteResult<bool> {
    Ok(table_sql(executor, name).await?.is_some())
}

/// Get the `CREATE TABLE` text of a table, if it exists.
pub async fn table_sql<E: Executor + ?Sized>(executor: &E, name: &str) -> SqliteResult<Option<String>> {
    let row = executor
        .query_optional(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?",
            vec![StoredValue::from(name)],
        )
        .await?;

    Ok(row.and_then(|row| row.get_text("sql").map(str::to_string)))
}
