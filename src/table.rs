//! Typed access to the rows of one declared table.

use std::sync::Arc;

use entities_schema::{SchemaRegistry, StoredValue, TableModel};
use entities_sqlite::{Executor, SqliteError, SqliteRow, Statement};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::event::EventBus;
use crate::rows::{RowEntity, Rows};

/// A handle on one declared table.
///
/// Values are converted through the table's scheme in both directions:
/// [`add`](Self::add) stores logical values, and every read returns
/// [`RowEntity`] values rebuilt from the stored rows. Handles are cheap to
/// clone.
#[derive(Clone)]
pub struct Table {
    executor: Arc<dyn Executor>,
    registry: Arc<SchemaRegistry>,
    events: EventBus,
    name: String,
    projection: Option<Vec<String>>,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("projection", &self.projection)
            .finish()
    }
}

impl Table {
    pub(crate) fn new(
        executor: Arc<dyn Executor>,
        registry: Arc<SchemaRegistry>,
        events: EventBus,
        name: &str,
    ) -> Result<Self> {
        if !registry.contains(name) {
            return Err(Error::UnknownTable(name.to_string()));
        }
        Ok(Self {
            executor,
            registry,
            events,
            name: name.to_string(),
            projection: None,
        })
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared model.
    pub fn model(&self) -> Result<&TableModel> {
        self.registry
            .get(&self.name)
            .ok_or_else(|| Error::UnknownTable(self.name.clone()))
    }

    /// The projected columns, if any.
    pub fn projection(&self) -> Option<&[String]> {
        self.projection.as_deref()
    }

    /// Restrict reads through the returned handle to these columns. Columns
    /// left out read as their zero value. An empty list selects every column.
    pub fn select<I, S>(&self, columns: I) -> Result<Table>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = columns.into_iter().map(Into::into).collect::<Vec<String>>();
        for column in &columns {
            self.registry.column(&self.name, column)?;
        }

        Ok(Table {
            projection: (!columns.is_empty()).then_some(columns),
            ..self.clone()
        })
    }

    /// Insert a row given as a JSON object of logical values. Columns left out
    /// get the database default. Returns the new row id.
    pub async fn add(&self, row: &Value) -> Result<i64> {
        let Value::Object(fields) = row else {
            return Err(Error::invalid_row(&self.name, format!("expected an object, got {}", row)));
        };

        let mut columns = Vec::with_capacity(fields.len());
        let mut params = Vec::with_capacity(fields.len());
        for (column, value) in fields {
            params.push(self.registry.convert_outbound(&self.name, column, value)?);
            columns.push(quote(column));
        }

        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote(&self.name))
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote(&self.name),
                columns.join(", "),
                vec!["?"; columns.len()].join(", ")
            )
        };

        debug!(table = %self.name, columns = columns.len(), "Inserting row");
        self.executor
            .insert(&sql, params)
            .await
            .map_err(|e| self.storage_error(e))
    }

    /// Insert a serializable record.
    pub async fn add_record<T: Serialize>(&self, record: &T) -> Result<i64> {
        self.add(&serde_json::to_value(record)?).await
    }

    /// Delete every stored row the predicate accepts. The predicate sees raw
    /// stored values, and rows are deleted by matching all of them. Returns
    /// whether any row matched.
    pub async fn remove<F>(&self, predicate: F) -> Result<bool>
    where
        F: Fn(&SqliteRow) -> bool,
    {
        let rows = self.all_raw().await?;
        let statements: Vec<Statement> = rows
            .iter()
            .filter(|row| predicate(row))
            .map(|row| self.delete_statement(row))
            .collect();

        if statements.is_empty() {
            return Ok(false);
        }

        debug!(table = %self.name, rows = statements.len(), "Removing rows");
        self.executor
            .execute_atomic(statements)
            .await
            .map_err(|e| self.storage_error(e))?;
        Ok(true)
    }

    fn delete_statement(&self, row: &SqliteRow) -> Statement {
        let (conditions, params): (Vec<String>, Vec<StoredValue>) = row
            .iter()
            .map(|(column, value)| (format!("{} IS ?", quote(column)), value.clone()))
            .unzip();

        Statement::with_params(
            format!("DELETE FROM {} WHERE {}", quote(&self.name), conditions.join(" AND ")),
            params,
        )
    }

    /// The first row matching the predicate.
    pub async fn first<F>(&self, predicate: F) -> Result<Option<RowEntity>>
    where
        F: Fn(&RowEntity) -> bool,
    {
        Ok(self.all().await?.into_iter().find(|e| predicate(e)))
    }

    /// The last row matching the predicate.
    pub async fn last<F>(&self, predicate: F) -> Result<Option<RowEntity>>
    where
        F: Fn(&RowEntity) -> bool,
    {
        Ok(self.all().await?.into_iter().rev().find(|e| predicate(e)))
    }

    /// Rows matching the predicate.
    #[doc(alias = "where")]
    pub async fn filter<F>(&self, predicate: F) -> Result<Rows>
    where
        F: Fn(&RowEntity) -> bool,
    {
        Ok(self.all().await?.filter(predicate))
    }

    /// Number of rows matching the predicate.
    pub async fn count<F>(&self, predicate: F) -> Result<usize>
    where
        F: Fn(&RowEntity) -> bool,
    {
        Ok(self.all().await?.count(predicate))
    }

    /// Every row, converted.
    pub async fn all(&self) -> Result<Rows> {
        let model = self.model()?;
        let columns = match &self.projection {
            Some(columns) => columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", "),
            None => "*".to_string(),
        };

        let rows = self
            .query(&format!("SELECT {} FROM {}", columns, quote(&self.name)))
            .await?;

        let entities = rows
            .iter()
            .map(|row| RowEntity::from_row(&self.registry, model, row))
            .collect::<Result<Vec<_>>>()?;
        Ok(Rows::new(self.name.clone(), entities))
    }

    /// Every row as stored, without conversion.
    pub async fn all_raw(&self) -> Result<Vec<SqliteRow>> {
        self.query(&format!("SELECT * FROM {}", quote(&self.name)))
            .await
    }

    async fn query(&self, sql: &str) -> Result<Vec<SqliteRow>> {
        self.executor
            .query(sql, Vec::new())
            .await
            .map_err(|e| self.storage_error(e))
    }

    fn storage_error(&self, error: SqliteError) -> Error {
        warn!(table = %self.name, error = %error, "Storage operation failed");
        self.events.error(&error);
        error.into()
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier)
}
