//! DDL generation from table models.
//!
//! The generated text is compared byte-for-byte against recorded
//! fingerprints, so for a fixed model it must never change between runs.

use crate::error::SchemaResult;
use crate::model::{Column, TableModel};

const CREATE_IF_NOT_EXISTS: &str = "CREATE TABLE IF NOT EXISTS ";
const CREATE: &str = "CREATE TABLE ";

/// DDL generator for SQLite.
#[derive(Debug, Clone, Copy, Default)]
pub struct DdlGenerator;

impl DdlGenerator {
    /// Generate the executable `CREATE TABLE IF NOT EXISTS` statement.
    pub fn create_table(&self, model: &TableModel) -> SchemaResult<String> {
        model.validate()?;

        let mut definitions = Vec::with_capacity(model.columns().len());
        let mut constraints = Vec::new();

        for column in model.columns() {
            if model.is_primary(column.name()) {
                definitions.push(format!(
                    "{} {} PRIMARY KEY AUTOINCREMENT NOT NULL",
                    column.name(),
                    model.sql_type(column)
                ));
            } else {
                definitions.push(self.column_definition(model, column));
            }

            let Some(mapping) = model.mapping(column.name()) else {
                continue;
            };
            if mapping.unique {
                constraints.push(format!(
                    "CONSTRAINT {name}_unique UNIQUE ({name})",
                    name = column.name()
                ));
            }
            if let Some(fk) = &mapping.foreign {
                constraints.push(format!(
                    "FOREIGN KEY({}) REFERENCES {}({})",
                    column.name(),
                    fk.table,
                    fk.column
                ));
            }
        }

        definitions.extend(constraints);

        Ok(format!(
            "{}'{}' ({})",
            CREATE_IF_NOT_EXISTS,
            model.name(),
            definitions.join(", ")
        ))
    }

    /// Generate the statement in the form SQLite records it in `sqlite_master`.
    pub fn catalog_create_table(&self, model: &TableModel) -> SchemaResult<String> {
        self.create_table(model).map(|sql| catalog_form(&sql))
    }

    /// Generate the definition of a non-primary column.
    pub fn column_definition(&self, model: &TableModel, column: &Column) -> String {
        let mut parts = vec![column.name().to_string(), model.sql_type(column)];

        if model.mapping(column.name()).is_some_and(|m| m.is_not_null()) {
            parts.push("NOT NULL".to_string());
        }

        parts.join(" ")
    }

    /// Generate an `ALTER TABLE .. ADD COLUMN` statement.
    pub fn add_column(&self, model: &TableModel, column: &Column) -> String {
        format!(
            "ALTER TABLE '{}' ADD COLUMN {}",
            model.name(),
            self.column_definition(model, column)
        )
    }

    /// Generate a `DROP TABLE IF EXISTS` statement.
    pub fn drop_table(&self, name: &str) -> String {
        format!("DROP TABLE IF EXISTS '{}'", name)
    }
}

/// Rewrite an executable create statement into its catalog form.
pub fn catalog_form(sql: &str) -> String {
    match sql.strip_prefix(CREATE_IF_NOT_EXISTS) {
        Some(rest) => format!("{}{}", CREATE, rest),
        None => sql.to_string(),
    }
}
