//! # entities-schema
//!
//! Table models and schema rules for entities-orm.
//!
//! This crate provides:
//! - Table model declarations with per-column mappings
//! - Column kind inference from sample values, and the value conversions
//!   derived from it
//! - Deterministic `CREATE TABLE` generation for SQLite
//! - Configuration parser for `entities.toml` files
//!
//! ## Example
//!
//! ```rust
//! use entities_schema::{ColumnMapping, DdlGenerator, SchemaRegistry, TableModel};
//! use serde_json::json;
//!
//! let mut registry = SchemaRegistry::new();
//! registry.register(
//!     TableModel::new("t")
//!         .column("id", json!(0))
//!         .column_with("uid", json!(""), ColumnMapping::new().unique())
//!         .column("active", json!(false)),
//! )?;
//!
//! let sql = DdlGenerator.create_table(registry.get("t").unwrap())?;
//! assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS 't'"));
//! # Ok::<(), entities_schema::SchemaError>(())
//! ```

pub mod config;
pub mod ddl;
pub mod error;
pub mod kind;
pub mod model;
pub mod registry;
pub mod value;

pub use config::{EntitiesConfig, FingerprintMode, MigrationPolicy};
pub use ddl::{DdlGenerator, catalog_form};
pub use error::{SchemaError, SchemaResult};
pub use kind::ColumnKind;
pub use model::{Column, ColumnMapping, ForeignKey, MASTER_TABLE, TableModel, is_reserved_name};
pub use registry::SchemaRegistry;
pub use value::StoredValue;
