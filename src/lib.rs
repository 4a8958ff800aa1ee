//! # Entities
//!
//! Schema-governed SQLite tables for Rust.
//!
//! Entities provides:
//! - Table models declared from sample values, with types inferred from their shape
//! - Deterministic DDL generated from each model
//! - Drift detection against fingerprints recorded in `entities_master`
//! - Startup migrations under a manual, halt, dropCreate or alter policy
//! - Typed row access converting values through the declared scheme
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use entities::{Context, ContextConfig, MigrationPolicy, TableModel};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> entities::Result<()> {
//!     let db = Context::builder(ContextConfig::new("sqlite://./app.db").migration(MigrationPolicy::Alter))
//!         .table(TableModel::from_json("t", json!({"id": 0, "uid": "", "active": false}))?)
//!         .open()
//!         .await?;
//!
//!     let t = db.table("t")?;
//!     t.add(&json!({"uid": "a", "active": true})).await?;
//!
//!     let active = t.filter(|row| row["active"] == json!(true)).await?;
//!     println!("{}", active.to_json());
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod logging;
pub mod rows;
pub mod table;

/// Table models, type inference and DDL generation.
pub mod schema {
    pub use entities_schema::*;
}

/// Storage layer.
pub mod sqlite {
    pub use entities_sqlite::*;
}

/// Reconciliation and migrations.
pub mod migrate {
    pub use entities_migrate::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::ContextConfig;
    pub use crate::context::{Context, ContextBuilder};
    pub use crate::event::ContextEvent;
    pub use crate::rows::{RowEntity, Rows};
    pub use crate::table::Table;
    pub use entities_migrate::{Difference, MigrationHandler, MigrationSession};
    pub use entities_schema::{ColumnMapping, FingerprintMode, MigrationPolicy, TableModel};
}

pub use config::ContextConfig;
pub use context::{Context, ContextBuilder};
pub use error::{Error, Result};
pub use event::{ContextEvent, EventBus};
pub use rows::{RowEntity, Rows};
pub use table::Table;

pub use entities_migrate::{
    Difference, DifferenceKind, MigrateResult, MigrationError, MigrationHandler, MigrationSession,
};
pub use entities_schema::{
    ColumnKind, ColumnMapping, EntitiesConfig, FingerprintMode, ForeignKey, MigrationPolicy,
    SchemaError, StoredValue, TableModel,
};
