//! Drift detection and startup migrations for entities-orm.
//!
//! Every run compares three views of each table:
//!
//! - the live definition SQLite reports,
//! - the fingerprint recorded in `entities_master` after the last run,
//! - the definition generated from the declared model.
//!
//! A live table that no longer matches its fingerprint was changed outside
//! its model (a *physical* difference). A model that no longer matches its
//! fingerprint was changed in code (an *object* difference). Differences are
//! then resolved by the configured [`MigrationPolicy`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use entities_migrate::{EngineConfig, MigrationEngine};
//! use entities_schema::{MigrationPolicy, SchemaRegistry, TableModel};
//! use entities_sqlite::SqliteConnection;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let conn = Arc::new(SqliteConnection::open_url("sqlite://./app.db").await?);
//!
//!     let mut registry = SchemaRegistry::new();
//!     registry.register(TableModel::from_json("users", json!({"id": 0, "name": ""}))?)?;
//!
//!     let engine = MigrationEngine::new(
//!         conn,
//!         Arc::new(registry),
//!         EngineConfig::new().policy(MigrationPolicy::Alter),
//!     );
//!     let outcome = engine.start(None).await?;
//!     println!("created: {}, migrated: {}", outcome.created, outcome.migrated);
//!     Ok(())
//! }
//! ```

pub mod diff;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod reconcile;
pub mod session;

pub use diff::{Difference, DifferenceKind, SchemeDelta};
pub use engine::{AlterPlan, EngineConfig, MigrationEngine, StartupOutcome};
pub use error::{MigrateResult, MigrationError};
pub use fingerprint::{Fingerprint, FingerprintRecord, FingerprintRecords, FingerprintStore};
pub use reconcile::{Reconciler, Reconciliation};
pub use session::{MigrationHandler, MigrationSession, SessionState};

pub use entities_schema::{FingerprintMode, MigrationPolicy};
