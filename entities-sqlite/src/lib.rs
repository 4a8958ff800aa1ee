//! SQLite storage layer for entities-orm.
//!
//! This crate provides the storage collaborator the schema engine runs on,
//! using `tokio-rusqlite` for asynchronous database operations.
//!
//! # Features
//!
//! - Async/await support via `tokio-rusqlite`
//! - An [`Executor`] trait that the rest of the workspace talks to
//! - Sequential and transactional statement lists
//! - Live catalog reads
//! - A shared connection cache keyed by connection string
//!
//! # Example
//!
//! ```rust,no_run
//! use entities_sqlite::{Executor, SqliteConfig, SqliteConnection};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let conn = SqliteConnection::open(SqliteConfig::from_url("sqlite://./mydb.db")?).await?;
//!     conn.execute_batch("CREATE TABLE IF NOT EXISTS t (id INTEGER)").await?;
//!     let tables = entities_sqlite::catalog::user_tables(&conn).await?;
//!     println!("{} tables", tables.len());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod catalog;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod row;
pub mod types;

pub use cache::{CacheStats, ConnectionCache};
pub use catalog::CatalogTable;
pub use config::{DatabasePath, JournalMode, SqliteConfig, SynchronousMode};
pub use connection::SqliteConnection;
pub use error::{SqliteError, SqliteResult};
pub use executor::{Executor, Statement};
pub use row::SqliteRow;
