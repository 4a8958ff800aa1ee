//! The fingerprint store.
//!
//! `entities_master` keeps one record per live user table: either the
//! table's `CREATE TABLE` text as SQLite records it, or a salted SHA-256 digest
//! of that text. Each record also carries the scheme the table was declared
//! with, so later runs can tell which columns a model gained or lost.
//!
//! ```text
//! verbatim: id | name | sql  |      | object
//! digest:   id | name | hash | salt | object
//! ```

use std::sync::Arc;

use entities_schema::{FingerprintMode, MASTER_TABLE, SchemaRegistry, StoredValue};
use entities_sqlite::{Executor, SqliteRow, Statement, catalog};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use crate::error::{MigrateResult, MigrationError};

/// SQL creating the store in verbatim mode.
pub const VERBATIM_STORE_SQL: &str = "CREATE TABLE IF NOT EXISTS 'entities_master' \
    (id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, name TEXT NOT NULL, sql TEXT NOT NULL, object TEXT)";

/// SQL creating the store in digest mode.
pub const DIGEST_STORE_SQL: &str = "CREATE TABLE IF NOT EXISTS 'entities_master' \
    (id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, name TEXT NOT NULL, hash TEXT NOT NULL, salt TEXT NOT NULL, object TEXT)";

/// Compute the salted digest of a table definition.
pub fn compute_digest(salt: &str, sql: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(sql.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a fresh salt.
pub fn generate_salt() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// How a table definition was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fingerprint {
    /// The definition text.
    Verbatim {
        /// `CREATE TABLE` text.
        sql: String,
    },
    /// A salted digest of the definition text.
    Digest {
        /// Hex-encoded SHA-256 of salt followed by the text.
        hash: String,
        /// Per-record salt.
        salt: String,
    },
}

impl Fingerprint {
    /// Fingerprint a definition in the given mode.
    pub fn of(mode: FingerprintMode, sql: &str) -> Self {
        match mode {
            FingerprintMode::Verbatim => Self::Verbatim {
                sql: sql.to_string(),
            },
            FingerprintMode::Digest => {
                let salt = generate_salt();
                Self::Digest {
                    hash: compute_digest(&salt, sql),
                    salt,
                }
            }
        }
    }

    /// Check whether a candidate definition matches.
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Verbatim { sql } => sql == candidate,
            Self::Digest { hash, salt } => compute_digest(salt, candidate) == *hash,
        }
    }
}

/// One record of the store.
#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintRecord {
    /// Table name.
    pub name: String,
    /// Recorded definition.
    pub fingerprint: Fingerprint,
    /// Declared scheme at the time of recording, if the table was declared.
    pub object: Option<Map<String, Value>>,
}

impl FingerprintRecord {
    /// Check whether a candidate definition matches the record.
    pub fn matches(&self, candidate: &str) -> bool {
        self.fingerprint.matches(candidate)
    }

    fn from_row(mode: FingerprintMode, row: &SqliteRow) -> MigrateResult<Self> {
        let text = |column: &str| {
            row.get_text(column)
                .map(str::to_string)
                .ok_or_else(|| MigrationError::store_layout(format!("record without '{}'", column)))
        };

        let fingerprint = match mode {
            FingerprintMode::Verbatim => Fingerprint::Verbatim { sql: text("sql")? },
            FingerprintMode::Digest => Fingerprint::Digest {
                hash: text("hash")?,
                salt: text("salt")?,
            },
        };

        let object = match row.get_text("object") {
            Some(json) => Some(serde_json::from_str(json)?),
            None => None,
        };

        Ok(Self {
            name: text("name")?,
            fingerprint,
            object,
        })
    }
}

/// Records keyed by table name, in recording order.
pub type FingerprintRecords = IndexMap<String, FingerprintRecord>;

/// Access to `entities_master`.
#[derive(Clone)]
pub struct FingerprintStore {
    executor: Arc<dyn Executor>,
    mode: FingerprintMode,
}

impl FingerprintStore {
    /// Create a store handle.
    pub fn new(executor: Arc<dyn Executor>, mode: FingerprintMode) -> Self {
        Self { executor, mode }
    }

    /// The recording mode.
    pub fn mode(&self) -> FingerprintMode {
        self.mode
    }

    /// The statement creating the store.
    pub fn create_sql(&self) -> &'static str {
        match self.mode {
            FingerprintMode::Verbatim => VERBATIM_STORE_SQL,
            FingerprintMode::Digest => DIGEST_STORE_SQL,
        }
    }

    /// Check whether the store exists.
    pub async fn exists(&self) -> MigrateResult<bool> {
        Ok(catalog::table_exists(self.executor.as_ref(), MASTER_TABLE).await?)
    }

    /// Create the store if it doesn't exist.
    pub async fn create(&self) -> MigrateResult<()> {
        self.executor.execute(self.create_sql(), Vec::new()).await?;
        Ok(())
    }

    /// Make sure an existing store was created in the configured mode.
    pub async fn check_layout(&self) -> MigrateResult<()> {
        let rows = self
            .executor
            .query(&format!("PRAGMA table_info('{}')", MASTER_TABLE), Vec::new())
            .await?;
        let has = |column: &str| rows.iter().any(|r| r.get_text("name") == Some(column));

        let required: &[&str] = match self.mode {
            FingerprintMode::Verbatim => &["name", "sql", "object"],
            FingerprintMode::Digest => &["name", "hash", "salt", "object"],
        };

        match required.iter().copied().find(|&column| !has(column)) {
            None => Ok(()),
            Some(column) => Err(MigrationError::store_layout(format!(
                "{} has no '{}' column; it was not created in {} mode",
                MASTER_TABLE, column, self.mode
            ))),
        }
    }

    /// Read every record.
    pub async fn records(&self) -> MigrateResult<FingerprintRecords> {
        let columns = match self.mode {
            FingerprintMode::Verbatim => "name, sql, object",
            FingerprintMode::Digest => "name, hash, salt, object",
        };
        let rows = self
            .executor
            .query(
                &format!("SELECT {} FROM {} ORDER BY id", columns, MASTER_TABLE),
                Vec::new(),
            )
            .await?;

        rows.iter()
            .map(|row| FingerprintRecord::from_row(self.mode, row).map(|r| (r.name.clone(), r)))
            .collect()
    }

    /// Check whether a candidate definition matches the recorded one.
    /// A table without a record never matches.
    pub async fn compare(&self, name: &str, candidate: &str) -> MigrateResult<bool> {
        let records = self.records().await?;
        let matches = records.get(name).is_some_and(|r| r.matches(candidate));
        debug!(table = name, matches, "Compared fingerprint");
        Ok(matches)
    }

    /// Clear all records and record every live user table anew, in one
    /// transaction.
    #[instrument(skip_all, fields(mode = %self.mode))]
    pub async fn refresh(&self, registry: &SchemaRegistry) -> MigrateResult<()> {
        let tables = catalog::user_tables(self.executor.as_ref()).await?;

        let mut statements = Vec::with_capacity(tables.len() + 1);
        statements.push(Statement::new(format!("DELETE FROM {}", MASTER_TABLE)));

        for table in &tables {
            let object = match registry.get(&table.name) {
                Some(model) => StoredValue::Text(serde_json::to_string(&model.scheme())?),
                None => StoredValue::Null,
            };

            let statement = match Fingerprint::of(self.mode, &table.sql) {
                Fingerprint::Verbatim { sql } => Statement::with_params(
                    format!("INSERT INTO {} (name, sql, object) VALUES (?, ?, ?)", MASTER_TABLE),
                    vec![table.name.as_str().into(), sql.into(), object],
                ),
                Fingerprint::Digest { hash, salt } => Statement::with_params(
                    format!(
                        "INSERT INTO {} (name, hash, salt, object) VALUES (?, ?, ?, ?)",
                        MASTER_TABLE
                    ),
                    vec![table.name.as_str().into(), hash.into(), salt.into(), object],
                ),
            };
            statements.push(statement);
        }

        self.executor.execute_atomic(statements).await?;
        info!(tables = tables.len(), "Fingerprints refreshed");
        Ok(())
    }

    /// Drop the store.
    pub async fn drop_store(&self) -> MigrateResult<()> {
        self.executor
            .execute(&format!("DROP TABLE IF EXISTS '{}'", MASTER_TABLE), Vec::new())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entities_schema::TableModel;
    use entities_sqlite::SqliteConnection;
    use serde_json::json;

    async fn setup(mode: FingerprintMode) -> (Arc<SqliteConnection>, FingerprintStore, SchemaRegistry) {
        let conn = Arc::new(SqliteConnection::open_in_memory().await.unwrap());
        conn.execute_batch("CREATE TABLE IF NOT EXISTS 't' (id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, uid TEXT)")
            .await
            .unwrap();
        let store = FingerprintStore::new(conn.clone(), mode);
        store.create().await.unwrap();

        let mut registry = SchemaRegistry::new();
        registry
            .register(TableModel::from_json("t", json!({"id": 0, "uid": ""})).unwrap())
            .unwrap();
        (conn, store, registry)
    }

    #[test]
    fn test_digest_is_salted() {
        let a = compute_digest("salt-a", "CREATE TABLE 't' (id INTEGER)");
        let b = compute_digest("salt-b", "CREATE TABLE 't' (id INTEGER)");
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(a, compute_digest("salt-a", "CREATE TABLE 't' (id INTEGER)"));
    }

    #[test]
    fn test_fingerprint_matches() {
        let sql = "CREATE TABLE 't' (id INTEGER)";
        for mode in [FingerprintMode::Verbatim, FingerprintMode::Digest] {
            let fp = Fingerprint::of(mode, sql);
            assert!(fp.matches(sql));
            assert!(!fp.matches("CREATE TABLE 't' (id TEXT)"));
        }
    }

    #[tokio::test]
    async fn test_refresh_records_live_tables() {
        for mode in [FingerprintMode::Verbatim, FingerprintMode::Digest] {
            let (_conn, store, registry) = setup(mode).await;
            store.refresh(&registry).await.unwrap();

            let records = store.records().await.unwrap();
            assert_eq!(records.len(), 1, "only the user table is recorded");
            let record = &records["t"];
            assert!(record.matches(
                "CREATE TABLE 't' (id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, uid TEXT)"
            ));
            assert_eq!(
                record.object.as_ref().map(|o| o.keys().cloned().collect::<Vec<_>>()),
                Some(vec!["id".to_string(), "uid".to_string()])
            );
        }
    }

    #[tokio::test]
    async fn test_refresh_replaces_previous_records() {
        let (conn, store, registry) = setup(FingerprintMode::Verbatim).await;
        store.refresh(&registry).await.unwrap();
        store.refresh(&registry).await.unwrap();
        assert_eq!(store.records().await.unwrap().len(), 1);

        conn.execute_batch("CREATE TABLE other (x TEXT)").await.unwrap();
        store.refresh(&registry).await.unwrap();
        let records = store.records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records["other"].object, None);
    }

    #[tokio::test]
    async fn test_compare() {
        let (_conn, store, registry) = setup(FingerprintMode::Digest).await;
        store.refresh(&registry).await.unwrap();

        let live = "CREATE TABLE 't' (id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, uid TEXT)";
        assert!(store.compare("t", live).await.unwrap());
        assert!(!store.compare("t", "CREATE TABLE 't' (id INTEGER)").await.unwrap());
        assert!(!store.compare("missing", live).await.unwrap());
    }

    #[tokio::test]
    async fn test_layout_mismatch() {
        let (conn, _store, _registry) = setup(FingerprintMode::Verbatim).await;
        let digest = FingerprintStore::new(conn, FingerprintMode::Digest);
        let err = digest.check_layout().await.unwrap_err();
        assert!(matches!(err, MigrationError::StoreLayout(_)));
    }

    #[tokio::test]
    async fn test_exists_and_drop() {
        let (_conn, store, _registry) = setup(FingerprintMode::Digest).await;
        assert!(store.exists().await.unwrap());
        store.check_layout().await.unwrap();
        store.drop_store().await.unwrap();
        assert!(!store.exists().await.unwrap());
    }
}
