//! The startup migration engine.
//!
//! ```text
//!                 ┌───────────── no store ─────────────┐
//!                 │                                    ▼
//! unchecked ──▶ store? ──▶ reconciling ──▶ in-sync ──▶ seed / ready
//!                              │
//!                              ▼
//!                       awaiting-policy ──▶ manual | halt | dropCreate | alter
//! ```

use std::sync::Arc;

use entities_schema::{DdlGenerator, FingerprintMode, MigrationPolicy, SchemaRegistry};
use entities_sqlite::{Executor, catalog};
use tracing::{error, info, instrument, warn};

use crate::diff::{Difference, PREDATES_STORE, SchemeDelta};
use crate::error::{MigrateResult, MigrationError};
use crate::fingerprint::{FingerprintRecords, FingerprintStore};
use crate::reconcile::{Reconciler, Reconciliation};
use crate::session::{MigrationHandler, MigrationSession, SessionState};

/// Configuration for the migration engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// How differences are resolved.
    pub policy: MigrationPolicy,
    /// How definitions are recorded.
    pub fingerprint: FingerprintMode,
    /// Whether foreign keys are enforced on the connection.
    pub foreign_keys: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy: MigrationPolicy::default(),
            fingerprint: FingerprintMode::default(),
            foreign_keys: true,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the migration policy.
    pub fn policy(mut self, policy: MigrationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the fingerprint mode.
    pub fn fingerprint(mut self, mode: FingerprintMode) -> Self {
        self.fingerprint = mode;
        self
    }

    /// Set whether foreign keys are enforced.
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }
}

/// What startup did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupOutcome {
    /// Tables were created from their models.
    pub created: bool,
    /// Differences were found and resolved.
    pub migrated: bool,
    /// The differences found by reconciliation.
    pub differences: Vec<Difference>,
}

/// Statements planned by the alter policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlterPlan {
    /// `ALTER TABLE .. ADD COLUMN` statements, in order.
    pub statements: Vec<String>,
    /// Differences the alter policy can't settle.
    pub unresolved: Vec<Difference>,
}

/// Brings the database in line with the declared models at startup.
pub struct MigrationEngine {
    executor: Arc<dyn Executor>,
    registry: Arc<SchemaRegistry>,
    store: FingerprintStore,
    config: EngineConfig,
}

impl MigrationEngine {
    /// Create a new engine.
    pub fn new(executor: Arc<dyn Executor>, registry: Arc<SchemaRegistry>, config: EngineConfig) -> Self {
        let store = FingerprintStore::new(executor.clone(), config.fingerprint);
        Self {
            executor,
            registry,
            store,
            config,
        }
    }

    /// The fingerprint store.
    pub fn store(&self) -> &FingerprintStore {
        &self.store
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the startup sequence: seed a fresh database, or reconcile an
    /// existing one and resolve its differences under the configured policy.
    #[instrument(skip_all, fields(policy = %self.config.policy, fingerprint = %self.config.fingerprint))]
    pub async fn start(&self, handler: Option<&dyn MigrationHandler>) -> MigrateResult<StartupOutcome> {
        self.registry.validate()?;

        if !self.store.exists().await? {
            let conflicts = self.seed_conflicts().await?;
            if !conflicts.is_empty() {
                if self.config.policy == MigrationPolicy::Halt {
                    return Err(MigrationError::Halted { differences: conflicts });
                }
                self.replace_conflicting(&conflicts).await?;
            }

            self.seed().await?;
            info!(tables = self.registry.len(), "Database seeded");
            return Ok(StartupOutcome {
                created: true,
                migrated: !conflicts.is_empty(),
                differences: conflicts,
            });
        }

        self.store.check_layout().await?;
        let reconciliation = self.reconcile().await?;

        if reconciliation.is_in_sync() {
            let created = self.create_missing(&reconciliation.missing).await?;
            if created {
                self.store.refresh(&self.registry).await?;
            }
            return Ok(StartupOutcome {
                created,
                ..Default::default()
            });
        }

        let differences = reconciliation.differences.clone();
        let mut outcome = match self.resolve(reconciliation, handler).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Migration failed");
                return Err(e);
            }
        };
        outcome.differences = differences;
        info!(created = outcome.created, migrated = outcome.migrated, "Migration complete");
        Ok(outcome)
    }

    /// Run both reconciliation checks.
    pub async fn reconcile(&self) -> MigrateResult<Reconciliation> {
        Reconciler::new(self.executor.clone(), &self.store, &self.registry)
            .run()
            .await
    }

    async fn resolve(
        &self,
        reconciliation: Reconciliation,
        handler: Option<&dyn MigrationHandler>,
    ) -> MigrateResult<StartupOutcome> {
        let Reconciliation {
            differences,
            missing,
            records,
        } = reconciliation;

        let mut changed = false;
        match self.config.policy {
            MigrationPolicy::Halt => {
                return Err(MigrationError::Halted { differences });
            }
            MigrationPolicy::DropCreate => {
                self.drop_create().await?;
                return Ok(StartupOutcome {
                    created: true,
                    migrated: true,
                    differences: Vec::new(),
                });
            }
            MigrationPolicy::Manual => {
                self.check_renames(&differences, &records)?;
                changed = self.manual(differences, handler).await?;
            }
            MigrationPolicy::Alter => {
                self.check_renames(&differences, &records)?;
                let plan = self.plan_alter(&differences, &records)?;
                if !plan.statements.is_empty() {
                    info!(statements = plan.statements.len(), "Altering tables");
                    self.executor.execute_sequence(&plan.statements).await?;
                    changed = true;
                }
                if !plan.unresolved.is_empty() {
                    warn!(unresolved = plan.unresolved.len(), "Escalating to a manual migration");
                    changed |= self.manual(plan.unresolved, handler).await?;
                }
            }
        }

        // Records keep describing the old tables until a statement changes them.
        let created = self.create_missing(&missing).await?;
        if changed || created {
            self.store.refresh(&self.registry).await?;
        }

        Ok(StartupOutcome {
            created,
            migrated: true,
            differences: Vec::new(),
        })
    }

    /// Create every declared table, the store, and record all fingerprints.
    pub async fn seed(&self) -> MigrateResult<()> {
        let mut statements = self
            .registry
            .iter()
            .map(|model| DdlGenerator.create_table(model))
            .collect::<Result<Vec<_>, _>>()?;
        statements.push(self.store.create_sql().to_string());

        self.executor.execute_sequence(&statements).await?;
        self.store.refresh(&self.registry).await
    }

    /// Declared tables that already exist live with a definition other than
    /// their model's. Only meaningful before the store exists.
    async fn seed_conflicts(&self) -> MigrateResult<Vec<Difference>> {
        let mut conflicts = Vec::new();
        for model in self.registry.iter() {
            let Some(live) = catalog::table_sql(self.executor.as_ref(), model.name()).await? else {
                continue;
            };
            if live != DdlGenerator.catalog_create_table(model)? {
                warn!(table = model.name(), "Existing table doesn't match its model");
                conflicts.push(Difference::object(model.name(), PREDATES_STORE));
            }
        }
        Ok(conflicts)
    }

    /// Drop the conflicting tables so seeding recreates them from their models.
    async fn replace_conflicting(&self, conflicts: &[Difference]) -> MigrateResult<()> {
        warn!(tables = conflicts.len(), "Recreating tables that predate the store");
        let drops: Vec<String> = conflicts
            .iter()
            .map(|d| DdlGenerator.drop_table(&d.name))
            .collect();

        self.executor.execute_batch("PRAGMA foreign_keys = OFF").await?;
        let result = self.executor.execute_sequence(&drops).await;
        if self.config.foreign_keys {
            self.executor.execute_batch("PRAGMA foreign_keys = ON").await?;
        }
        Ok(result?)
    }

    /// Drop every user table and the store, then seed again. All data is lost.
    pub async fn drop_create(&self) -> MigrateResult<()> {
        warn!("Dropping and recreating all tables");
        self.executor.execute_batch("PRAGMA foreign_keys = OFF").await?;

        let result = self.drop_all().await;
        let result = match result {
            Ok(()) => self.seed().await,
            Err(e) => Err(e),
        };

        if self.config.foreign_keys {
            self.executor.execute_batch("PRAGMA foreign_keys = ON").await?;
        }
        result
    }

    async fn drop_all(&self) -> MigrateResult<()> {
        let tables = catalog::user_tables(self.executor.as_ref()).await?;
        let drops: Vec<String> = tables
            .iter()
            .rev()
            .map(|t| DdlGenerator.drop_table(&t.name))
            .collect();
        self.executor.execute_sequence(&drops).await?;
        self.store.drop_store().await
    }

    /// Refuse object differences that look like column renames.
    fn check_renames(&self, differences: &[Difference], records: &FingerprintRecords) -> MigrateResult<()> {
        for difference in differences.iter().filter(|d| d.is_object()) {
            let (Some(model), Some(stored)) = (
                self.registry.get(&difference.name),
                records.get(&difference.name).and_then(|r| r.object.as_ref()),
            ) else {
                continue;
            };

            let delta = SchemeDelta::between(stored, model);
            if delta.is_rename() {
                return Err(MigrationError::unsupported(
                    &difference.name,
                    format!(
                        "columns {:?} replaced by {:?}; renames are not supported",
                        delta.removed, delta.added
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Plan the additive changes for object differences.
    ///
    /// Added columns become `ADD COLUMN` statements. Removed columns are
    /// refused. Physical differences, and object differences without a column
    /// change to apply, are left unresolved.
    pub fn plan_alter(&self, differences: &[Difference], records: &FingerprintRecords) -> MigrateResult<AlterPlan> {
        let mut plan = AlterPlan::default();

        for difference in differences {
            let target = difference
                .is_object()
                .then(|| self.registry.get(&difference.name))
                .flatten()
                .zip(records.get(&difference.name).and_then(|r| r.object.as_ref()));

            let Some((model, stored)) = target else {
                plan.unresolved.push(difference.clone());
                continue;
            };

            let delta = SchemeDelta::between(stored, model);
            if !delta.removed.is_empty() {
                return Err(MigrationError::unsupported(
                    model.name(),
                    format!("removing columns {:?} is not supported", delta.removed),
                ));
            }
            if delta.added.is_empty() {
                plan.unresolved.push(difference.clone());
                continue;
            }

            // SQLite appends added columns after the existing ones, so the
            // model must declare them last to match the altered table.
            let kept = model.columns().len() - delta.added.len();
            if model.columns()[kept..].iter().any(|c| stored.contains_key(c.name())) {
                return Err(MigrationError::unsupported(
                    model.name(),
                    format!("new columns {:?} must be declared after the existing ones", delta.added),
                ));
            }

            for name in &delta.added {
                let Some(column) = model.get_column(name) else {
                    continue;
                };
                let constrained = model
                    .mapping(name)
                    .is_some_and(|m| m.unique || m.foreign.is_some() || m.is_not_null());
                if constrained || model.is_primary(name) {
                    return Err(MigrationError::unsupported(
                        model.name(),
                        format!("column '{}' carries constraints that ALTER TABLE can't add", name),
                    ));
                }
                plan.statements.push(DdlGenerator.add_column(model, column));
            }
        }

        Ok(plan)
    }

    /// Hand differences to the handler. Returns whether the session ran any
    /// statement.
    async fn manual(&self, differences: Vec<Difference>, handler: Option<&dyn MigrationHandler>) -> MigrateResult<bool> {
        let Some(handler) = handler else {
            return Err(MigrationError::NoHandler { differences });
        };

        let mut session = MigrationSession::new(
            self.executor.clone(),
            self.store.clone(),
            self.registry.clone(),
            differences.clone(),
        );
        handler.on_migration(&mut session, &differences).await?;

        match session.state() {
            SessionState::Accepted => Ok(session.is_changed()),
            SessionState::Rejected(reason) => Err(MigrationError::Rejected(reason.clone())),
            SessionState::Open => Err(MigrationError::session(
                "migration handler returned without accepting or rejecting the session",
            )),
        }
    }

    /// Create declared tables that don't exist yet. Returns whether any were
    /// created.
    async fn create_missing(&self, missing: &[String]) -> MigrateResult<bool> {
        let mut statements = Vec::new();
        for name in missing {
            if catalog::table_exists(self.executor.as_ref(), name).await? {
                continue;
            }
            if let Some(model) = self.registry.get(name) {
                statements.push(DdlGenerator.create_table(model)?);
            }
        }

        if statements.is_empty() {
            return Ok(false);
        }
        info!(tables = statements.len(), "Creating new tables");
        self.executor.execute_sequence(&statements).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{ALTERED_BY_MODEL, ALTERED_OUTSIDE, PREDATES_STORE};
    use async_trait::async_trait;
    use entities_schema::{ColumnMapping, MASTER_TABLE, TableModel};
    use entities_sqlite::SqliteConnection;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn registry(models: Vec<TableModel>) -> Arc<SchemaRegistry> {
        let mut registry = SchemaRegistry::new();
        for model in models {
            registry.register(model).unwrap();
        }
        Arc::new(registry)
    }

    fn users(scheme: Value) -> TableModel {
        TableModel::from_json("t", scheme).unwrap()
    }

    fn base() -> Arc<SchemaRegistry> {
        registry(vec![users(json!({"id": 0, "uid": "", "active": false}))])
    }

    fn engine(conn: &Arc<SqliteConnection>, registry: Arc<SchemaRegistry>, policy: MigrationPolicy) -> MigrationEngine {
        MigrationEngine::new(
            conn.clone(),
            registry,
            EngineConfig::new()
                .policy(policy)
                .fingerprint(FingerprintMode::Verbatim),
        )
    }

    async fn seeded() -> Arc<SqliteConnection> {
        let conn = Arc::new(SqliteConnection::open_in_memory().await.unwrap());
        let outcome = engine(&conn, base(), MigrationPolicy::Manual)
            .start(None)
            .await
            .unwrap();
        assert!(outcome.created);
        conn
    }

    async fn table_sql(conn: &Arc<SqliteConnection>, name: &str) -> Option<String> {
        catalog::table_sql(conn.as_ref(), name).await.unwrap()
    }

    struct AddCreated;

    #[async_trait]
    impl MigrationHandler for AddCreated {
        async fn on_migration(&self, session: &mut MigrationSession, differences: &[Difference]) -> MigrateResult<()> {
            for difference in differences {
                session.resolve(&difference.name, "ALTER TABLE 't' ADD COLUMN created INTEGER")?;
            }
            session.run().await?;
            session.accept().await
        }
    }

    struct Refuse;

    #[async_trait]
    impl MigrationHandler for Refuse {
        async fn on_migration(&self, session: &mut MigrationSession, _: &[Difference]) -> MigrateResult<()> {
            Err(session.reject("not now"))
        }
    }

    struct AcknowledgeOnly;

    #[async_trait]
    impl MigrationHandler for AcknowledgeOnly {
        async fn on_migration(&self, session: &mut MigrationSession, differences: &[Difference]) -> MigrateResult<()> {
            for difference in differences {
                session.acknowledge(&difference.name)?;
            }
            session.accept().await
        }
    }

    struct Silent;

    #[async_trait]
    impl MigrationHandler for Silent {
        async fn on_migration(&self, _: &mut MigrationSession, _: &[Difference]) -> MigrateResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_fresh_database_is_seeded() {
        let conn = seeded().await;
        assert!(table_sql(&conn, "t").await.is_some());
        assert!(table_sql(&conn, MASTER_TABLE).await.is_some());

        let outcome = engine(&conn, base(), MigrationPolicy::Halt).start(None).await.unwrap();
        assert_eq!(outcome, StartupOutcome::default());
    }

    #[tokio::test]
    async fn test_halt_aborts_before_any_change() {
        let conn = seeded().await;
        conn.execute_batch("ALTER TABLE t ADD COLUMN sneaky TEXT").await.unwrap();
        let before = table_sql(&conn, "t").await;

        let err = engine(&conn, base(), MigrationPolicy::Halt)
            .start(None)
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::Halted { .. }));
        assert_eq!(err.differences(), &[Difference::physical("t", ALTERED_OUTSIDE)]);
        assert_eq!(table_sql(&conn, "t").await, before);
    }

    #[tokio::test]
    async fn test_alter_adds_trailing_column() {
        let conn = seeded().await;
        conn.execute(
            "INSERT INTO t (uid, active) VALUES (?, ?)",
            vec!["a".into(), 1i64.into()],
        )
        .await
        .unwrap();

        let changed = registry(vec![users(json!({"id": 0, "uid": "", "active": false, "created": 0}))]);
        let engine = engine(&conn, changed.clone(), MigrationPolicy::Alter);

        let reconciliation = engine.reconcile().await.unwrap();
        let plan = engine
            .plan_alter(&reconciliation.differences, &reconciliation.records)
            .unwrap();
        assert_eq!(plan.statements, vec!["ALTER TABLE 't' ADD COLUMN created INTEGER".to_string()]);
        assert!(plan.unresolved.is_empty());

        let outcome = engine.start(None).await.unwrap();
        assert!(outcome.migrated);
        assert_eq!(outcome.differences, vec![Difference::object("t", ALTERED_BY_MODEL)]);

        let rows = conn.query("SELECT uid, created FROM t", Vec::new()).await.unwrap();
        assert_eq!(rows.len(), 1);

        // The altered table now matches the model, so the next run is quiet.
        let outcome = engine.start(None).await.unwrap();
        assert_eq!(outcome, StartupOutcome::default());
    }

    #[tokio::test]
    async fn test_rename_is_refused() {
        for policy in [MigrationPolicy::Alter, MigrationPolicy::Manual] {
            let conn = seeded().await;
            let renamed = registry(vec![users(json!({"id": 0, "uid": "", "enabled": false}))]);
            let err = engine(&conn, renamed, policy)
                .start(Some(&AddCreated))
                .await
                .unwrap_err();
            assert!(matches!(err, MigrationError::Unsupported { ref table, .. } if table == "t"));
        }
    }

    #[tokio::test]
    async fn test_alter_refuses_removal() {
        let conn = seeded().await;
        let fewer = registry(vec![users(json!({"id": 0, "uid": ""}))]);
        let err = engine(&conn, fewer, MigrationPolicy::Alter)
            .start(None)
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::Unsupported { .. }));
    }

    #[tokio::test]
    async fn test_alter_refuses_constrained_or_misplaced_columns() {
        let conn = seeded().await;

        let constrained = registry(vec![
            users(json!({"id": 0, "uid": "", "active": false}))
                .column_with("email", json!(""), ColumnMapping::new().unique()),
        ]);
        let engine_a = engine(&conn, constrained, MigrationPolicy::Alter);
        let r = engine_a.reconcile().await.unwrap();
        assert!(engine_a.plan_alter(&r.differences, &r.records).is_err());

        let misplaced = registry(vec![users(json!({"id": 0, "created": 0, "uid": "", "active": false}))]);
        let engine_b = engine(&conn, misplaced, MigrationPolicy::Alter);
        let r = engine_b.reconcile().await.unwrap();
        assert!(engine_b.plan_alter(&r.differences, &r.records).is_err());
    }

    #[tokio::test]
    async fn test_alter_escalates_physical_drift() {
        let conn = seeded().await;
        conn.execute_batch("ALTER TABLE t ADD COLUMN sneaky TEXT").await.unwrap();

        let err = engine(&conn, base(), MigrationPolicy::Alter)
            .start(None)
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::NoHandler { .. }));
    }

    #[tokio::test]
    async fn test_drop_create_rebuilds_everything() {
        let conn = seeded().await;
        conn.execute("INSERT INTO t (uid) VALUES ('x')", Vec::new()).await.unwrap();
        conn.execute_batch("ALTER TABLE t ADD COLUMN sneaky TEXT").await.unwrap();

        let outcome = engine(&conn, base(), MigrationPolicy::DropCreate)
            .start(None)
            .await
            .unwrap();
        assert!(outcome.created && outcome.migrated);

        let rows = conn.query("SELECT * FROM t", Vec::new()).await.unwrap();
        assert!(rows.is_empty());
        assert!(!table_sql(&conn, "t").await.unwrap().contains("sneaky"));

        let fk = conn.query("PRAGMA foreign_keys", Vec::new()).await.unwrap();
        assert_eq!(fk[0].get("foreign_keys").and_then(|v| v.as_integer()), Some(1));

        let outcome = engine(&conn, base(), MigrationPolicy::Halt).start(None).await.unwrap();
        assert_eq!(outcome, StartupOutcome::default());
    }

    #[tokio::test]
    async fn test_manual_session_resolves_differences() {
        let conn = seeded().await;
        let changed = registry(vec![users(json!({"id": 0, "uid": "", "active": false, "created": 0}))]);

        let outcome = engine(&conn, changed.clone(), MigrationPolicy::Manual)
            .start(Some(&AddCreated))
            .await
            .unwrap();
        assert!(outcome.migrated);
        assert!(table_sql(&conn, "t").await.unwrap().contains("created INTEGER"));

        let outcome = engine(&conn, changed, MigrationPolicy::Halt).start(None).await.unwrap();
        assert_eq!(outcome, StartupOutcome::default());
    }

    #[tokio::test]
    async fn test_manual_session_outcomes() {
        let conn = seeded().await;
        let changed = registry(vec![users(json!({"id": 0, "uid": "", "active": false, "created": 0}))]);
        let engine = engine(&conn, changed, MigrationPolicy::Manual);

        assert!(matches!(
            engine.start(None).await.unwrap_err(),
            MigrationError::NoHandler { .. }
        ));
        assert!(matches!(
            engine.start(Some(&Refuse)).await.unwrap_err(),
            MigrationError::Rejected(ref r) if r == "not now"
        ));
        assert!(matches!(
            engine.start(Some(&Silent)).await.unwrap_err(),
            MigrationError::Session(_)
        ));
        assert!(!table_sql(&conn, "t").await.unwrap().contains("created"));
    }

    #[tokio::test]
    async fn test_acknowledged_session_keeps_old_records() {
        let conn = seeded().await;
        let changed = registry(vec![users(json!({"id": 0, "uid": "", "active": false, "created": 0}))]);

        let outcome = engine(&conn, changed.clone(), MigrationPolicy::Manual)
            .start(Some(&AcknowledgeOnly))
            .await
            .unwrap();
        assert!(outcome.migrated);
        assert!(!table_sql(&conn, "t").await.unwrap().contains("created"));

        // Nothing ran, so the difference is still there for the alter policy.
        let engine = engine(&conn, changed, MigrationPolicy::Alter);
        let reconciliation = engine.reconcile().await.unwrap();
        let plan = engine
            .plan_alter(&reconciliation.differences, &reconciliation.records)
            .unwrap();
        assert_eq!(plan.statements, vec!["ALTER TABLE 't' ADD COLUMN created INTEGER".to_string()]);

        engine.start(None).await.unwrap();
        assert!(table_sql(&conn, "t").await.unwrap().contains("created INTEGER"));
        assert_eq!(engine.start(None).await.unwrap(), StartupOutcome::default());
    }

    #[tokio::test]
    async fn test_table_predating_store_halts() {
        let conn = Arc::new(SqliteConnection::open_in_memory().await.unwrap());
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, uid TEXT)").await.unwrap();

        let err = engine(&conn, base(), MigrationPolicy::Halt)
            .start(None)
            .await
            .unwrap_err();
        assert_eq!(err.differences(), &[Difference::object("t", PREDATES_STORE)]);
        assert!(table_sql(&conn, MASTER_TABLE).await.is_none());
        assert!(!table_sql(&conn, "t").await.unwrap().contains("active"));
    }

    #[tokio::test]
    async fn test_table_predating_store_is_recreated() {
        let conn = Arc::new(SqliteConnection::open_in_memory().await.unwrap());
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, uid TEXT)").await.unwrap();

        let outcome = engine(&conn, base(), MigrationPolicy::Manual).start(None).await.unwrap();
        assert!(outcome.created && outcome.migrated);
        assert_eq!(outcome.differences, vec![Difference::object("t", PREDATES_STORE)]);
        assert!(table_sql(&conn, "t").await.unwrap().contains("active"));

        conn.execute("INSERT INTO t (uid, active) VALUES ('a', 1)", Vec::new())
            .await
            .unwrap();
        let outcome = engine(&conn, base(), MigrationPolicy::Halt).start(None).await.unwrap();
        assert_eq!(outcome, StartupOutcome::default());
    }

    #[tokio::test]
    async fn test_matching_table_predating_store_is_kept() {
        let conn = Arc::new(SqliteConnection::open_in_memory().await.unwrap());
        let model = users(json!({"id": 0, "uid": "", "active": false}));
        conn.execute_batch(&DdlGenerator.create_table(&model).unwrap()).await.unwrap();
        conn.execute("INSERT INTO t (uid) VALUES ('kept')", Vec::new()).await.unwrap();

        let outcome = engine(&conn, base(), MigrationPolicy::Halt).start(None).await.unwrap();
        assert!(outcome.created && !outcome.migrated);

        let rows = conn.query("SELECT uid FROM t", Vec::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_new_model_table_is_created() {
        let conn = seeded().await;
        let more = registry(vec![
            users(json!({"id": 0, "uid": "", "active": false})),
            TableModel::from_json("u", json!({"id": 0, "name": ""})).unwrap(),
        ]);

        let outcome = engine(&conn, more.clone(), MigrationPolicy::Halt).start(None).await.unwrap();
        assert!(outcome.created);
        assert!(!outcome.migrated);
        assert!(table_sql(&conn, "u").await.is_some());

        let outcome = engine(&conn, more, MigrationPolicy::Halt).start(None).await.unwrap();
        assert_eq!(outcome, StartupOutcome::default());
    }

    #[tokio::test]
    async fn test_store_layout_mismatch() {
        let conn = seeded().await;
        let digest = MigrationEngine::new(
            conn.clone(),
            base(),
            EngineConfig::new().fingerprint(FingerprintMode::Digest),
        );
        assert!(matches!(
            digest.start(None).await.unwrap_err(),
            MigrationError::StoreLayout(_)
        ));
    }
}
