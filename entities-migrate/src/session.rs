//! Manual migration sessions.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use entities_schema::SchemaRegistry;
use entities_sqlite::Executor;
use tracing::{info, warn};

use crate::diff::Difference;
use crate::error::{MigrateResult, MigrationError};
use crate::fingerprint::FingerprintStore;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Statements may be prepared and run.
    Open,
    /// The session was accepted.
    Accepted,
    /// The session was rejected with a reason.
    Rejected(String),
}

/// A caller-driven migration.
///
/// Statements are queued with [`prepare`](Self::prepare) and executed in
/// order by [`run`](Self::run). Every listed difference must be acknowledged
/// before [`accept`](Self::accept) succeeds; [`resolve`](Self::resolve)
/// prepares a statement and acknowledges its table in one call.
pub struct MigrationSession {
    executor: Arc<dyn Executor>,
    store: FingerprintStore,
    registry: Arc<SchemaRegistry>,
    differences: Vec<Difference>,
    pending: Vec<String>,
    acknowledged: HashSet<String>,
    changed: bool,
    state: SessionState,
}

impl std::fmt::Debug for MigrationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationSession")
            .field("differences", &self.differences)
            .field("pending", &self.pending)
            .field("changed", &self.changed)
            .field("state", &self.state)
            .finish()
    }
}

impl MigrationSession {
    /// Create an open session for the given differences.
    pub fn new(
        executor: Arc<dyn Executor>,
        store: FingerprintStore,
        registry: Arc<SchemaRegistry>,
        differences: Vec<Difference>,
    ) -> Self {
        Self {
            executor,
            store,
            registry,
            differences,
            pending: Vec::new(),
            acknowledged: HashSet::new(),
            changed: false,
            state: SessionState::Open,
        }
    }

    /// The differences this session has to settle.
    pub fn differences(&self) -> &[Difference] {
        &self.differences
    }

    /// Statements prepared but not yet run.
    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    /// Whether any statement was run.
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// The lifecycle state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Whether the session was accepted.
    pub fn is_accepted(&self) -> bool {
        self.state == SessionState::Accepted
    }

    /// Names of listed differences that haven't been acknowledged yet.
    pub fn unacknowledged(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for d in &self.differences {
            if !self.acknowledged.contains(&d.name) && !names.contains(&d.name) {
                names.push(d.name.clone());
            }
        }
        names
    }

    fn ensure_open(&self) -> MigrateResult<()> {
        match &self.state {
            SessionState::Open => Ok(()),
            SessionState::Accepted => Err(MigrationError::session("session was already accepted")),
            SessionState::Rejected(_) => Err(MigrationError::session("session was already rejected")),
        }
    }

    /// Queue a statement.
    pub fn prepare(&mut self, sql: impl Into<String>) -> MigrateResult<&mut Self> {
        self.ensure_open()?;
        self.pending.push(sql.into());
        Ok(self)
    }

    /// Mark a difference as settled.
    pub fn acknowledge(&mut self, name: &str) -> MigrateResult<&mut Self> {
        self.ensure_open()?;
        if !self.differences.iter().any(|d| d.name == name) {
            return Err(MigrationError::session(format!(
                "'{}' is not among the listed differences",
                name
            )));
        }
        self.acknowledged.insert(name.to_string());
        Ok(self)
    }

    /// Queue a statement settling a difference, and acknowledge it.
    pub fn resolve(&mut self, name: &str, sql: impl Into<String>) -> MigrateResult<&mut Self> {
        self.acknowledge(name)?;
        self.prepare(sql)
    }

    /// Run the queued statements in order. The first failure stops the run
    /// and leaves the remaining statements unrun.
    pub async fn run(&mut self) -> MigrateResult<()> {
        self.ensure_open()?;
        if self.pending.is_empty() {
            return Ok(());
        }

        let statements = std::mem::take(&mut self.pending);
        info!(statements = statements.len(), "Running migration statements");
        self.changed = true;
        self.executor.execute_sequence(&statements).await?;
        Ok(())
    }

    /// Finish the session. Fails if statements are still queued or a listed
    /// difference was not acknowledged. Refreshes the fingerprints if any
    /// statement ran.
    pub async fn accept(&mut self) -> MigrateResult<()> {
        self.ensure_open()?;

        if !self.pending.is_empty() {
            return Err(MigrationError::session(format!(
                "{} prepared statement(s) were never run",
                self.pending.len()
            )));
        }

        let unacknowledged = self.unacknowledged();
        if !unacknowledged.is_empty() {
            return Err(MigrationError::Unacknowledged(unacknowledged));
        }

        if self.changed {
            self.store.refresh(&self.registry).await?;
        }

        self.state = SessionState::Accepted;
        info!(changed = self.changed, "Migration session accepted");
        Ok(())
    }

    /// Abort the migration. Returns the error to propagate.
    pub fn reject(&mut self, reason: impl Into<String>) -> MigrationError {
        let reason = reason.into();
        warn!(reason = %reason, "Migration session rejected");
        self.state = SessionState::Rejected(reason.clone());
        MigrationError::Rejected(reason)
    }
}

/// Receives the differences that need a manual migration.
#[async_trait]
pub trait MigrationHandler: Send + Sync {
    /// Settle the differences through the session: prepare and run
    /// statements, acknowledge every difference, then accept or reject.
    async fn on_migration(
        &self,
        session: &mut MigrationSession,
        differences: &[Difference],
    ) -> MigrateResult<()>;
}
