//! The database context: table declarations, startup and typed access.

use std::sync::Arc;

use entities_migrate::{Difference, MigrationEngine, MigrationHandler};
use entities_schema::{SchemaRegistry, SchemaResult, TableModel};
use entities_sqlite::{ConnectionCache, Executor, SqliteConnection};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{error, info, instrument};

use crate::config::ContextConfig;
use crate::error::{Error, Result};
use crate::event::{AnnouncingHandler, ContextEvent, EventBus};
use crate::table::Table;

/// Collects table declarations and options, then opens a [`Context`].
///
/// ```rust,no_run
/// use entities::{Context, ContextConfig, TableModel};
/// use serde_json::json;
///
/// # async fn run() -> entities::Result<()> {
/// let db = Context::builder(ContextConfig::new("sqlite://./app.db"))
///     .table(TableModel::from_json("users", json!({"id": 0, "name": "", "active": false}))?)
///     .open()
///     .await?;
///
/// db.table("users")?.add(&json!({"name": "ada", "active": true})).await?;
/// # Ok(())
/// # }
/// ```
pub struct ContextBuilder {
    config: ContextConfig,
    declarations: Vec<SchemaResult<TableModel>>,
    handler: Option<Arc<dyn MigrationHandler>>,
    events: EventBus,
}

impl ContextBuilder {
    /// Start a builder with the given options.
    pub fn new(config: ContextConfig) -> Self {
        Self {
            config,
            declarations: Vec::new(),
            handler: None,
            events: EventBus::new(),
        }
    }

    /// Declare a table.
    pub fn table(mut self, model: TableModel) -> Self {
        self.declarations.push(Ok(model));
        self
    }

    /// Declare a table from a `{"name", "scheme", "mapping"?, "primary"?}`
    /// object. A malformed declaration fails [`open`](Self::open).
    pub fn declare(mut self, declaration: &Value) -> Self {
        self.declarations.push(TableModel::from_declaration(declaration));
        self
    }

    /// Register the handler for manual migrations.
    pub fn on_migration(mut self, handler: impl MigrationHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Subscribe to lifecycle events, including the ones emitted by
    /// [`open`](Self::open).
    pub fn subscribe(&self) -> broadcast::Receiver<ContextEvent> {
        self.events.subscribe()
    }

    /// Open the database, then seed or reconcile and migrate it.
    #[instrument(skip_all, fields(url = %self.config.url, policy = %self.config.migration))]
    pub async fn open(self) -> Result<Context> {
        let mut registry = SchemaRegistry::new();
        for declaration in self.declarations {
            registry.register(declaration?)?;
        }
        let registry = Arc::new(registry);

        let connection = match ConnectionCache::open(self.config.sqlite()?, self.config.cached).await {
            Ok(connection) => Arc::new(connection),
            Err(e) => {
                error!(error = %e, "Failed to open database");
                self.events.error(&e);
                return Err(e.into());
            }
        };

        let engine = MigrationEngine::new(connection.clone(), registry.clone(), self.config.engine());
        let handler = AnnouncingHandler {
            events: self.events.clone(),
            inner: self.handler,
        };

        let outcome = match engine.start(Some(&handler)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                if e.is_storage() {
                    self.events.error(&e);
                }
                return Err(e.into());
            }
        };

        info!(created = outcome.created, migrated = outcome.migrated, "Context ready");
        self.events.emit(ContextEvent::Ready {
            created: outcome.created,
            migrated: outcome.migrated,
        });

        Ok(Context {
            connection,
            registry,
            engine,
            events: self.events,
            created: outcome.created,
            migrated: outcome.migrated,
        })
    }
}

/// An open, reconciled database.
pub struct Context {
    connection: Arc<SqliteConnection>,
    registry: Arc<SchemaRegistry>,
    engine: MigrationEngine,
    events: EventBus,
    created: bool,
    migrated: bool,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("tables", &self.registry.names())
            .field("created", &self.created)
            .field("migrated", &self.migrated)
            .finish()
    }
}

impl Context {
    /// Start declaring a context.
    pub fn builder(config: ContextConfig) -> ContextBuilder {
        ContextBuilder::new(config)
    }

    /// Whether startup created tables.
    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Whether startup resolved differences.
    pub fn is_migrated(&self) -> bool {
        self.migrated
    }

    /// Typed access to a declared table.
    pub fn table(&self, name: &str) -> Result<Table> {
        Table::new(
            self.connection.clone(),
            self.registry.clone(),
            self.events.clone(),
            name,
        )
    }

    /// Names of the declared tables.
    pub fn tables(&self) -> Vec<&str> {
        self.registry.names()
    }

    /// The declared models.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// The connection, for statements of the caller's own.
    pub fn executor(&self) -> Arc<dyn Executor> {
        self.connection.clone()
    }

    /// The underlying connection.
    pub fn connection(&self) -> &SqliteConnection {
        &self.connection
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<ContextEvent> {
        self.events.subscribe()
    }

    /// Reconcile again and report the differences found, without resolving
    /// them.
    pub async fn differences(&self) -> Result<Vec<Difference>> {
        match self.engine.reconcile().await {
            Ok(reconciliation) => Ok(reconciliation.differences),
            Err(e) => {
                if e.is_storage() {
                    self.events.error(&e);
                }
                Err(Error::Migration(e))
            }
        }
    }
}
