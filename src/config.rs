//! Context configuration.

use entities_migrate::EngineConfig;
use entities_schema::{EntitiesConfig, FingerprintMode, MigrationPolicy};
use entities_sqlite::SqliteConfig;

use crate::error::Result;

/// Options for opening a [`Context`](crate::Context).
///
/// ```rust
/// use entities::{ContextConfig, MigrationPolicy};
///
/// let config = ContextConfig::new("sqlite://./app.db")
///     .cached(true)
///     .migration(MigrationPolicy::Alter);
/// assert!(config.cached);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    /// Connection string.
    pub url: String,
    /// Share one connection per connection string.
    pub cached: bool,
    /// Enforce foreign keys.
    pub foreign_keys: bool,
    /// Migration policy.
    pub migration: MigrationPolicy,
    /// Fingerprint mode.
    pub fingerprint: FingerprintMode,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self::memory()
    }
}

impl ContextConfig {
    /// Configuration for the given connection string.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            cached: false,
            foreign_keys: true,
            migration: MigrationPolicy::default(),
            fingerprint: FingerprintMode::default(),
        }
    }

    /// Configuration for a private in-memory database.
    pub fn memory() -> Self {
        Self::new("sqlite::memory:")
    }

    /// Set whether the connection is shared through the cache.
    pub fn cached(mut self, cached: bool) -> Self {
        self.cached = cached;
        self
    }

    /// Set the migration policy.
    pub fn migration(mut self, policy: MigrationPolicy) -> Self {
        self.migration = policy;
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

    /// The storage configuration.
    pub fn sqlite(&self) -> Result<SqliteConfig> {
        Ok(SqliteConfig::from_url(&self.url)?.foreign_keys(self.foreign_keys))
    }

    /// The migration engine configuration.
    pub fn engine(&self) -> EngineConfig {
        EngineConfig::new()
            .policy(self.migration)
            .fingerprint(self.fingerprint)
            .foreign_keys(self.foreign_keys)
    }
}

impl From<EntitiesConfig> for ContextConfig {
    fn from(config: EntitiesConfig) -> Self {
        Self {
            url: config.database.url,
            cached: config.database.cached,
            foreign_keys: config.database.foreign_keys,
            migration: config.migration.policy,
            fingerprint: config.migration.fingerprint,
        }
    }
}
