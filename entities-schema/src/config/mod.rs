//! Configuration file parsing for `entities.toml`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use regex_lite::Regex;

use crate::error::{SchemaError, SchemaResult};

/// Main configuration structure for `entities.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EntitiesConfig {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Migration settings.
    #[serde(default)]
    pub migration: MigrationConfig,
}

impl EntitiesConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| SchemaError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        content.parse()
    }

    /// Get the database URL.
    pub fn database_url(&self) -> &str {
        &self.database.url
    }
}

impl FromStr for EntitiesConfig {
    type Err = SchemaError;

    fn from_str(content: &str) -> SchemaResult<Self> {
        let expanded = expand_env_vars(content);
        toml::from_str(&expanded).map_err(|e| SchemaError::TomlError { source: e })
    }
}

/// Database configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Connection URL (supports `${ENV_VAR}` interpolation).
    #[serde(default = "default_url")]
    pub url: String,

    /// Reuse an already open connection for the same URL.
    #[serde(default)]
    pub cached: bool,

    /// Enforce foreign key constraints.
    #[serde(default = "default_true")]
    pub foreign_keys: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            cached: false,
            foreign_keys: true,
        }
    }
}

fn default_url() -> String {
    "sqlite::memory:".to_string()
}

fn default_true() -> bool {
    true
}

/// Migration settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    /// What to do when the schema drifted.
    #[serde(default)]
    pub policy: MigrationPolicy,

    /// How table definitions are recorded.
    #[serde(default)]
    pub fingerprint: FingerprintMode,
}

/// How detected differences are resolved at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum MigrationPolicy {
    /// Hand the differences to a caller-supplied migration session.
    #[default]
    #[serde(rename = "manual")]
    Manual,
    /// Abort startup.
    #[serde(rename = "halt")]
    Halt,
    /// Drop every table and recreate the schema. Destroys all data.
    #[serde(rename = "dropCreate")]
    DropCreate,
    /// Add new columns; escalate everything else to a manual session.
    #[serde(rename = "alter")]
    Alter,
}

impl MigrationPolicy {
    /// The configuration name of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Halt => "halt",
            Self::DropCreate => "dropCreate",
            Self::Alter => "alter",
        }
    }
}

impl fmt::Display for MigrationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigrationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "halt" => Ok(Self::Halt),
            "dropCreate" | "drop_create" => Ok(Self::DropCreate),
            "alter" => Ok(Self::Alter),
            other => Err(format!("unknown migration policy '{}'", other)),
        }
    }
}

/// How the fingerprint store records table definitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintMode {
    /// Salted SHA-256 digest of the definition.
    #[default]
    Digest,
    /// The definition text itself.
    Verbatim,
}

impl FingerprintMode {
    /// The configuration name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Digest => "digest",
            Self::Verbatim => "verbatim",
        }
    }
}

impl fmt::Display for FingerprintMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FingerprintMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "digest" => Ok(Self::Digest),
            "verbatim" => Ok(Self::Verbatim),
            other => Err(format!("unknown fingerprint mode '{}'", other)),
        }
    }
}

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is a valid regex"));

/// Expand `${VAR}` references. Unset variables are left as written.
fn expand_env_vars(content: &str) -> String {
    ENV_VAR
        .replace_all(content, |caps: &regex_lite::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EntitiesConfig::default();
        assert_eq!(config.database_url(), "sqlite::memory:");
        assert!(!config.database.cached);
        assert!(config.database.foreign_keys);
        assert_eq!(config.migration.policy, MigrationPolicy::Manual);
        assert_eq!(config.migration.fingerprint, FingerprintMode::Digest);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [database]
            url = "sqlite://./app.db"
            cached = true

            [migration]
            policy = "dropCreate"
            fingerprint = "verbatim"
        "#;

        let config: EntitiesConfig = toml.parse().unwrap();
        assert_eq!(config.database_url(), "sqlite://./app.db");
        assert!(config.database.cached);
        assert_eq!(config.migration.policy, MigrationPolicy::DropCreate);
        assert_eq!(config.migration.fingerprint, FingerprintMode::Verbatim);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = "[database]\npool = 3\n".parse::<EntitiesConfig>().unwrap_err();
        assert!(matches!(err, SchemaError::TomlError { .. }));
    }

    #[test]
    fn test_unknown_policy_rejected() {
        assert!("[migration]\npolicy = \"yolo\"\n".parse::<EntitiesConfig>().is_err());
    }

    #[test]
    fn test_env_var_expansion() {
        // SAFETY: test-only environment mutation with a variable unique to this test
        unsafe {
            std::env::set_var("ENTITIES_TEST_DB_PATH", "/tmp/entities.db");
        }
        let config: EntitiesConfig = "[database]\nurl = \"sqlite://${ENTITIES_TEST_DB_PATH}\"\n"
            .parse()
            .unwrap();
        assert_eq!(config.database_url(), "sqlite:///tmp/entities.db");

        assert_eq!(
            expand_env_vars("${ENTITIES_TEST_SURELY_UNSET}"),
            "${ENTITIES_TEST_SURELY_UNSET}"
        );
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("alter".parse::<MigrationPolicy>().unwrap(), MigrationPolicy::Alter);
        assert_eq!("dropCreate".parse::<MigrationPolicy>().unwrap(), MigrationPolicy::DropCreate);
        assert!("other".parse::<MigrationPolicy>().is_err());
        assert_eq!(MigrationPolicy::DropCreate.to_string(), "dropCreate");
    }

    #[test]
    fn test_fingerprint_from_str() {
        assert_eq!("digest".parse::<FingerprintMode>().unwrap(), FingerprintMode::Digest);
        assert_eq!("verbatim".parse::<FingerprintMode>().unwrap(), FingerprintMode::Verbatim);
        assert!("md5".parse::<FingerprintMode>().is_err());
    }
}
