//! Process-wide cache of open connections.
//!
//! When caching is requested, every context opened with the same connection
//! string shares one handle. For in-memory databases this is the only way two
//! contexts can see the same data, since each new in-memory connection gets
//! its own private database.

use std::collections::HashMap;
use std::sync::LazyLock;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::config::SqliteConfig;
use crate::connection::SqliteConnection;
use crate::error::SqliteResult;

static CACHE: LazyLock<Mutex<HashMap<String, SqliteConnection>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Statistics about cache usage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached connections.
    pub connections: usize,
}

/// Access to the shared connection cache.
pub struct ConnectionCache;

impl ConnectionCache {
    /// Return the cached connection for this configuration, opening and
    /// caching a new one on first use.
    pub async fn get_or_open(config: SqliteConfig) -> SqliteResult<SqliteConnection> {
        let key = config.cache_key();

        let cached = CACHE.lock().get(&key).cloned();
        if let Some(conn) = cached {
            trace!(key = %key, "Reusing cached connection");
            return Ok(conn);
        }

        let opened = SqliteConnection::open(config).await?;

        // Another task may have opened the same database meanwhile; the first
        // one cached wins so that all callers share a single handle.
        let conn = CACHE.lock().entry(key.clone()).or_insert(opened).clone();
        debug!(key = %key, "Cached connection");
        Ok(conn)
    }

    /// Open a connection, through the cache when `cached` is set.
    pub async fn open(config: SqliteConfig, cached: bool) -> SqliteResult<SqliteConnection> {
        if cached {
            Self::get_or_open(config).await
        } else {
            SqliteConnection::open(config).await
        }
    }

    /// Whether a connection is cached under this key.
    pub fn contains(key: &str) -> bool {
        CACHE.lock().contains_key(key)
    }

    /// Remove a cached connection. Existing clones stay usable.
    pub fn evict(key: &str) -> bool {
        CACHE.lock().remove(key).is_some()
    }

    /// Get cache statistics.
    pub fn stats() -> CacheStats {
        CacheStats {
            connections: CACHE.lock().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Executor;

    #[tokio::test]
    async fn test_cached_connections_share_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache_share.db");

        let first = ConnectionCache::open(SqliteConfig::file(&path), true).await.unwrap();
        first.execute_batch("CREATE TABLE t (x INTEGER)").await.unwrap();

        let second = ConnectionCache::open(SqliteConfig::file(&path), true).await.unwrap();
        second.execute("INSERT INTO t VALUES (1)", Vec::new()).await.unwrap();

        let rows = first.query("SELECT x FROM t", Vec::new()).await.unwrap();
        assert_eq!(rows.len(), 1);

        let key = SqliteConfig::file(&path).cache_key();
        assert!(ConnectionCache::contains(&key));
        assert!(ConnectionCache::evict(&key));
        assert!(!ConnectionCache::contains(&key));
    }

    #[tokio::test]
    async fn test_uncached_memory_databases_are_private() {
        let first = ConnectionCache::open(SqliteConfig::memory(), false).await.unwrap();
        first.execute_batch("CREATE TABLE only_here (x INTEGER)").await.unwrap();

        let second = ConnectionCache::open(SqliteConfig::memory(), false).await.unwrap();
        assert!(second.query("SELECT * FROM only_here", Vec::new()).await.is_err());
    }
}
