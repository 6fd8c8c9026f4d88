use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context as _;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::cache::CacheService;

/// Compile-time discovered SQLx migrations for the `warden-database` crate.
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Shared database handle passed across crates.
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
    cache: CacheService,
}

impl Database {
    /// Create a database handle from an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            cache: CacheService::disabled("warden:prod"),
        }
    }

    /// Create a database handle from an existing pool and cache service.
    pub fn with_cache(pool: SqlitePool, cache: CacheService) -> Self {
        Self { pool, cache }
    }

    /// Open the single-file store for `guild_id` under `data_dir`, creating
    /// the directory and the file when they do not exist yet.
    pub async fn open_guild_pool(data_dir: &Path, guild_id: u64) -> anyhow::Result<SqlitePool> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .with_context(|| format!("failed to create data dir `{}`", data_dir.display()))?;

        let options = SqliteConnectOptions::new()
            .filename(guild_database_path(data_dir, guild_id))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(pool)
    }

    /// Migrated in-memory store. A single pinned connection keeps the
    /// database alive for the lifetime of the pool.
    pub async fn connect_in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        MIGRATOR.run(&pool).await?;

        Ok(Self::new(pool))
    }

    /// Expose the underlying pool for query modules.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Expose the cache service for query modules.
    pub fn cache(&self) -> &CacheService {
        &self.cache
    }
}

/// `<data_dir>/<guild_id>.db`
pub fn guild_database_path(data_dir: &Path, guild_id: u64) -> PathBuf {
    data_dir.join(format!("{guild_id}.db"))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::guild_database_path;

    #[test]
    fn guild_database_lives_under_data_dir() {
        assert_eq!(
            guild_database_path(Path::new("data"), 42),
            Path::new("data").join("42.db")
        );
    }
}
