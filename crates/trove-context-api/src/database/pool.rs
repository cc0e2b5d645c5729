use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Sqlite, Transaction};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::utils::error::ContextError;

#[derive(Clone)]
pub struct DbPool {
    pool: SqlitePool,
}

impl DbPool {
    /// Open the store, creating the file and applying migrations when needed.
    pub async fn new(config: &StorageConfig) -> Result<Self, ContextError> {
        let in_memory = config.url.contains(":memory:");

        if let Some(parent) = database_file(&config.url).as_deref().and_then(|p| p.parent()) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ContextError::StorageUnavailable(format!(
                        "cannot create storage directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms));

        let pool_options =
            SqlitePoolOptions::new().acquire_timeout(Duration::from_secs(config.pool_timeout_seconds));

        // An in-memory database lives and dies with its single connection
        let pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options.max_connections(config.pool_max_size.max(1))
        };

        let pool = pool_options.connect_with(options).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Context store opened at {}", config.url);

        Ok(Self { pool })
    }

    pub async fn in_memory() -> Result<Self, ContextError> {
        Self::new(&StorageConfig::in_memory()).await
    }

    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Write transaction that takes the database write lock up front.
    pub async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, ContextError> {
        let tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        debug!("Write transaction started");
        Ok(tx)
    }

    pub async fn ping(&self) -> Result<(), ContextError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Filesystem path behind a `sqlite:` url, `None` for in-memory databases.
fn database_file(url: &str) -> Option<PathBuf> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Some(PathBuf::from(path))
}
