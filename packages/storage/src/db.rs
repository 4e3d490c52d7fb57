// ABOUTME: Database connection management
// ABOUTME: Opens the SQLite pool with Hill's pragmas and runs embedded migrations

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::Result;

/// Connect to `database_url` (e.g. `sqlite:/var/lib/hill/hill.db`) and migrate
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    debug!("Connecting to database: {}", database_url);

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        // Claims from many robots contend for the write lock; wait instead of failing
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(options)
        .await?;

    info!("Database connection established");

    migrate(&pool).await?;
    Ok(pool)
}

/// Connect to a database file, creating its parent directory first
pub async fn connect_path(database_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = database_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    connect(&format!("sqlite:{}", database_path.display())).await
}

/// Single-connection in-memory database, used by tests and throwaway servers.
///
/// The connection is never recycled; every pooled connection to `:memory:`
/// would otherwise see its own empty database.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    debug!("Database migrations completed");
    Ok(())
}
