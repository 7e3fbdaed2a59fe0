use anyhow::Result;
use mensa_service_migration::{Migrator, MigratorTrait};
use sea_orm::sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sea_orm::{DatabaseConnection, SqlxSqliteConnector};
use tracing::debug;

use crate::config::CONFIG;

fn create_sqlite_options() -> Result<SqliteConnectOptions> {
    let path = CONFIG.database_path();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(90)))
}

async fn database_connection() -> Result<DatabaseConnection> {
    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(90))
        .idle_timeout(std::time::Duration::from_secs(600))
        .connect_with(create_sqlite_options()?)
        .await?;
    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}

async fn migrate_database() -> Result<()> {
    // Single-connection pool for migrations so they apply strictly in order.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(create_sqlite_options()?)
        .await?;
    let connection = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool.clone());
    Migrator::up(&connection, None).await?;
    pool.close().await;
    debug!("migrations applied");
    Ok(())
}

/// Run pending migrations and hand out the shared connection pool.
pub async fn setup_database() -> Result<DatabaseConnection> {
    migrate_database().await?;
    database_connection().await
}
