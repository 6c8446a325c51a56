mod models;

pub use models::*;

use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool,
};
use std::str::FromStr;
use tracing::info;

use crate::config::DatabaseConfig;

pub type DbPool = SqlitePool;

/// Tables the service cannot run without
pub const REQUIRED_TABLES: [&str; 8] = [
    "users",
    "sessions",
    "clients",
    "photographers",
    "bookings",
    "transactions",
    "galleries",
    "mahasiswa",
];

/// Execute a SQL migration file, properly handling comments
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in sql.split(';') {
        let cleaned: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let trimmed = cleaned.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

/// Connect to the configured database, verify it answers and bring the
/// schema up to date.
pub async fn init(config: &DatabaseConfig) -> Result<DbPool> {
    let url = config.require_url()?;

    info!("Connecting to database");

    // Applied to every pooled connection, not just the first one
    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| "Invalid DATABASE_URL")?
        .busy_timeout(config.query_timeout());
    let options = if url.contains(":memory:") {
        options
    } else {
        options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.connect_timeout())
        .connect_with(options)
        .await
        .with_context(|| "Failed to connect to database")?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .with_context(|| "Failed to ping database")?;

    run_migrations(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: booking marketplace collections
    execute_sql(pool, include_str!("../../migrations/001_initial.sql")).await?;

    // Migration 002: student registry
    let has_mahasiswa_table: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type='table' AND name='mahasiswa'",
    )
    .fetch_optional(pool)
    .await?;
    if has_mahasiswa_table.is_none() {
        execute_sql(pool, include_str!("../../migrations/002_mahasiswa.sql")).await?;
    }

    info!("Migrations completed");
    Ok(())
}

/// Single-connection in-memory database with the full schema, for tests.
/// The connection is never recycled, otherwise the data would vanish.
#[cfg(test)]
pub async fn memory_pool() -> DbPool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    run_migrations(&pool).await.expect("migrations");
    pool
}
