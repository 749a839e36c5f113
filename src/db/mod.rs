//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all application data. Each form is
//! stored as one row with its field array encoded as a JSON column, matching
//! the document layout of the hosted store this service fronts.

mod adapter;
mod repository;

pub use adapter::*;
pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS forms (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            pdf_url TEXT NOT NULL,
            owner_id TEXT,
            fields TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Indexes for the newest-first listing and owner-scoped search
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_forms_created_at ON forms(created_at);
        CREATE INDEX IF NOT EXISTS idx_forms_owner_id ON forms(owner_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
