use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing::info;

const SCHEMA: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS proposals (
        proposal_id TEXT PRIMARY KEY,
        stage TEXT NOT NULL DEFAULT 'DOC_REVIEW',
        submitted_at TEXT NOT NULL,
        payload TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS decisions (
        decision_id TEXT PRIMARY KEY,
        proposal_id TEXT NOT NULL REFERENCES proposals (proposal_id),
        stage TEXT NOT NULL,
        decision TEXT NOT NULL,
        reasons TEXT NOT NULL,
        comment TEXT,
        user_id TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_proposals_stage ON proposals (stage)",
    "CREATE INDEX IF NOT EXISTS idx_decisions_proposal_id ON decisions (proposal_id)",
];

/// Opens the SQLite database (creating the file and its directory when
/// missing) and applies the schema.
pub async fn connect_database(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("invalid DATABASE_URL {database_url}"))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    if let Some(parent) = options.get_filename().parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .with_context(|| format!("cannot open database {database_url}"))?;

    apply_schema(&pool).await?;
    info!(database_url, "database ready");

    Ok(pool)
}

pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("failed to apply database schema")?;
    }
    Ok(())
}
