// Schema Migrations

use healthcheck_core::error::{AppError, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

/// Ordered schema migrations: (version, description, sql)
const MIGRATIONS: &[(i64, &str, &str)] = &[(
    1,
    "batch task records",
    include_str!("../migrations/001_initial_schema.sql"),
)];

fn db_err(err: sqlx::Error) -> AppError {
    AppError::Database(err.to_string())
}

/// Bring the schema up to the latest version
///
/// Each pending migration runs in its own transaction together with the
/// `schema_version` row that records it, so a failed migration leaves the
/// previous version intact.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await
    .map_err(db_err)?;

    let current: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
        .fetch_one(pool)
        .await
        .map_err(db_err)?;

    let pending: Vec<_> = MIGRATIONS.iter().filter(|(v, _, _)| *v > current).collect();
    if pending.is_empty() {
        debug!(version = current, "Schema is up to date");
        return Ok(());
    }

    for (version, description, sql) in pending {
        info!(version, description, "Applying migration");

        let mut tx = pool.begin().await.map_err(db_err)?;
        execute_script(&mut tx, sql).await?;
        sqlx::query(
            "INSERT INTO schema_version (version, applied_at)
             VALUES (?, CAST(strftime('%s', 'now') AS INTEGER) * 1000)",
        )
        .bind(*version)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
    }

    info!(from = current, to = MIGRATIONS.len(), "Migrations applied");
    Ok(())
}

/// Run every statement of a `;`-separated script, skipping `--` comment lines
async fn execute_script(tx: &mut Transaction<'_, Sqlite>, sql: &str) -> Result<()> {
    for statement in sql.split(';') {
        let statement = statement
            .lines()
            .map(|line| line.split("--").next().unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n");
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }

        sqlx::query(statement)
            .execute(&mut **tx)
            .await
            .map_err(db_err)?;
    }
    Ok(())
}
