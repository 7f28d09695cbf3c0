//! `SQLite` schema bootstrap logic.
//!
//! All table definitions use `CREATE TABLE IF NOT EXISTS` and are safe to
//! re-run on every startup.

use sqlx::SqlitePool;

use crate::Result;

/// Apply the key/value table definition to the connected database.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS kv_store (
    key             TEXT PRIMARY KEY NOT NULL,
    schema_version  INTEGER NOT NULL,
    payload         TEXT NOT NULL,
    byte_len        INTEGER NOT NULL,
    updated_at      TEXT NOT NULL
);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
