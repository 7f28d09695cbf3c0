//! Query interpreter backed by a private in-memory `SQLite` database.
//!
//! Each instance opens its own connection, so tables created by one
//! question are invisible to every other question.

use base64::Engine as _;
use futures_util::TryStreamExt;
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Executor, Row, Sqlite, TypeInfo, ValueRef};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{Interpreter, InterpreterFuture, InterpreterLoader};
use crate::models::question::{ColumnDefinition, TableDefinition};
use crate::models::runtime::{LanguageKind, QueryResult, RunOutcome, RunOutput};
use crate::persistence::db::open_memory_pool;
use crate::persistence::SqlitePool;
use crate::{AppError, Result};

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Builds [`QueryInterpreter`] instances seeded with question tables.
pub struct QueryLoader {
    tables: Vec<TableDefinition>,
}

impl QueryLoader {
    /// Loader seeding `tables`, or the sample schema when empty.
    #[must_use]
    pub fn new(tables: Vec<TableDefinition>) -> Self {
        Self { tables }
    }
}

impl InterpreterLoader for QueryLoader {
    fn language(&self) -> LanguageKind {
        LanguageKind::Query
    }

    fn load(&self) -> InterpreterFuture<'_, Result<Box<dyn Interpreter>>> {
        Box::pin(async move {
            let pool = open_memory_pool()
                .await
                .map_err(|err| AppError::Bootstrap(format!("cannot open database: {err}")))?;
            let tables = if self.tables.is_empty() {
                default_tables()
            } else {
                self.tables.clone()
            };
            for table in &tables {
                seed_table(&pool, table).await?;
            }
            info!(tables = tables.len(), "query sandbox seeded");
            Ok(Box::new(QueryInterpreter { pool }) as Box<dyn Interpreter>)
        })
    }
}

/// One isolated in-memory database.
pub struct QueryInterpreter {
    pool: SqlitePool,
}

impl Interpreter for QueryInterpreter {
    fn execute<'a>(
        &'a mut self,
        source: &'a str,
        cancel: CancellationToken,
    ) -> InterpreterFuture<'a, RunOutcome> {
        Box::pin(async move {
            let result = tokio::select! {
                () = cancel.cancelled() => Err(AppError::NotReady("query cancelled".into())),
                result = run_query(&self.pool, source) => result,
            };
            match result {
                Ok(rows) => RunOutcome::Completed(RunOutput::Rows(rows)),
                Err(err) => {
                    let message = match err {
                        AppError::Db(msg) => format!("Error: {msg}"),
                        other => format!("Error: {other}"),
                    };
                    debug!(%message, "query raised an error");
                    RunOutcome::Errored {
                        message,
                        partial_output: String::new(),
                    }
                }
            }
        })
    }
}

/// Execute every statement in `source` in order and return the result of the
/// last statement that yields rows, even when it yielded none this time.
///
/// # Errors
///
/// Returns `AppError::Db` when any statement fails.
pub async fn run_query(pool: &SqlitePool, source: &str) -> Result<QueryResult> {
    let mut last: Option<QueryResult> = None;

    for statement in split_statements(source) {
        let rows: Vec<SqliteRow> = sqlx::raw_sql(statement)
            .fetch(pool)
            .try_collect()
            .await?;
        if !rows.is_empty() {
            last = Some(to_result(&rows));
            continue;
        }
        let columns = describe_columns(pool, statement).await;
        if !columns.is_empty() {
            last = Some(QueryResult {
                columns,
                rows: Vec::new(),
            });
        }
    }

    Ok(last.unwrap_or_default())
}

/// Column names of a single statement, empty for statements that return no
/// rows or can no longer be prepared.
async fn describe_columns(pool: &SqlitePool, statement: &str) -> Vec<String> {
    match pool.describe(statement).await {
        Ok(described) => described
            .columns()
            .iter()
            .map(|c| c.name().to_owned())
            .collect(),
        Err(err) => {
            debug!(%err, "statement has no describable columns");
            Vec::new()
        }
    }
}

/// Split `source` on top-level semicolons. Semicolons inside literals,
/// quoted identifiers, comments and trigger bodies do not split; blank and
/// comment-only pieces are dropped.
fn split_statements(source: &str) -> Vec<&str> {
    let bytes = source.as_bytes();
    let mut statements = Vec::new();
    let mut start = 0;
    let mut has_token = false;
    let mut leading: Vec<String> = Vec::new();
    let mut trigger = false;
    let mut depth = 0_usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                i = skip_quoted(bytes, i + 1, quote);
                has_token = true;
            }
            b'[' => {
                i = find_from(bytes, i + 1, b"]").unwrap_or(bytes.len());
                has_token = true;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = find_from(bytes, i + 2, b"\n").unwrap_or(bytes.len());
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = find_from(bytes, i + 2, b"*/").map_or(bytes.len(), |end| end + 1);
            }
            b';' if depth == 0 => {
                if has_token {
                    statements.push(source[start..i].trim());
                }
                start = i + 1;
                has_token = false;
                leading.clear();
                trigger = false;
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                let end = bytes[i..]
                    .iter()
                    .position(|&c| !is_word_byte(c))
                    .map_or(bytes.len(), |len| i + len);
                let word = source[i..end].to_ascii_uppercase();
                has_token = true;
                if leading.len() < 4 {
                    trigger |= word == "TRIGGER" && leading.first().is_some_and(|w| w == "CREATE");
                    leading.push(word.clone());
                }
                if trigger {
                    match word.as_str() {
                        "BEGIN" | "CASE" => depth += 1,
                        "END" => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                }
                i = end;
                continue;
            }
            b if !b.is_ascii_whitespace() => has_token = true,
            _ => {}
        }
        i += 1;
    }

    if has_token {
        statements.push(source[start..].trim());
    }
    statements
}

/// Index of the closing `quote` starting at `from`, honouring doubled quotes
/// as escapes. Unterminated literals run to the end.
fn skip_quoted(bytes: &[u8], mut from: usize, quote: u8) -> usize {
    while let Some(pos) = find_from(bytes, from, &[quote]) {
        if bytes.get(pos + 1) == Some(&quote) {
            from = pos + 2;
        } else {
            return pos;
        }
    }
    bytes.len()
}

fn is_word_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$' || c >= 0x80
}

fn find_from(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|pos| from + pos)
}

fn to_result(rows: &[SqliteRow]) -> QueryResult {
    let columns = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_owned()).collect())
        .unwrap_or_default();
    let rows = rows
        .iter()
        .map(|row| (0..row.len()).map(|i| cell_value(row, i)).collect())
        .collect();
    QueryResult { columns, rows }
}

fn cell_value(row: &SqliteRow, index: usize) -> Value {
    let type_name = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_ascii_uppercase(),
        Err(_) => return Value::Null,
    };
    let value = match type_name.as_str() {
        "INTEGER" | "INT" | "BIGINT" | "BOOLEAN" => {
            row.try_get_unchecked::<i64, _>(index).map(Value::from)
        }
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => row
            .try_get_unchecked::<f64, _>(index)
            .map(|f| serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number)),
        "BLOB" => row
            .try_get_unchecked::<Vec<u8>, _>(index)
            .map(|bytes| Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))),
        _ => row.try_get_unchecked::<String, _>(index).map(Value::String),
    };
    value.unwrap_or(Value::Null)
}

async fn seed_table(pool: &SqlitePool, table: &TableDefinition) -> Result<()> {
    if table.columns.is_empty() {
        return Err(AppError::Bootstrap(format!(
            "table {} declares no columns",
            table.name
        )));
    }
    let columns = table
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.sql_type))
        .collect::<Vec<_>>()
        .join(", ");
    let create = format!("CREATE TABLE {} ({columns})", quote_ident(&table.name));
    sqlx::query(&create)
        .execute(pool)
        .await
        .map_err(|err| AppError::Bootstrap(format!("cannot create {}: {err}", table.name)))?;

    let names = table
        .columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; table.columns.len()].join(", ");
    let insert = format!(
        "INSERT INTO {} ({names}) VALUES ({placeholders})",
        quote_ident(&table.name)
    );

    for (n, row) in table.rows.iter().enumerate() {
        if row.len() != table.columns.len() {
            return Err(AppError::Bootstrap(format!(
                "row {n} of {} has {} values, expected {}",
                table.name,
                row.len(),
                table.columns.len()
            )));
        }
        let query = row.iter().fold(sqlx::query(&insert), bind_value);
        query
            .execute(pool)
            .await
            .map_err(|err| AppError::Bootstrap(format!("cannot seed {}: {err}", table.name)))?;
    }
    debug!(table = %table.name, rows = table.rows.len(), "table seeded");
    Ok(())
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &'q Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.as_str()),
        other => query.bind(other.to_string()),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column(name: &str, sql_type: &str) -> ColumnDefinition {
    ColumnDefinition {
        name: name.to_owned(),
        sql_type: sql_type.to_owned(),
    }
}

/// Sample schema used when a query question supplies no tables.
#[must_use]
pub fn default_tables() -> Vec<TableDefinition> {
    vec![
        TableDefinition {
            name: "departments".to_owned(),
            columns: vec![
                column("id", "INTEGER PRIMARY KEY"),
                column("name", "TEXT NOT NULL"),
            ],
            rows: vec![
                vec![json!(1), json!("Engineering")],
                vec![json!(2), json!("Sales")],
                vec![json!(3), json!("Marketing")],
            ],
        },
        TableDefinition {
            name: "employees".to_owned(),
            columns: vec![
                column("id", "INTEGER PRIMARY KEY"),
                column("name", "TEXT NOT NULL"),
                column("department_id", "INTEGER REFERENCES departments(id)"),
                column("salary", "REAL"),
                column("hire_date", "TEXT"),
            ],
            rows: vec![
                vec![json!(1), json!("Alice"), json!(1), json!(95000.0), json!("2019-03-15")],
                vec![json!(2), json!("Bob"), json!(1), json!(85000.0), json!("2020-07-01")],
                vec![json!(3), json!("Carol"), json!(2), json!(70000.0), json!("2018-11-20")],
                vec![json!(4), json!("Dave"), json!(3), json!(65000.0), json!("2021-01-10")],
                vec![json!(5), json!("Eve"), json!(2), json!(72000.0), json!("2022-05-23")],
            ],
        },
    ]
}
