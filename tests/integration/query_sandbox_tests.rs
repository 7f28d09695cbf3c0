//! Query sandbox: default schema, custom tables, errors and isolation.

use std::time::Duration;

use serde_json::json;

use assessment_runtime::config::SandboxConfig;
use assessment_runtime::models::question::{ColumnDefinition, TableDefinition};
use assessment_runtime::models::runtime::{
    LanguageKind, QueryResult, Readiness, RunOutcome, RunOutput,
};
use assessment_runtime::sandbox::loader_for;
use assessment_runtime::sandbox::runtime::SandboxRuntime;
use assessment_runtime::AppError;

async fn ready_query(tables: Vec<TableDefinition>) -> SandboxRuntime {
    let runtime = SandboxRuntime::new(
        "q-query",
        "SELECT 1;",
        loader_for(LanguageKind::Query, tables, &SandboxConfig::default()),
        Duration::from_secs(5),
    );
    assert_eq!(runtime.bootstrap().await.expect("bootstrap"), Readiness::Ready);
    runtime
}

fn rows(outcome: RunOutcome) -> QueryResult {
    match outcome {
        RunOutcome::Completed(RunOutput::Rows(result)) => result,
        other => panic!("expected rows, got {other:?}"),
    }
}

fn scores_table() -> TableDefinition {
    TableDefinition {
        name: "scores".into(),
        columns: vec![
            ColumnDefinition {
                name: "student".into(),
                sql_type: "TEXT".into(),
            },
            ColumnDefinition {
                name: "points".into(),
                sql_type: "INTEGER".into(),
            },
        ],
        rows: vec![
            vec![json!("ana"), json!(7)],
            vec![json!("ben"), json!(8)],
            vec![json!("cy"), json!(null)],
        ],
    }
}

#[tokio::test]
async fn default_schema_is_seeded() {
    let runtime = ready_query(Vec::new()).await;
    let result = rows(
        runtime
            .run("SELECT name FROM employees WHERE department_id = 1 ORDER BY id")
            .await
            .expect("run"),
    );
    assert_eq!(result.columns, vec!["name".to_owned()]);
    assert_eq!(result.rows, vec![vec![json!("Alice")], vec![json!("Bob")]]);
}

#[tokio::test]
async fn joins_and_real_columns_convert_to_json() {
    let runtime = ready_query(Vec::new()).await;
    let result = rows(
        runtime
            .run(
                "SELECT d.name, e.salary FROM employees e \
                 JOIN departments d ON d.id = e.department_id \
                 WHERE e.id = 1",
            )
            .await
            .expect("run"),
    );
    assert_eq!(result.columns, vec!["name".to_owned(), "salary".to_owned()]);
    assert_eq!(result.rows, vec![vec![json!("Engineering"), json!(95000.0)]]);
}

#[tokio::test]
async fn custom_tables_replace_default_schema() {
    let runtime = ready_query(vec![scores_table()]).await;
    let result = rows(
        runtime
            .run("SELECT SUM(points) AS total, COUNT(*) AS n FROM scores")
            .await
            .expect("run"),
    );
    assert_eq!(result.rows, vec![vec![json!(15), json!(3)]]);

    let missing = runtime.run("SELECT * FROM employees").await.expect("run");
    assert!(missing.is_error());
}

#[tokio::test]
async fn null_cells_are_json_null() {
    let runtime = ready_query(vec![scores_table()]).await;
    let result = rows(
        runtime
            .run("SELECT points FROM scores WHERE student = 'cy'")
            .await
            .expect("run"),
    );
    assert_eq!(result.rows, vec![vec![json!(null)]]);
}

#[tokio::test]
async fn nonexistent_table_is_execution_error_and_stays_ready() {
    let runtime = ready_query(Vec::new()).await;
    let outcome = runtime.run("SELECT * FROM nowhere").await.expect("run");

    let RunOutcome::Errored { message, .. } = outcome else {
        panic!("expected an execution error");
    };
    assert!(message.contains("nowhere"), "{message}");
    assert_eq!(runtime.readiness(), Readiness::Ready);
    assert_eq!(runtime.state().last_error, Some(message));
}

#[tokio::test]
async fn empty_result_is_not_an_error() {
    let runtime = ready_query(Vec::new()).await;
    let result = rows(
        runtime
            .run("SELECT id, name FROM departments WHERE id > 100")
            .await
            .expect("run"),
    );
    assert!(result.is_empty());
}

#[tokio::test]
async fn last_statement_rows_are_returned() {
    let runtime = ready_query(Vec::new()).await;
    let result = rows(
        runtime
            .run(
                "CREATE TABLE t (a INTEGER); \
                 INSERT INTO t VALUES (2), (1); \
                 SELECT a FROM t ORDER BY a;",
            )
            .await
            .expect("run"),
    );
    assert_eq!(result.rows, vec![vec![json!(1)], vec![json!(2)]]);
}

#[tokio::test]
async fn databases_are_isolated_per_instance() {
    let first = ready_query(Vec::new()).await;
    let second = ready_query(Vec::new()).await;

    first
        .run("CREATE TABLE private_notes (body TEXT)")
        .await
        .expect("run");
    let seen_by_first = first.run("SELECT * FROM private_notes").await.expect("run");
    assert!(!seen_by_first.is_error());

    let seen_by_second = second.run("SELECT * FROM private_notes").await.expect("run");
    assert!(seen_by_second.is_error());
}

#[tokio::test]
async fn malformed_seed_rows_fail_bootstrap() {
    let mut table = scores_table();
    table.rows.push(vec![json!("only one value")]);
    let runtime = SandboxRuntime::new(
        "q-bad",
        "",
        loader_for(LanguageKind::Query, vec![table], &SandboxConfig::default()),
        Duration::from_secs(5),
    );

    let err = runtime.bootstrap().await.expect_err("bootstrap fails");
    assert!(matches!(err, AppError::Bootstrap(_)));
    assert_eq!(runtime.readiness(), Readiness::Failed);
}

#[tokio::test]
async fn empty_final_select_hides_earlier_rows() {
    let runtime = ready_query(Vec::new()).await;
    let result = rows(
        runtime
            .run("SELECT name FROM employees; SELECT name FROM employees WHERE 0")
            .await
            .expect("run"),
    );
    assert_eq!(result.columns, vec!["name".to_owned()]);
    assert!(result.is_empty());
}

#[tokio::test]
async fn empty_result_after_ddl_keeps_column_names() {
    let runtime = ready_query(Vec::new()).await;
    let result = rows(
        runtime
            .run("CREATE TABLE t (a INTEGER); SELECT a FROM t")
            .await
            .expect("run"),
    );
    assert_eq!(result.columns, vec!["a".to_owned()]);
    assert!(result.is_empty());
}

#[tokio::test]
async fn trailing_write_keeps_previous_select() {
    let runtime = ready_query(Vec::new()).await;
    let result = rows(
        runtime
            .run("SELECT id FROM departments ORDER BY id; DELETE FROM departments WHERE id = 3;")
            .await
            .expect("run"),
    );
    assert_eq!(result.rows, vec![vec![json!(1)], vec![json!(2)], vec![json!(3)]]);
}
