//! Script sandbox: output capture, persistent scope, limits and reset.

use std::time::Duration;

use assessment_runtime::config::SandboxConfig;
use assessment_runtime::models::runtime::{LanguageKind, Readiness, RunOutcome, RunOutput};
use assessment_runtime::sandbox::loader_for;
use assessment_runtime::sandbox::runtime::SandboxRuntime;
use assessment_runtime::AppError;

async fn ready_script(starter: &str, config: &SandboxConfig) -> SandboxRuntime {
    let runtime = SandboxRuntime::new(
        "q-script",
        starter,
        loader_for(LanguageKind::Script, Vec::new(), config),
        Duration::from_secs(5),
    );
    assert_eq!(runtime.bootstrap().await.expect("bootstrap"), Readiness::Ready);
    runtime
}

fn text(outcome: &RunOutcome) -> &str {
    match outcome {
        RunOutcome::Completed(RunOutput::Text(text)) => text,
        other => panic!("expected text output, got {other:?}"),
    }
}

#[tokio::test]
async fn print_output_is_captured() {
    let runtime = ready_script("", &SandboxConfig::default()).await;
    let outcome = runtime.run("print(\"hello\"); print(1 + 2);").await.expect("run");
    assert_eq!(text(&outcome), "hello\n3\n");
    assert_eq!(
        runtime.state().last_output,
        Some(RunOutput::Text("hello\n3\n".into()))
    );
}

#[tokio::test]
async fn variables_persist_between_runs_of_one_instance() {
    let runtime = ready_script("", &SandboxConfig::default()).await;
    runtime.run("let total = 40;").await.expect("define");
    let outcome = runtime.run("print(total + 2);").await.expect("reuse");
    assert_eq!(text(&outcome), "42\n");
}

#[tokio::test]
async fn instances_do_not_share_scope() {
    let config = SandboxConfig::default();
    let first = ready_script("", &config).await;
    let second = ready_script("", &config).await;

    first.run("let secret = 7;").await.expect("define");
    let outcome = second.run("print(secret);").await.expect("run");
    assert!(outcome.is_error());
}

#[tokio::test]
async fn runtime_error_keeps_partial_output_and_readiness() {
    let runtime = ready_script("", &SandboxConfig::default()).await;
    let outcome = runtime
        .run("print(\"before\"); throw \"boom\";")
        .await
        .expect("run");

    let RunOutcome::Errored {
        message,
        partial_output,
    } = outcome
    else {
        panic!("expected an execution error");
    };
    assert!(message.starts_with("Error:"));
    assert!(message.contains("boom"));
    assert_eq!(partial_output, "before\n");
    assert_eq!(runtime.readiness(), Readiness::Ready);
    assert_eq!(runtime.state().last_error, Some(message));

    let again = runtime.run("print(\"after\");").await.expect("still usable");
    assert_eq!(text(&again), "after\n");
    assert!(runtime.state().last_error.is_none());
}

#[tokio::test]
async fn syntax_error_is_an_execution_error() {
    let runtime = ready_script("", &SandboxConfig::default()).await;
    let outcome = runtime.run("let = ;").await.expect("run");
    assert!(outcome.is_error());
    assert_eq!(runtime.readiness(), Readiness::Ready);
}

#[tokio::test]
async fn runaway_loop_hits_operation_limit() {
    let config = SandboxConfig {
        script_max_operations: 10_000,
        ..SandboxConfig::default()
    };
    let runtime = ready_script("", &config).await;
    let outcome = runtime.run("loop { }").await.expect("run");

    let RunOutcome::Errored { message, .. } = outcome else {
        panic!("expected the loop to be stopped");
    };
    assert!(message.contains("operation limit"), "{message}");
    assert_eq!(runtime.readiness(), Readiness::Ready);
}

#[tokio::test]
async fn runaway_loop_hits_wall_clock_timeout() {
    let config = SandboxConfig {
        script_max_operations: u64::MAX,
        script_timeout_seconds: 1,
        ..SandboxConfig::default()
    };
    let runtime = ready_script("", &config).await;
    let outcome = runtime
        .run("print(\"a\"); loop { }")
        .await
        .expect("run");

    let RunOutcome::Errored {
        message,
        partial_output,
    } = outcome
    else {
        panic!("expected the loop to time out");
    };
    assert!(message.contains("timed out"), "{message}");
    assert_eq!(partial_output, "a\n");
    assert_eq!(runtime.readiness(), Readiness::Ready);

    let again = runtime.run("print(1 + 1);").await.expect("still usable");
    assert_eq!(text(&again), "2\n");
}

#[tokio::test]
async fn reset_restores_starter_after_many_runs() {
    let starter = "// write your solution\n";
    let runtime = ready_script(starter, &SandboxConfig::default()).await;
    assert_eq!(runtime.source(), starter);

    runtime.run("print(1);").await.expect("run");
    runtime.run("throw \"x\";").await.expect("run");
    runtime.run("print(3);").await.expect("run");
    assert_eq!(runtime.source(), "print(3);");

    runtime.reset();
    assert_eq!(runtime.source(), starter);
    let state = runtime.state();
    assert!(state.last_output.is_none());
    assert!(state.last_error.is_none());
    assert_eq!(state.readiness, Readiness::Ready);
}

#[tokio::test]
async fn run_before_bootstrap_is_not_ready() {
    let runtime = SandboxRuntime::new(
        "q",
        "",
        loader_for(LanguageKind::Script, Vec::new(), &SandboxConfig::default()),
        Duration::from_secs(5),
    );
    let err = runtime.run("print(1);").await.expect_err("not ready");
    assert!(matches!(err, AppError::NotReady(_)));
    assert_eq!(runtime.readiness(), Readiness::Uninitialized);
}
