#![forbid(unsafe_code)]

//! `assessment-runtime`: local command-line front end.
//!
//! Opens the durable store under the configured data directory, applies the
//! history caps, and runs one session, sandbox or maintenance command.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use assessment_runtime::cli::{Cli, Command, LogFormat, RunCommand, SessionsCommand};
use assessment_runtime::config::GlobalConfig;
use assessment_runtime::models::question::{Question, TableDefinition};
use assessment_runtime::models::runtime::{LanguageKind, QueryResult, RunOutcome, RunOutput};
use assessment_runtime::models::session::SessionKind;
use assessment_runtime::orchestrator::session_manager::SessionManager;
use assessment_runtime::persistence::store::DurableStore;
use assessment_runtime::persistence::{db, retention};
use assessment_runtime::sandbox::loader_for;
use assessment_runtime::sandbox::runtime::SandboxRuntime;
use assessment_runtime::{AppError, Result};

fn main() -> Result<ExitCode> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<ExitCode> {
    let mut config = match &args.config {
        Some(path) => GlobalConfig::load_from_path(path)?,
        None => GlobalConfig::default(),
    };
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    info!(data_dir = %config.data_dir.display(), "configuration loaded");

    if let Command::Run { target } = args.command {
        return run_sandbox(&config, target).await;
    }

    let db = Arc::new(db::connect(&config.db_path()).await?);
    let store = DurableStore::sqlite(db, &config.storage);
    info!("database connected");

    if matches!(args.command, Command::Prune) {
        let evicted = retention::enforce_caps(&store, &config.history).await?;
        println!("evicted {evicted} session(s)");
        return Ok(ExitCode::SUCCESS);
    }

    if let Err(err) = retention::enforce_caps(&store, &config.history).await {
        warn!(%err, "retention sweep failed");
    }
    let mut manager = SessionManager::load(store, config.history.clone()).await?;

    match args.command {
        Command::Sessions { action } => match action {
            SessionsCommand::List { kind } => {
                let kinds = kind.map_or_else(|| SessionKind::ALL.to_vec(), |k| vec![k.into()]);
                for kind in kinds {
                    for session in manager.list(kind) {
                        let progress = session.progress();
                        println!(
                            "{}\t{:?}\t{:?}\t{}/{}\t{}",
                            session.id,
                            kind,
                            session.status(),
                            progress.answered,
                            progress.total,
                            session.name
                        );
                    }
                }
            }
            SessionsCommand::Export { id } => match manager.export(&id)? {
                Some(document) => println!("{document}"),
                None => return Err(AppError::NotFound(format!("session {id}"))),
            },
            SessionsCommand::Delete { id } => {
                if !manager.delete(&id).await? {
                    return Err(AppError::NotFound(format!("session {id}")));
                }
                println!("deleted {id}");
            }
        },
        Command::Start {
            kind,
            name,
            subject,
            questions,
        } => {
            let questions: Vec<Question> = serde_json::from_str(&read_file(&questions)?)?;
            let session = manager.create(kind.into(), name, subject, questions).await?;
            println!("{}", session.id);
        }
        Command::Run { .. } | Command::Prune => {}
    }

    Ok(ExitCode::SUCCESS)
}

async fn run_sandbox(config: &GlobalConfig, target: RunCommand) -> Result<ExitCode> {
    let (language, file, tables) = match target {
        RunCommand::Script { file } => (LanguageKind::Script, file, Vec::new()),
        RunCommand::Query { file, tables } => {
            let tables: Vec<TableDefinition> = match tables {
                Some(path) => serde_json::from_str(&read_file(&path)?)?,
                None => Vec::new(),
            };
            (LanguageKind::Query, file, tables)
        }
    };

    let source = read_file(&file)?;
    let runtime = SandboxRuntime::new(
        file.display().to_string(),
        source.clone(),
        loader_for(language, tables, &config.sandbox),
        config.sandbox.bootstrap_timeout(),
    );
    runtime.bootstrap().await?;

    match runtime.run(&source).await? {
        RunOutcome::Completed(RunOutput::Text(text)) => print!("{text}"),
        RunOutcome::Completed(RunOutput::Rows(result)) => print_rows(&result),
        RunOutcome::Errored {
            message,
            partial_output,
        } => {
            print!("{partial_output}");
            eprintln!("{message}");
            return Ok(ExitCode::FAILURE);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_rows(result: &QueryResult) {
    println!("{}", result.columns.join("\t"));
    for row in &result.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|value| match value {
                Value::String(s) => s.clone(),
                Value::Null => "NULL".to_owned(),
                other => other.to_string(),
            })
            .collect();
        println!("{}", cells.join("\t"));
    }
    if result.is_empty() {
        println!("(no rows)");
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|err| AppError::Io(format!("cannot read {}: {err}", path.display())))
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
