//! Command-line argument definitions for the `assessment-runtime` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::models::session::SessionKind;

/// Log output format.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

/// Session kind as spelled on the command line.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
pub enum KindArg {
    /// Exam history.
    Exam,
    /// Quiz history.
    Quiz,
}

impl From<KindArg> for SessionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Exam => Self::Exam,
            KindArg::Quiz => Self::Quiz,
        }
    }
}

/// Top-level arguments.
#[derive(Debug, Parser)]
#[command(
    name = "assessment-runtime",
    about = "Local assessment sessions and code sandboxes",
    version,
    long_about = None
)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory holding the local database.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect or remove stored sessions.
    Sessions {
        /// What to do with the stored sessions.
        #[command(subcommand)]
        action: SessionsCommand,
    },
    /// Start a new session from a JSON question set.
    Start {
        /// Session kind.
        #[arg(long, value_enum)]
        kind: KindArg,
        /// Display name.
        #[arg(long)]
        name: String,
        /// Optional subject.
        #[arg(long)]
        subject: Option<String>,
        /// JSON file holding an array of questions.
        questions: PathBuf,
    },
    /// Execute code in a fresh sandbox.
    Run {
        /// Engine and source file.
        #[command(subcommand)]
        target: RunCommand,
    },
    /// Drop sessions beyond the configured history caps.
    Prune,
}

/// `sessions` subcommands.
#[derive(Debug, Subcommand)]
pub enum SessionsCommand {
    /// List sessions, newest first.
    List {
        /// Only list this kind.
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
    },
    /// Print a session as JSON.
    Export {
        /// Session id.
        id: String,
    },
    /// Delete a session.
    Delete {
        /// Session id.
        id: String,
    },
}

/// `run` subcommands.
#[derive(Debug, Subcommand)]
pub enum RunCommand {
    /// Run a script file.
    Script {
        /// Script source file.
        file: PathBuf,
    },
    /// Run a query file against the sample or supplied tables.
    Query {
        /// Query source file.
        file: PathBuf,
        /// JSON file holding an array of table definitions.
        #[arg(long)]
        tables: Option<PathBuf>,
    },
}
