//! Question snapshots as delivered by the generation service.

use serde::{Deserialize, Serialize};

use super::runtime::LanguageKind;

/// Column declaration for a seeded query-sandbox table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// Declared SQL type (`INTEGER`, `TEXT`, `REAL`, ...).
    #[serde(default = "default_sql_type")]
    pub sql_type: String,
}

fn default_sql_type() -> String {
    "TEXT".into()
}

/// Caller-supplied table with literal rows for the query sandbox.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct TableDefinition {
    /// Table name.
    pub name: String,
    /// Ordered column declarations.
    pub columns: Vec<ColumnDefinition>,
    /// Literal rows; each row is positional against `columns`.
    #[serde(default)]
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// Type-specific body of a question, tagged by question type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionBody {
    /// Pick one labelled option.
    MultipleChoice {
        /// Option labels in display order.
        options: Vec<String>,
    },
    /// Pair every left item with a right item.
    Matching {
        /// Left-hand column.
        left: Vec<String>,
        /// Right-hand column.
        right: Vec<String>,
    },
    /// Short free-text answer.
    ShortAnswer,
    /// Long-form free-text answer.
    ExtendedText,
    /// Code or query answered inside a sandbox.
    Code {
        /// Sandbox language.
        language: LanguageKind,
        /// Source shown when the editor mounts and after a reset.
        #[serde(default)]
        starter_code: String,
        /// Reference output shown after completion, if any.
        #[serde(default)]
        expected_output: Option<String>,
        /// Tables seeded into the query sandbox; empty means default schema.
        #[serde(default)]
        tables: Vec<TableDefinition>,
    },
    /// Freehand diagram answered with the vector editor.
    Diagram,
}

impl QuestionBody {
    /// Stable tag for the question type, matching the serialized `type`.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::MultipleChoice { .. } => "multiple_choice",
            Self::Matching { .. } => "matching",
            Self::ShortAnswer => "short_answer",
            Self::ExtendedText => "extended_text",
            Self::Code { .. } => "code",
            Self::Diagram => "diagram",
        }
    }
}

/// Immutable question snapshot embedded in a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Question {
    /// Identifier unique within a session.
    pub id: String,
    /// Prompt text (markdown, rendered by the presentation layer).
    pub prompt: String,
    /// Type-specific fields.
    #[serde(flatten)]
    pub body: QuestionBody,
}
