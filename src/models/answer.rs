//! Answer payloads, tagged by question type.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::question::QuestionBody;
use crate::{AppError, Result};

/// Serialized diagram format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// PNG raster, carried as a base64 data URL.
    Png,
    /// SVG document text.
    Svg,
}

/// Exported diagram attached to an answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct DiagramPayload {
    /// Encoding of `data`.
    pub format: ExportFormat,
    /// Data URL (PNG) or SVG markup.
    pub data: String,
}

/// Answer value, one variant per question family.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    /// Selected option label.
    Choice(String),
    /// Left index to right index pairs.
    Matching(BTreeMap<usize, usize>),
    /// Free text for short and extended answers.
    Text(String),
    /// Submitted source text or query.
    Code(String),
    /// Exported canvas.
    Diagram(DiagramPayload),
}

impl AnswerValue {
    /// Whether this value is an acceptable answer to `body`.
    #[must_use]
    pub fn fits(&self, body: &QuestionBody) -> bool {
        match (self, body) {
            (Self::Choice(label), QuestionBody::MultipleChoice { options }) => {
                options.iter().any(|option| option == label)
            }
            (Self::Matching(pairs), QuestionBody::Matching { left, right }) => pairs
                .iter()
                .all(|(l, r)| *l < left.len() && *r < right.len()),
            (Self::Text(_), QuestionBody::ShortAnswer | QuestionBody::ExtendedText)
            | (Self::Code(_), QuestionBody::Code { .. })
            | (Self::Diagram(_), QuestionBody::Diagram) => true,
            _ => false,
        }
    }

    /// Flatten to the string payload stored or exported per question type.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Serialization` if the matching map cannot be encoded.
    pub fn to_payload(&self) -> Result<String> {
        match self {
            Self::Choice(text) | Self::Text(text) | Self::Code(text) => Ok(text.clone()),
            Self::Matching(pairs) => serde_json::to_string(pairs).map_err(AppError::from),
            Self::Diagram(payload) => Ok(payload.data.clone()),
        }
    }
}

/// A learner's answer to one question. Later writes replace earlier ones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Answer {
    /// Question this answer belongs to.
    pub question_id: String,
    /// Payload.
    pub value: AnswerValue,
}

impl Answer {
    /// Construct an answer for `question_id`.
    #[must_use]
    pub fn new(question_id: impl Into<String>, value: AnswerValue) -> Self {
        Self {
            question_id: question_id.into(),
            value,
        }
    }
}
