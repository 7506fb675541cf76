use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// One job description or one candidate, as handed over by text extraction.
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub display_name: String,
    pub raw_text: String,
}

impl Document {
    pub fn new(display_name: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name: display_name.into(),
            raw_text: raw_text.into(),
        }
    }
}

/// A document reduced to its canonical token sequence.
/// Derived once per screening run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedDocument {
    pub id: Uuid,
    pub tokens: Vec<String>,
}

impl NormalizedDocument {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Why a document contributed no text. Reported alongside its score, never
/// raised: the document is screened as empty and the batch carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ExtractionFailure {
    #[error("no usable text in document")]
    Empty,
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),
    #[error("document could not be read: {0}")]
    Unreadable(String),
    #[error("text extraction timed out")]
    TimedOut,
}
