//! Error types for question construction and bank loading.
//!
//! Engine misuse (answering outside `Playing`, advancing outside `Answered`) is not an
//! error; those calls return `None`. These types cover data that cannot be turned into
//! a playable question at all.

use std::path::PathBuf;

use thiserror::Error;

/// A question that violates the choice/answer invariants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuestionError {
    /// Fewer than two choices were supplied.
    #[error("a question needs at least 2 choices, got {count}")]
    TooFewChoices { count: usize },

    /// The correct answer does not point at one of the choices.
    #[error("answer index {index} is out of range for {len} choices")]
    AnswerOutOfRange { index: usize, len: usize },
}

/// Failures while reading a question bank or an external question pack.
#[derive(Debug, Error)]
pub enum BankError {
    /// The bank file could not be read.
    #[error("failed to read question bank {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bank contents were not valid JSON for the expected shape.
    #[error("invalid question bank JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// An embedded category file was not valid UTF-8.
    #[error("bundled category file {0} is not valid UTF-8")]
    Encoding(String),
}
