//! Crate-wide error type.

use std::path::PathBuf;

use crate::config::DecodingMethod;

/// A single stream's failure inside a batch decode call.
#[derive(Debug)]
pub struct StreamFailure {
    /// Position of the failed stream in the batch passed to `decode_streams`.
    pub index: usize,
    pub error: RecognizerError,
}

#[derive(thiserror::Error, Debug)]
pub enum RecognizerError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unknown token in pre-tokenized hotwords: '{token}'")]
    UnknownToken { token: String },

    #[error("Failed to load rewrite rule {path:?} (line {line}): {reason}")]
    RuleLoad {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Decoding method {0} is not implemented")]
    NotImplemented(DecodingMethod),

    #[error("{} of {total} streams failed to decode", .failures.len())]
    BatchDecode {
        total: usize,
        failures: Vec<StreamFailure>,
    },

    #[error("ORT error: {0}")]
    Ort(#[from] ort::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RecognizerError>;
