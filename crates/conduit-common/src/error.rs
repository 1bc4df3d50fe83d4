use thiserror::Error;

/// The error taxonomy shared by every extraction- and registry-facing crate.
///
/// Each variant is a *kind*, not a wrapper around a single underlying library
/// error; callers match on kind to decide whether to skip-and-continue or
/// abort a run.
#[derive(Error, Debug)]
pub enum ConduitError {
    #[error("parse error in {file}: {message}")]
    Parse { file: String, message: String },

    #[error("extraction error: matcher {matcher} failed on {file}:{line}: {message}")]
    Extraction {
        matcher: String,
        file: String,
        line: u32,
        message: String,
    },

    #[error("registry validation error for {service} {method} {path}: {message}")]
    RegistryValidation {
        service: String,
        method: String,
        path: String,
        message: String,
    },

    #[error("storage error during {operation}: {message} (retryable={retryable})")]
    Storage {
        operation: String,
        message: String,
        retryable: bool,
        retry_after: Option<std::time::Duration>,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid confidence value {0}: must be > 0 and <= 1")]
    InvalidConfidence(f64),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("chunk {chunk_id} already stored with different content")]
    DuplicateChunkConflict { chunk_id: String },

    #[error("entity not found: {id}")]
    EntityNotFound { id: String },

    #[error("LLM call failed: {message}")]
    LLMError { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl ConduitError {
    pub fn retryable(&self) -> bool {
        matches!(self, ConduitError::Storage { retryable, .. } if *retryable)
    }
}

pub type Result<T> = std::result::Result<T, ConduitError>;
