//! Error types and result aliases for the langfused library.
//!
//! This module defines the core error type [`LangfusedError`] and the [`Result`] type alias
//! used throughout the library. Configuration and binding errors surface from setup calls,
//! cost lookups fail per span, and sink failures are reported as they happen.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LangfusedError {
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Tracks store missing: bind one with set_tracks_store before observing")]
    TracksStoreMissing,

    #[error("Tracks store invalid: {0}")]
    TracksStoreInvalid(String),

    #[error("Unknown model: {0} has no pricing entry")]
    UnknownModel(String),

    #[error("Unsupported model: no tokenizer for {0}")]
    UnsupportedModel(String),

    #[error("Tokenizer error: {0}")]
    TokenizerError(String),

    #[error("Model resolution error: {0}")]
    ModelResolution(String),

    #[error("Span cost error on trace {trace_id} after {emitted} span(s): {source}")]
    SpanCost {
        trace_id: String,
        emitted: usize,
        #[source]
        source: Box<LangfusedError>,
    },

    #[error("Trace sink error: {0}")]
    SinkError(String),

    #[error("Invalid recorder state: expected {expected}, found {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Observed work failed: {0}")]
    Work(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LangfusedError>;
