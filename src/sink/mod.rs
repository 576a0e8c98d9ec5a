//! Trace sink interface and bundled sinks
//!
//! A trace sink is where finished traces and their generation spans end up. The
//! recorder only talks to the [`TraceSink`], [`TraceHandle`] and [`SpanHandle`]
//! traits; storage and transport belong to the implementation.
//!
//! # Bundled sinks
//!
//! - **MemorySink**: keeps everything in memory for inspection and tests
//! - **JsonlSink**: appends one ingestion-style JSON event per line to a file
//! - **NullSink**: Null Object pattern for when tracing is disabled
//!
//! Recording sinks take a [`SinkConfig`] and honor its sample rate per trace.
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use langfused::sink::{connect, MemorySink, SinkConfig};
//!
//! let config = SinkConfig::from_env()?;
//! let sink = connect(MemorySink::new(config))?;
//! ```

pub mod config;
pub mod jsonl;
pub mod memory;
pub mod null_sink;

pub use config::SinkConfig;
pub use jsonl::JsonlSink;
pub use memory::{MemorySink, RecordedGeneration, RecordedTrace};
pub use null_sink::{NullSink, NullSpanHandle, NullTraceHandle};

use crate::error::{LangfusedError, Result};
use crate::tracer::TokenUsage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields a trace is created with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceFields {
    pub name: String,
    pub user_id: String,
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub input: Value,
    pub output: Value,
}

/// Partial update of a trace. `None` leaves the current value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl TraceUpdate {
    pub fn tags(tags: Vec<String>) -> Self {
        Self {
            tags: Some(tags),
            ..Default::default()
        }
    }

    pub fn metadata(metadata: Map<String, Value>) -> Self {
        Self {
            metadata: Some(metadata),
            ..Default::default()
        }
    }
}

/// Fields a generation span is created with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationFields {
    pub name: String,
    pub model: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub input: Value,
    pub output: Value,
}

/// Partial update of a generation span.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

/// Destination for traces.
pub trait TraceSink: Send + Sync {
    /// Verify the sink's credentials and configuration.
    fn auth_check(&self) -> Result<()>;

    /// Create a trace and return a handle for follow-up updates.
    fn create_trace(&self, fields: TraceFields) -> Result<Box<dyn TraceHandle>>;
}

/// Live trace inside a sink.
pub trait TraceHandle: Send {
    fn id(&self) -> &str;

    fn update(&mut self, update: TraceUpdate) -> Result<()>;

    /// Attach a generation span to this trace.
    fn add_generation(&mut self, fields: GenerationFields) -> Result<Box<dyn SpanHandle>>;

    /// Whether the sink keeps what is written through this handle.
    ///
    /// `false` for traces dropped by sampling; callers may skip work whose
    /// only purpose is to be recorded.
    fn is_recorded(&self) -> bool {
        true
    }
}

/// Live generation span inside a sink.
pub trait SpanHandle: Send {
    fn id(&self) -> &str;

    fn update(&mut self, update: GenerationUpdate) -> Result<()>;
}

/// Run the sink's auth check and hand the sink back.
///
/// Any failure is fatal for startup and is reported as
/// [`LangfusedError::ConfigError`].
pub fn connect<S: TraceSink>(sink: S) -> Result<S> {
    sink.auth_check().map_err(|e| match e {
        LangfusedError::ConfigError(_) => e,
        other => LangfusedError::ConfigError(format!("auth check failed: {}", other)),
    })?;

    tracing::info!("Trace sink authenticated");
    Ok(sink)
}
