//! JSON-lines file sink.
//!
//! Every sink call becomes one line shaped like a Langfuse ingestion event:
//!
//! ```text
//! {"id":"…","type":"trace-create","timestamp":"…","body":{"id":"…","name":"chat",…}}
//! {"id":"…","type":"generation-create","timestamp":"…","body":{"id":"…","traceId":"…",…}}
//! {"id":"…","type":"generation-update","timestamp":"…","body":{"id":"…","usage":{…}}}
//! ```
//!
//! The file can be replayed into a backend later or inspected directly.

use super::null_sink::NullTraceHandle;
use super::{
    GenerationFields, GenerationUpdate, SinkConfig, SpanHandle, TraceFields, TraceHandle,
    TraceSink, TraceUpdate,
};
use crate::error::{LangfusedError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Serialize)]
struct IngestionEvent<'a, T: Serialize> {
    id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    timestamp: DateTime<Utc>,
    body: EventBody<'a, T>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EventBody<'a, T: Serialize> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace_id: Option<&'a str>,
    #[serde(flatten)]
    fields: &'a T,
}

#[derive(Clone)]
struct EventWriter {
    file: Arc<Mutex<LineWriter<File>>>,
    debug: bool,
}

impl EventWriter {
    fn write<T: Serialize>(
        &self,
        kind: &'static str,
        id: &str,
        trace_id: Option<&str>,
        fields: &T,
    ) -> Result<()> {
        let event = IngestionEvent {
            id: Uuid::new_v4().to_string(),
            kind,
            timestamp: Utc::now(),
            body: EventBody {
                id,
                trace_id,
                fields,
            },
        };
        let line = serde_json::to_string(&event)?;

        if self.debug {
            info!(event = kind, id = id, "Writing ingestion event");
        }

        let mut file = self
            .file
            .lock()
            .map_err(|_| LangfusedError::SinkError("event writer lock poisoned".to_string()))?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

/// Sink appending ingestion events to a JSON-lines file.
pub struct JsonlSink {
    config: SinkConfig,
    path: PathBuf,
    writer: EventWriter,
}

impl JsonlSink {
    /// Open `path` for appending, creating it if needed.
    pub fn open(config: SinkConfig, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!(path = %path.display(), "Opened JSONL trace sink");

        Ok(Self {
            writer: EventWriter {
                file: Arc::new(Mutex::new(LineWriter::new(file))),
                debug: config.debug,
            },
            config,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TraceSink for JsonlSink {
    fn auth_check(&self) -> Result<()> {
        self.config.validate()?;
        self.writer
            .file
            .lock()
            .map_err(|_| LangfusedError::SinkError("event writer lock poisoned".to_string()))?
            .flush()?;
        Ok(())
    }

    fn create_trace(&self, fields: TraceFields) -> Result<Box<dyn TraceHandle>> {
        if !self.config.sampled() {
            debug!(name = %fields.name, "Trace sampled out");
            return Ok(Box::new(NullTraceHandle::new()));
        }

        let id = Uuid::new_v4().to_string();
        self.writer.write("trace-create", &id, None, &fields)?;

        Ok(Box::new(JsonlTraceHandle {
            id,
            writer: self.writer.clone(),
        }))
    }
}

struct JsonlTraceHandle {
    id: String,
    writer: EventWriter,
}

impl TraceHandle for JsonlTraceHandle {
    fn id(&self) -> &str {
        &self.id
    }

    fn update(&mut self, update: TraceUpdate) -> Result<()> {
        self.writer.write("trace-update", &self.id, None, &update)
    }

    fn add_generation(&mut self, fields: GenerationFields) -> Result<Box<dyn SpanHandle>> {
        let id = Uuid::new_v4().to_string();
        self.writer
            .write("generation-create", &id, Some(&self.id), &fields)?;

        Ok(Box::new(JsonlSpanHandle {
            id,
            trace_id: self.id.clone(),
            writer: self.writer.clone(),
        }))
    }
}

struct JsonlSpanHandle {
    id: String,
    trace_id: String,
    writer: EventWriter,
}

impl SpanHandle for JsonlSpanHandle {
    fn id(&self) -> &str {
        &self.id
    }

    fn update(&mut self, update: GenerationUpdate) -> Result<()> {
        self.writer
            .write("generation-update", &self.id, Some(&self.trace_id), &update)
    }
}
