//! In-memory sink with inspectable contents.
//!
//! [`MemorySink`] is cheap to clone; every clone and every handle it gives out
//! share the same storage, so a test or an embedding application can keep a
//! clone and read back what the recorder emitted.

use super::null_sink::NullTraceHandle;
use super::{
    GenerationFields, GenerationUpdate, SinkConfig, SpanHandle, TraceFields, TraceHandle,
    TraceSink, TraceUpdate,
};
use crate::error::{LangfusedError, Result};
use crate::tracer::TokenUsage;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

/// A trace as stored by [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedTrace {
    pub id: String,
    pub fields: TraceFields,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<Map<String, Value>>,
    pub generations: Vec<RecordedGeneration>,
}

/// A generation span as stored by [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedGeneration {
    pub id: String,
    pub fields: GenerationFields,
    pub usage: Option<TokenUsage>,
}

type SharedTraces = Arc<Mutex<Vec<RecordedTrace>>>;

fn lock(traces: &SharedTraces) -> Result<MutexGuard<'_, Vec<RecordedTrace>>> {
    traces
        .lock()
        .map_err(|_| LangfusedError::SinkError("memory sink lock poisoned".to_string()))
}

fn find_trace<'a>(traces: &'a mut [RecordedTrace], id: &str) -> Result<&'a mut RecordedTrace> {
    traces
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(|| LangfusedError::SinkError(format!("trace {} is no longer stored", id)))
}

/// Sink keeping every trace in memory.
///
/// Handles address their trace by id, so clearing the sink while a handle is
/// live makes later calls on that handle fail with
/// [`LangfusedError::SinkError`].
#[derive(Debug, Clone)]
pub struct MemorySink {
    config: SinkConfig,
    traces: SharedTraces,
}

impl MemorySink {
    pub fn new(config: SinkConfig) -> Self {
        Self {
            config,
            traces: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    fn read(&self) -> MutexGuard<'_, Vec<RecordedTrace>> {
        self.traces.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of all recorded traces, in creation order.
    pub fn traces(&self) -> Vec<RecordedTrace> {
        self.read().clone()
    }

    /// Look up a recorded trace by id.
    pub fn trace(&self, id: &str) -> Option<RecordedTrace> {
        self.read().iter().find(|t| t.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn clear(&self) {
        self.read().clear();
    }
}

impl TraceSink for MemorySink {
    fn auth_check(&self) -> Result<()> {
        self.config.validate()
    }

    fn create_trace(&self, fields: TraceFields) -> Result<Box<dyn TraceHandle>> {
        if !self.config.sampled() {
            debug!(name = %fields.name, "Trace sampled out");
            return Ok(Box::new(NullTraceHandle::new()));
        }

        let id = Uuid::new_v4().to_string();
        if self.config.debug {
            debug!(trace_id = %id, name = %fields.name, "Recording trace");
        }

        lock(&self.traces)?.push(RecordedTrace {
            id: id.clone(),
            fields,
            tags: None,
            metadata: None,
            generations: Vec::new(),
        });

        Ok(Box::new(MemoryTraceHandle {
            id,
            traces: Arc::clone(&self.traces),
        }))
    }
}

struct MemoryTraceHandle {
    id: String,
    traces: SharedTraces,
}

impl TraceHandle for MemoryTraceHandle {
    fn id(&self) -> &str {
        &self.id
    }

    fn update(&mut self, update: TraceUpdate) -> Result<()> {
        let mut traces = lock(&self.traces)?;
        let trace = find_trace(&mut traces, &self.id)?;

        if let Some(tags) = update.tags {
            trace.tags = Some(tags);
        }
        if let Some(metadata) = update.metadata {
            let mut merged = trace
                .metadata
                .take()
                .map(Value::Object)
                .unwrap_or_else(|| Value::Object(Map::new()));
            deep_merge(&mut merged, Value::Object(metadata));
            if let Value::Object(map) = merged {
                trace.metadata = Some(map);
            }
        }

        Ok(())
    }

    fn add_generation(&mut self, fields: GenerationFields) -> Result<Box<dyn SpanHandle>> {
        let id = Uuid::new_v4().to_string();

        let mut traces = lock(&self.traces)?;
        find_trace(&mut traces, &self.id)?
            .generations
            .push(RecordedGeneration {
                id: id.clone(),
                fields,
                usage: None,
            });

        Ok(Box::new(MemorySpanHandle {
            id,
            trace_id: self.id.clone(),
            traces: Arc::clone(&self.traces),
        }))
    }
}

struct MemorySpanHandle {
    id: String,
    trace_id: String,
    traces: SharedTraces,
}

impl SpanHandle for MemorySpanHandle {
    fn id(&self) -> &str {
        &self.id
    }

    fn update(&mut self, update: GenerationUpdate) -> Result<()> {
        let mut traces = lock(&self.traces)?;
        let generation = find_trace(&mut traces, &self.trace_id)?
            .generations
            .iter_mut()
            .find(|g| g.id == self.id)
            .ok_or_else(|| {
                LangfusedError::SinkError(format!("generation {} is no longer stored", self.id))
            })?;

        if let Some(model) = update.model {
            generation.fields.model = model;
        }
        if let Some(usage) = update.usage {
            generation.usage = Some(usage);
        }

        Ok(())
    }
}

/// Deep merge two JSON values.
///
/// If both values are objects, recursively merge their fields.
/// Otherwise, replace the destination with the source value.
fn deep_merge(dest: &mut Value, src: Value) {
    match (dest, src) {
        (Value::Object(dest_map), Value::Object(src_map)) => {
            for (key, value) in src_map {
                match dest_map.get_mut(&key) {
                    Some(dest_value) => deep_merge(dest_value, value),
                    None => {
                        dest_map.insert(key, value);
                    }
                }
            }
        }
        (dest_value, src_value) => {
            *dest_value = src_value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn config() -> SinkConfig {
        SinkConfig::default().with_credentials("pk-lf-test", "sk-lf-test")
    }

    fn trace_fields(name: &str) -> TraceFields {
        TraceFields {
            name: name.to_string(),
            user_id: "user".to_string(),
            session_id: "session".to_string(),
            start_time: Utc::now(),
            end_time: Some(Utc::now()),
            input: json!("question"),
            output: json!("answer"),
        }
    }

    fn generation_fields(name: &str) -> GenerationFields {
        let now = Utc::now();
        GenerationFields {
            name: name.to_string(),
            model: "gpt-4o-mini".to_string(),
            start_time: now,
            end_time: now,
            input: json!("in"),
            output: json!("out"),
        }
    }

    #[test]
    fn test_create_trace_is_visible_through_clone() {
        let sink = MemorySink::new(config());
        let observer = sink.clone();

        let handle = sink.create_trace(trace_fields("chat")).unwrap();

        assert_eq!(observer.len(), 1);
        let stored = observer.trace(handle.id()).unwrap();
        assert_eq!(stored.fields.name, "chat");
    }

    #[test]
    fn test_generations_keep_insertion_order() {
        let sink = MemorySink::new(config());
        let mut trace = sink.create_trace(trace_fields("chat")).unwrap();

        for name in ["planner", "coder", "reviewer"] {
            trace.add_generation(generation_fields(name)).unwrap();
        }

        let names: Vec<String> = sink.traces()[0]
            .generations
            .iter()
            .map(|g| g.fields.name.clone())
            .collect();
        assert_eq!(names, vec!["planner", "coder", "reviewer"]);
    }

    #[test]
    fn test_span_update_sets_usage_and_model() {
        let sink = MemorySink::new(config());
        let mut trace = sink.create_trace(trace_fields("chat")).unwrap();
        let mut span = trace.add_generation(generation_fields("coder")).unwrap();

        let usage = TokenUsage::new(10, 5, 0.1, 0.2);
        span.update(GenerationUpdate {
            model: Some("gpt-4".to_string()),
            usage: Some(usage.clone()),
        })
        .unwrap();

        let generation = &sink.traces()[0].generations[0];
        assert_eq!(generation.fields.model, "gpt-4");
        assert_eq!(generation.usage, Some(usage));
    }

    #[test]
    fn test_updates_are_partial_and_idempotent() {
        let sink = MemorySink::new(config());
        let mut trace = sink.create_trace(trace_fields("chat")).unwrap();

        let mut metadata = Map::new();
        metadata.insert("team".to_string(), json!({"name": "core"}));

        trace.update(TraceUpdate::tags(vec!["prod".to_string()])).unwrap();
        trace.update(TraceUpdate::metadata(metadata.clone())).unwrap();
        trace.update(TraceUpdate::metadata(metadata.clone())).unwrap();
        trace.update(TraceUpdate::default()).unwrap();

        let stored = &sink.traces()[0];
        assert_eq!(stored.tags, Some(vec!["prod".to_string()]));
        assert_eq!(stored.metadata, Some(metadata));
    }

    #[test]
    fn test_metadata_updates_merge() {
        let sink = MemorySink::new(config());
        let mut trace = sink.create_trace(trace_fields("chat")).unwrap();

        let first = json!({"run": {"attempt": 1, "region": "eu"}});
        let second = json!({"run": {"attempt": 2}});
        for update in [first, second] {
            if let Value::Object(map) = update {
                trace.update(TraceUpdate::metadata(map)).unwrap();
            }
        }

        let metadata = sink.traces()[0].metadata.clone().unwrap();
        assert_eq!(metadata["run"]["attempt"], 2);
        assert_eq!(metadata["run"]["region"], "eu");
    }

    #[test]
    fn test_sampled_out_traces_are_not_stored() {
        let sink = MemorySink::new(config().with_sample_rate(0.0));
        let mut trace = sink.create_trace(trace_fields("chat")).unwrap();
        trace.add_generation(generation_fields("coder")).unwrap();

        assert!(!trace.is_recorded());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_sampled_in_traces_are_recorded() {
        let sink = MemorySink::new(config());
        let trace = sink.create_trace(trace_fields("chat")).unwrap();
        assert!(trace.is_recorded());
    }

    #[test]
    fn test_handles_fail_after_clear() {
        let sink = MemorySink::new(config());
        let mut trace = sink.create_trace(trace_fields("chat")).unwrap();
        let mut span = trace.add_generation(generation_fields("coder")).unwrap();

        sink.clone().clear();

        let err = trace.update(TraceUpdate::tags(vec!["prod".to_string()])).unwrap_err();
        assert!(matches!(err, LangfusedError::SinkError(_)));
        assert!(trace.add_generation(generation_fields("reviewer")).is_err());
        assert!(span.update(GenerationUpdate::default()).is_err());
    }

    #[test]
    fn test_stale_handle_does_not_touch_newer_trace() {
        let sink = MemorySink::new(config());
        let mut stale = sink.create_trace(trace_fields("first")).unwrap();
        sink.clear();
        sink.create_trace(trace_fields("second")).unwrap();

        assert!(stale.update(TraceUpdate::tags(vec!["x".to_string()])).is_err());
        assert!(sink.traces()[0].tags.is_none());
    }

    #[test]
    fn test_clear() {
        let sink = MemorySink::new(config());
        sink.create_trace(trace_fields("chat")).unwrap();
        sink.clear();
        assert!(sink.is_empty());
    }
}
