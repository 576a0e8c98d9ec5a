//! Null sink implementation following the Null Object Pattern
//!
//! [`NullSink`] accepts every trace and span and keeps nothing. Recording sinks
//! also hand out [`NullTraceHandle`]s for traces dropped by sampling, so the
//! recorder never needs to check whether a trace is actually being kept.

use super::{GenerationFields, GenerationUpdate, SpanHandle, TraceFields, TraceHandle, TraceSink, TraceUpdate};
use crate::error::Result;
use uuid::Uuid;

/// A sink that silently discards all traces.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NullSink {
    pub fn new() -> Self {
        Self
    }
}

impl TraceSink for NullSink {
    fn auth_check(&self) -> Result<()> {
        Ok(())
    }

    fn create_trace(&self, _fields: TraceFields) -> Result<Box<dyn TraceHandle>> {
        Ok(Box::new(NullTraceHandle::new()))
    }
}

/// Trace handle that accepts updates and generations and drops them.
#[derive(Debug)]
pub struct NullTraceHandle {
    id: String,
}

impl NullTraceHandle {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
        }
    }
}

impl Default for NullTraceHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceHandle for NullTraceHandle {
    fn id(&self) -> &str {
        &self.id
    }

    fn update(&mut self, _update: TraceUpdate) -> Result<()> {
        Ok(())
    }

    fn add_generation(&mut self, _fields: GenerationFields) -> Result<Box<dyn SpanHandle>> {
        Ok(Box::new(NullSpanHandle::new()))
    }

    fn is_recorded(&self) -> bool {
        false
    }
}

/// Span handle that drops every update.
#[derive(Debug)]
pub struct NullSpanHandle {
    id: String,
}

impl NullSpanHandle {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
        }
    }
}

impl Default for NullSpanHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SpanHandle for NullSpanHandle {
    fn id(&self) -> &str {
        &self.id
    }

    fn update(&mut self, _update: GenerationUpdate) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn trace_fields() -> TraceFields {
        TraceFields {
            name: "chat".to_string(),
            user_id: "user".to_string(),
            session_id: "session".to_string(),
            start_time: Utc::now(),
            end_time: None,
            input: json!("hi"),
            output: json!(null),
        }
    }

    #[test]
    fn test_null_sink_accepts_everything() {
        let sink = NullSink::new();
        assert!(sink.auth_check().is_ok());

        let mut trace = sink.create_trace(trace_fields()).unwrap();
        trace.update(TraceUpdate::tags(vec!["a".to_string()])).unwrap();

        let now = Utc::now();
        let mut span = trace
            .add_generation(GenerationFields {
                name: "coder".to_string(),
                model: "gpt-4o-mini".to_string(),
                start_time: now,
                end_time: now,
                input: json!("in"),
                output: json!("out"),
            })
            .unwrap();
        span.update(GenerationUpdate::default()).unwrap();
    }

    #[test]
    fn test_handles_get_distinct_ids() {
        let first = NullTraceHandle::new();
        let second = NullTraceHandle::new();
        assert_ne!(first.id(), second.id());
        assert!(!NullSpanHandle::new().id().is_empty());
    }

    #[test]
    fn test_null_trace_handle_is_not_recorded() {
        let trace = NullSink::new().create_trace(trace_fields()).unwrap();
        assert!(!trace.is_recorded());
    }
}
