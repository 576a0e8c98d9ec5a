//! Trace recorder for one observed call
//!
//! The recorder owns the lifecycle of a single trace:
//!
//! ```text
//! Unstarted --start--> Open --finalize--> Finalizing --> Closed
//!                        \----abort/drop--------------/
//! ```
//!
//! At finalize it walks the bound [`TracksStore`] in insertion order, prices
//! every record that was not produced by the initiating proxy, and emits one
//! generation span per record through the [`TraceSink`]. Everything that can
//! fail without touching the sink (store binding, record validation, model
//! resolution) is checked before the recorder enters `Finalizing`, so those
//! failures emit nothing.

use super::chat_result::{CostReport, ModelSelector};
use super::models::{GenerationSpan, InteractionRecord, Trace};
use super::tracks_store::TracksStore;
use super::usage::UsageCalculator;
use crate::error::{LangfusedError, Result};
use crate::identity::{generate_session_id, generate_user_id};
use crate::sink::{GenerationUpdate, TraceHandle, TraceSink, TraceUpdate};
use chrono::Utc;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Record name of the agent that initiates the conversation. Its turns are not spans.
pub const USER_PROXY: &str = "user_proxy";

/// Record name of coordination turns, shown under the coordinator's name.
pub const SPEAKER_SELECTION_AGENT: &str = "speaker_selection_agent";

/// Lifecycle state of a [`TraceRecorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Unstarted,
    Open,
    Finalizing,
    Closed,
}

impl RecorderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecorderState::Unstarted => "unstarted",
            RecorderState::Open => "open",
            RecorderState::Finalizing => "finalizing",
            RecorderState::Closed => "closed",
        }
    }
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a trace is opened with.
///
/// Missing user and session ids are generated when the trace starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceOptions {
    pub name: String,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<Map<String, Value>>,
}

impl TraceOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Non-fatal conditions met while finalizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationWarning {
    /// The store held no records outside the proxy's; the trace was emitted without spans
    NoGenerations,
    /// The sink dropped the trace by sampling; spans were neither priced nor emitted
    SampledOut,
}

/// Outcome of a finalized trace.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceSummary {
    /// Id the sink assigned to the trace
    pub trace_id: String,
    pub trace: Trace,
    /// Model the spans were priced as; `None` when no record produces a span
    pub model: Option<String>,
    /// Emitted spans, in emission order
    pub spans: Vec<GenerationSpan>,
    pub warnings: Vec<ObservationWarning>,
}

impl TraceSummary {
    pub fn total_cost(&self) -> f64 {
        self.spans.iter().map(|s| s.usage.total_cost()).sum()
    }

    pub fn total_tokens(&self) -> usize {
        self.spans.iter().map(|s| s.usage.total_tokens()).sum()
    }
}

/// Check every record of a store snapshot.
pub(crate) fn validate_records(records: &[InteractionRecord]) -> Result<()> {
    for (index, record) in records.iter().enumerate() {
        if let Some(defect) = record.defect() {
            return Err(LangfusedError::TracksStoreInvalid(format!(
                "record {}: {}",
                index, defect
            )));
        }
    }
    Ok(())
}

/// Records the trace of one observed call.
pub struct TraceRecorder {
    sink: Arc<dyn TraceSink>,
    usage: UsageCalculator,
    model_selector: ModelSelector,
    proxy_name: String,
    coordinator: Option<String>,
    store: Option<TracksStore>,
    state: RecorderState,
    trace: Option<Trace>,
}

impl TraceRecorder {
    /// Create a new recorder
    ///
    /// # Arguments
    ///
    /// * `sink` - Where the trace and its spans are emitted
    /// * `usage` - Token counting and pricing for the spans
    pub fn new(sink: Arc<dyn TraceSink>, usage: UsageCalculator) -> Self {
        Self {
            sink,
            usage,
            model_selector: ModelSelector::default(),
            proxy_name: USER_PROXY.to_string(),
            coordinator: None,
            store: None,
            state: RecorderState::Unstarted,
            trace: None,
        }
    }

    pub fn with_model_selector(mut self, model_selector: ModelSelector) -> Self {
        self.model_selector = model_selector;
        self
    }

    /// Override the record name whose turns are excluded from spans.
    pub fn with_proxy_name(mut self, proxy_name: impl Into<String>) -> Self {
        self.proxy_name = proxy_name.into();
        self
    }

    /// Name the coordinator agent that speaker-selection records are shown as.
    pub fn set_coordinator(&mut self, coordinator: Option<String>) {
        self.coordinator = coordinator;
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// The trace, while the recorder is open.
    pub fn trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }

    /// Bind the shared record store.
    ///
    /// The recorder keeps a handle to the same store the agents append to, so
    /// records added after binding are seen at finalize.
    pub fn attach_records(&mut self, store: &TracksStore) -> Result<()> {
        validate_records(&store.snapshot())?;
        self.store = Some(store.clone());
        Ok(())
    }

    /// Open the trace.
    pub fn start(&mut self, options: TraceOptions) -> Result<&Trace> {
        self.expect_state(RecorderState::Unstarted)?;

        let user_id = options.user_id.unwrap_or_else(generate_user_id);
        let session_id = options
            .session_id
            .unwrap_or_else(|| generate_session_id(&user_id));

        debug!(name = %options.name, %user_id, %session_id, "Trace opened");

        self.state = RecorderState::Open;
        Ok(&*self.trace.insert(Trace {
            name: options.name,
            user_id,
            session_id,
            start_time: Utc::now(),
            end_time: None,
            input: Value::Null,
            output: Value::Null,
            tags: options.tags,
            metadata: options.metadata,
        }))
    }

    /// Close the trace and emit it with one span per non-proxy record.
    ///
    /// # Errors
    ///
    /// Binding, validation and model resolution errors are returned before
    /// anything is emitted. A pricing or tokenizer failure on a span is
    /// returned as [`LangfusedError::SpanCost`]; the trace and the spans
    /// emitted before it stay in the sink.
    pub fn finalize(
        &mut self,
        initial_input: Value,
        final_output: Value,
        report: &dyn CostReport,
    ) -> Result<TraceSummary> {
        self.expect_state(RecorderState::Open)?;

        let (records, model) = match self.prepare(report) {
            Ok(prepared) => prepared,
            Err(e) => {
                self.abort(&e.to_string());
                return Err(e);
            }
        };

        self.state = RecorderState::Finalizing;
        let result = self.emit(records, model, initial_input, final_output);
        self.state = RecorderState::Closed;
        result
    }

    /// Close the trace without emitting anything.
    pub fn abort(&mut self, reason: &str) {
        if matches!(self.state, RecorderState::Unstarted | RecorderState::Open) {
            let name = self.trace.take().map(|t| t.name).unwrap_or_default();
            warn!(trace = %name, reason, "Observation aborted, trace not emitted");
            self.state = RecorderState::Closed;
        }
    }

    fn expect_state(&self, expected: RecorderState) -> Result<()> {
        if self.state != expected {
            return Err(LangfusedError::InvalidState {
                expected: expected.as_str(),
                actual: self.state.as_str(),
            });
        }
        Ok(())
    }

    fn prepare(&self, report: &dyn CostReport) -> Result<(Vec<InteractionRecord>, Option<String>)> {
        let store = self.store.as_ref().ok_or(LangfusedError::TracksStoreMissing)?;
        let records = store.snapshot();
        validate_records(&records)?;

        let model = if records.iter().any(|r| r.name != self.proxy_name) {
            Some(self.model_selector.resolve(report)?)
        } else {
            None
        };

        Ok((records, model))
    }

    fn emit(
        &mut self,
        records: Vec<InteractionRecord>,
        model: Option<String>,
        initial_input: Value,
        final_output: Value,
    ) -> Result<TraceSummary> {
        let mut trace = self
            .trace
            .take()
            .ok_or(LangfusedError::InvalidState {
                expected: RecorderState::Open.as_str(),
                actual: RecorderState::Finalizing.as_str(),
            })?;
        trace.end_time = Some(Utc::now());
        trace.input = initial_input;
        trace.output = final_output;

        let mut handle = self.sink.create_trace(trace.fields())?;
        if let Some(tags) = &trace.tags {
            handle.update(TraceUpdate::tags(tags.clone()))?;
        }
        if let Some(metadata) = &trace.metadata {
            handle.update(TraceUpdate::metadata(metadata.clone()))?;
        }

        let mut spans = Vec::new();
        let mut warnings = Vec::new();

        match &model {
            Some(_) if !handle.is_recorded() => {
                debug!(trace = %trace.name, "Trace sampled out, skipping span costs");
                warnings.push(ObservationWarning::SampledOut);
            }
            None => {
                warn!(trace = %trace.name, "No agent interaction records found, trace has no generations");
                warnings.push(ObservationWarning::NoGenerations);
            }
            Some(model) => {
                for record in records.iter().filter(|r| r.name != self.proxy_name) {
                    let span = self.emit_span(handle.as_mut(), record, model, spans.len())?;
                    spans.push(span);
                }
            }
        }

        debug!(
            trace_id = %handle.id(),
            spans = spans.len(),
            "Trace emitted"
        );

        Ok(TraceSummary {
            trace_id: handle.id().to_string(),
            trace,
            model,
            spans,
            warnings,
        })
    }

    fn emit_span(
        &self,
        handle: &mut dyn TraceHandle,
        record: &InteractionRecord,
        model: &str,
        emitted: usize,
    ) -> Result<GenerationSpan> {
        let usage = self
            .usage
            .usage(model, &record.input, &record.output)
            .map_err(|e| LangfusedError::SpanCost {
                trace_id: handle.id().to_string(),
                emitted,
                source: Box::new(e),
            })?;

        let span = GenerationSpan::from_record(record, self.span_name(&record.name), model, usage);

        let mut span_handle = handle.add_generation(span.fields())?;
        span_handle.update(GenerationUpdate {
            model: Some(span.model.clone()),
            usage: Some(span.usage.clone()),
        })?;

        Ok(span)
    }

    fn span_name(&self, record_name: &str) -> String {
        match &self.coordinator {
            Some(coordinator) if record_name == SPEAKER_SELECTION_AGENT => coordinator.clone(),
            _ => record_name.to_string(),
        }
    }
}

impl Drop for TraceRecorder {
    fn drop(&mut self) {
        if self.state == RecorderState::Open {
            let name = self.trace.as_ref().map(|t| t.name.as_str()).unwrap_or_default();
            warn!(trace = %name, "Recorder dropped while open, observation abandoned");
        }
    }
}
