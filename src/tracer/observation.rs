//! Observed execution of a unit of work
//!
//! [`Observer::observe`] opens a trace, runs the work, and finalizes the trace
//! from whatever the instrumented agents appended to the bound store while the
//! work ran. Every exit path closes the recorder: a failing work function
//! aborts it without emitting anything.
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use langfused::prelude::*;
//!
//! let sink = Arc::new(connect(MemorySink::new(SinkConfig::from_env()?))?);
//! let store = TracksStore::default();
//!
//! let mut observer = Observer::new(sink);
//! observer.set_tracks_store(&store)?;
//! observer.set_coordinator("chat_manager");
//!
//! let observation = observer.observe(ObservationOptions::new().with_tags(["demo"]), || {
//!     let result = run_group_chat(&store)?;
//!     Ok::<_, anyhow::Error>((result.clone(), result.summary, "Plan a trip".to_string()))
//! })?;
//! println!("cost: ${:.6}", observation.summary.total_cost());
//! ```

use super::chat_result::{CostReport, ModelSelector};
use super::trace_recorder::{validate_records, TraceOptions, TraceRecorder, TraceSummary, USER_PROXY};
use super::tracks_store::TracksStore;
use super::usage::UsageCalculator;
use crate::error::{LangfusedError, Result};
use crate::sink::TraceSink;
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::sync::Arc;
use tracing::info;

/// An agent that can be named as the conversation's coordinator.
pub trait NamedAgent {
    fn name(&self) -> &str;
}

/// Per-call trace settings. Unset fields fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationOptions {
    /// Trace name; defaults to the observed function's name
    pub name: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<Map<String, Value>>,
}

impl ObservationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
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

    fn into_trace_options(self, default_name: String) -> TraceOptions {
        TraceOptions {
            name: self.name.unwrap_or(default_name),
            user_id: self.user_id,
            session_id: self.session_id,
            tags: self.tags,
            metadata: self.metadata,
        }
    }
}

/// What an observed call hands back.
#[derive(Debug, Clone)]
pub struct Observation<R, O, I> {
    /// Raw result of the work, e.g. a [`ChatResult`](super::ChatResult)
    pub result: R,
    pub final_output: O,
    pub initial_input: I,
    pub summary: TraceSummary,
}

impl<R, O, I> Observation<R, O, I> {
    /// The work's own return values, without the trace summary.
    pub fn into_parts(self) -> (R, O, I) {
        (self.result, self.final_output, self.initial_input)
    }
}

/// Wraps units of work in traces.
///
/// An observer holds only the bound store and the coordinator name across
/// calls; every call to [`observe`](Observer::observe) gets a fresh recorder.
pub struct Observer {
    sink: Arc<dyn TraceSink>,
    usage: UsageCalculator,
    model_selector: ModelSelector,
    proxy_name: String,
    coordinator: Option<String>,
    store: Option<TracksStore>,
}

impl Observer {
    /// Create an observer emitting to `sink`, with tiktoken counting and the
    /// bundled price list.
    pub fn new(sink: Arc<dyn TraceSink>) -> Self {
        Self {
            sink,
            usage: UsageCalculator::default(),
            model_selector: ModelSelector::default(),
            proxy_name: USER_PROXY.to_string(),
            coordinator: None,
            store: None,
        }
    }

    pub fn with_usage_calculator(mut self, usage: UsageCalculator) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_model_selector(mut self, model_selector: ModelSelector) -> Self {
        self.model_selector = model_selector;
        self
    }

    pub fn with_proxy_name(mut self, proxy_name: impl Into<String>) -> Self {
        self.proxy_name = proxy_name.into();
        self
    }

    /// Bind the store the instrumented agents append to.
    ///
    /// The observer keeps a handle to `store` itself, never a copy of its
    /// records.
    pub fn set_tracks_store(&mut self, store: &TracksStore) -> Result<()> {
        validate_records(&store.snapshot())?;
        self.store = Some(store.clone());
        Ok(())
    }

    pub fn tracks_store(&self) -> Option<&TracksStore> {
        self.store.as_ref()
    }

    pub fn set_coordinator_agent<A: NamedAgent + ?Sized>(&mut self, agent: &A) {
        self.set_coordinator(agent.name());
    }

    pub fn set_coordinator(&mut self, name: impl Into<String>) {
        self.coordinator = Some(name.into());
    }

    /// Run `work` inside a new trace.
    ///
    /// `work` returns `(raw_result, final_output, initial_input)`. The trace is
    /// named after `work` unless `options` names it.
    ///
    /// The bound [`TracksStore`] is shared and keeps accumulating across
    /// calls: every record still in it at finalize becomes a span, including
    /// records from earlier observations. Call [`TracksStore::clear`] between
    /// runs to get one run's spans per trace.
    ///
    /// # Errors
    ///
    /// * [`LangfusedError::TracksStoreMissing`] if no store is bound; `work` is not run
    /// * [`LangfusedError::Work`] if `work` fails; nothing is emitted
    /// * any error from [`TraceRecorder::finalize`]
    pub fn observe<F, R, O, I, E>(
        &self,
        options: ObservationOptions,
        work: F,
    ) -> Result<Observation<R, O, I>>
    where
        F: FnOnce() -> std::result::Result<(R, O, I), E>,
        R: CostReport,
        O: Serialize,
        I: Serialize,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        let store = self.store.as_ref().ok_or(LangfusedError::TracksStoreMissing)?;

        let mut recorder = TraceRecorder::new(Arc::clone(&self.sink), self.usage.clone())
            .with_model_selector(self.model_selector.clone())
            .with_proxy_name(self.proxy_name.clone());
        recorder.set_coordinator(self.coordinator.clone());
        recorder.attach_records(store)?;

        let trace = recorder.start(options.into_trace_options(work_name::<F>()))?;
        info!(
            trace = %trace.name,
            session_id = %trace.session_id,
            "Observation started"
        );

        let (result, final_output, initial_input) = match work() {
            Ok(returned) => returned,
            Err(e) => {
                let e: Box<dyn Error + Send + Sync> = e.into();
                recorder.abort(&e.to_string());
                return Err(LangfusedError::Work(e));
            }
        };

        let values = serde_json::to_value(&initial_input)
            .and_then(|input| Ok((input, serde_json::to_value(&final_output)?)));
        let (input, output) = match values {
            Ok(values) => values,
            Err(e) => {
                recorder.abort(&e.to_string());
                return Err(e.into());
            }
        };

        let summary = recorder.finalize(input, output, &result)?;
        info!(
            trace_id = %summary.trace_id,
            spans = summary.spans.len(),
            total_cost = summary.total_cost(),
            "Observation finished"
        );

        Ok(Observation {
            result,
            final_output,
            initial_input,
            summary,
        })
    }
}

/// Name of the function `F` is, or of the function a closure `F` was defined in.
fn work_name<F>() -> String {
    let full = std::any::type_name::<F>();
    let path = full.split('<').next().unwrap_or(full);

    path.split("::")
        .filter(|segment| !segment.is_empty() && !segment.starts_with('{'))
        .last()
        .unwrap_or("observation")
        .to_string()
}
