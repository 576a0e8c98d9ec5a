//! Trace construction and cost accounting
//!
//! Instrumented agents append [`InteractionRecord`]s to a shared
//! [`TracksStore`] while a conversation runs. When the observed call returns,
//! a [`TraceRecorder`] turns the records into a [`Trace`] with one
//! [`GenerationSpan`] per agent turn, each carrying its [`TokenUsage`], and
//! emits them through a [`TraceSink`](crate::sink::TraceSink).
//!
//! # Architecture
//!
//! - **TracksStore**: shared, insertion-ordered record storage
//! - **UsageCalculator**: token counting plus pricing for one generation
//! - **ModelSelector**: picks the model id from the call's cost breakdown
//! - **TraceRecorder**: lifecycle of one trace, from start to emission
//! - **Observer**: wraps a unit of work in a fresh recorder per call
//!
//! # Record names
//!
//! Records named [`USER_PROXY`] belong to the conversation's initiator and are
//! not turned into spans. Records named [`SPEAKER_SELECTION_AGENT`] are shown
//! under the coordinator agent's name when one is set.

pub mod chat_result;
pub mod models;
pub mod observation;
pub mod trace_recorder;
pub mod tracks_store;
pub mod usage;

pub use chat_result::{ChatResult, CostReport, ModelSelector, USAGE_INCLUDING_CACHED_INFERENCE};
pub use models::{GenerationSpan, InteractionRecord, TokenUsage, Trace, UsageUnit};
pub use observation::{NamedAgent, Observation, ObservationOptions, Observer};
pub use trace_recorder::{
    ObservationWarning, RecorderState, TraceOptions, TraceRecorder, TraceSummary,
    SPEAKER_SELECTION_AGENT, USER_PROXY,
};
pub use tracks_store::{RecordCallback, TracksStore};
pub use usage::UsageCalculator;
