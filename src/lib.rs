//! # langfused
//!
//! Cost and latency tracing for multi-agent conversations.
//!
//! Agents record each turn into a shared [`TracksStore`](tracer::TracksStore).
//! An [`Observer`](tracer::Observer) wraps the conversation, and when it
//! returns, every turn becomes a generation span annotated with token counts
//! and cost, nested under one trace and handed to a
//! [`TraceSink`](sink::TraceSink).
//!
//! ## Example
//!
//! ```rust,ignore
//! use langfused::prelude::*;
//! use std::sync::Arc;
//!
//! let sink = Arc::new(connect(MemorySink::new(SinkConfig::from_env()?))?);
//! let store = TracksStore::default();
//!
//! let mut observer = Observer::new(sink);
//! observer.set_tracks_store(&store)?;
//!
//! let observation = observer.observe(ObservationOptions::new(), || run_chat(&store))?;
//! println!("{} spans", observation.summary.spans.len());
//! ```

pub mod error;
pub mod identity;
pub mod pricing;
pub mod sink;
pub mod tokens;
pub mod tracer;

pub use error::{LangfusedError, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{LangfusedError, Result};
    pub use crate::identity::{generate_session_id, generate_user_id};
    pub use crate::pricing::{get_pricing_table, PricingTable, TokenSide};
    pub use crate::sink::{connect, JsonlSink, MemorySink, NullSink, SinkConfig, TraceSink};
    pub use crate::tokens::TokenCounter;
    pub use crate::tracer::{
        ChatResult, InteractionRecord, ModelSelector, NamedAgent, ObservationOptions, Observer,
        TokenUsage, TracksStore, UsageCalculator,
    };
}
