//! Trace data model
//!
//! This module defines the records agents capture ([`InteractionRecord`]) and
//! what the recorder derives from them: the [`Trace`], its [`GenerationSpan`]s
//! and their [`TokenUsage`].

use crate::sink::{GenerationFields, TraceFields};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One agent turn, as captured by an instrumented agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// Name of the agent that produced the turn
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// What the agent was given (plain text is a JSON string)
    pub input: Value,
    /// What the agent produced
    pub output: Value,
}

impl InteractionRecord {
    pub fn new(
        name: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        input: impl Into<Value>,
        output: impl Into<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            start_time,
            end_time,
            input: input.into(),
            output: output.into(),
        }
    }

    /// Wall-clock duration of the turn.
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// Describe what is wrong with the record, if anything.
    pub(crate) fn defect(&self) -> Option<String> {
        if self.name.trim().is_empty() {
            return Some("record has an empty name".to_string());
        }
        if self.end_time < self.start_time {
            return Some(format!(
                "record '{}' ends ({}) before it starts ({})",
                self.name, self.end_time, self.start_time
            ));
        }
        None
    }
}

/// Top-level timed record of one observed call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub name: String,
    pub user_id: String,
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub input: Value,
    pub output: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl Trace {
    /// Fields the sink creates the trace with.
    pub fn fields(&self) -> TraceFields {
        TraceFields {
            name: self.name.clone(),
            user_id: self.user_id.clone(),
            session_id: self.session_id.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            input: self.input.clone(),
            output: self.output.clone(),
        }
    }
}

/// Unit the usage figures are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsageUnit {
    #[serde(rename = "TOKENS")]
    Tokens,
}

/// Token counts and cost of one generation.
///
/// Only the input and output figures are supplied; totals are derived, so
/// `total_tokens == input_tokens + output_tokens` and
/// `total_cost == input_cost + output_cost` always hold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenUsage {
    #[serde(rename = "input")]
    input_tokens: usize,
    #[serde(rename = "output")]
    output_tokens: usize,
    #[serde(rename = "total")]
    total_tokens: usize,
    #[serde(rename = "inputCost")]
    input_cost: f64,
    #[serde(rename = "outputCost")]
    output_cost: f64,
    #[serde(rename = "totalCost")]
    total_cost: f64,
    unit: UsageUnit,
}

impl TokenUsage {
    pub fn new(input_tokens: usize, output_tokens: usize, input_cost: f64, output_cost: f64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            input_cost,
            output_cost,
            total_cost: input_cost + output_cost,
            unit: UsageUnit::Tokens,
        }
    }

    pub fn input_tokens(&self) -> usize {
        self.input_tokens
    }

    pub fn output_tokens(&self) -> usize {
        self.output_tokens
    }

    pub fn total_tokens(&self) -> usize {
        self.total_tokens
    }

    pub fn input_cost(&self) -> f64 {
        self.input_cost
    }

    pub fn output_cost(&self) -> f64 {
        self.output_cost
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    pub fn unit(&self) -> UsageUnit {
        self.unit
    }
}

/// Child of a trace describing one model invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationSpan {
    pub name: String,
    pub model: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub input: Value,
    pub output: Value,
    pub usage: TokenUsage,
}

impl GenerationSpan {
    /// Derive a span from a record under a display name.
    pub fn from_record(
        record: &InteractionRecord,
        name: impl Into<String>,
        model: impl Into<String>,
        usage: TokenUsage,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            start_time: record.start_time,
            end_time: record.end_time,
            input: record.input.clone(),
            output: record.output.clone(),
            usage,
        }
    }

    /// Fields the sink creates the generation with.
    pub fn fields(&self) -> GenerationFields {
        GenerationFields {
            name: self.name.clone(),
            model: self.model.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            input: self.input.clone(),
            output: self.output.clone(),
        }
    }
}
