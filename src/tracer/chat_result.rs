//! Results of observed conversations and model resolution.
//!
//! The observed work hands back a raw result whose cost breakdown, keyed by
//! model identifier, tells the recorder which model produced the
//! generations. [`ModelSelector`] turns that breakdown into one model id.

use crate::error::{LangfusedError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;

/// Usage key whose breakdown includes cached inference.
pub const USAGE_INCLUDING_CACHED_INFERENCE: &str = "usage_including_cached_inference";

/// Anything exposing a per-model cost breakdown.
pub trait CostReport {
    /// The `usage_including_cached_inference` mapping, keyed by model id.
    fn usage_breakdown(&self) -> Option<&Map<String, Value>>;
}

/// Result of a multi-agent chat, in the shape agent frameworks report it.
///
/// ```json
/// {
///   "summary": "...",
///   "cost": {
///     "usage_including_cached_inference": {
///       "total_cost": 0.0004,
///       "gpt-4o-mini-2024-07-18": {"cost": 0.0004, "prompt_tokens": 900, ...}
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResult {
    #[serde(default)]
    pub chat_id: Option<u64>,
    #[serde(default)]
    pub chat_history: Vec<Value>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub cost: Map<String, Value>,
}

impl ChatResult {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Default::default()
        }
    }

    /// Add one model's usage to the cached-inference breakdown and its running total.
    pub fn with_model_usage(
        mut self,
        model: impl Into<String>,
        prompt_tokens: u64,
        completion_tokens: u64,
        cost: f64,
    ) -> Self {
        let breakdown = self
            .cost
            .entry(USAGE_INCLUDING_CACHED_INFERENCE)
            .or_insert_with(|| json!({"total_cost": 0.0}));

        if let Value::Object(map) = breakdown {
            let total = map.get("total_cost").and_then(Value::as_f64).unwrap_or(0.0) + cost;
            map.insert("total_cost".to_string(), json!(total));
            map.insert(
                model.into(),
                json!({
                    "cost": cost,
                    "prompt_tokens": prompt_tokens,
                    "completion_tokens": completion_tokens,
                    "total_tokens": prompt_tokens + completion_tokens,
                }),
            );
        }

        self
    }
}

impl CostReport for ChatResult {
    fn usage_breakdown(&self) -> Option<&Map<String, Value>> {
        self.cost.get(USAGE_INCLUDING_CACHED_INFERENCE)?.as_object()
    }
}

/// A raw JSON result with a top-level `cost` object.
impl CostReport for Value {
    fn usage_breakdown(&self) -> Option<&Map<String, Value>> {
        self.get("cost")?.get(USAGE_INCLUDING_CACHED_INFERENCE)?.as_object()
    }
}

/// How the recorder picks the model id for a trace's generations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSelector {
    /// Always use this model id, ignoring the cost report
    Explicit(String),
    /// First breakdown key containing the substring, in the breakdown's order
    FirstUsageKeyContaining(String),
}

impl Default for ModelSelector {
    fn default() -> Self {
        ModelSelector::FirstUsageKeyContaining("gpt".to_string())
    }
}

impl ModelSelector {
    /// Resolve the model id for `report`.
    ///
    /// With the substring heuristic, several matching keys mean several models
    /// took part in the call; the first one wins and a warning is logged.
    pub fn resolve(&self, report: &dyn CostReport) -> Result<String> {
        let needle = match self {
            ModelSelector::Explicit(model) => return Ok(model.clone()),
            ModelSelector::FirstUsageKeyContaining(needle) => needle,
        };

        let breakdown = report.usage_breakdown().ok_or_else(|| {
            LangfusedError::ModelResolution(format!(
                "result has no '{}' cost breakdown",
                USAGE_INCLUDING_CACHED_INFERENCE
            ))
        })?;

        let matches: Vec<&String> = breakdown.keys().filter(|key| key.contains(needle.as_str())).collect();

        match matches.as_slice() {
            [] => Err(LangfusedError::ModelResolution(format!(
                "no model in the cost breakdown contains '{}'",
                needle
            ))),
            [model] => Ok(model.to_string()),
            [model, ..] => {
                warn!(
                    chosen = %model,
                    candidates = matches.len(),
                    "Several models match the cost breakdown, using the first"
                );
                Ok(model.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_model_usage_builds_breakdown() {
        let result = ChatResult::new("done")
            .with_model_usage("gpt-4o-mini-2024-07-18", 900, 100, 0.0002)
            .with_model_usage("gpt-4o-mini", 10, 10, 0.0001);

        let breakdown = result.usage_breakdown().unwrap();
        let keys: Vec<&String> = breakdown.keys().collect();
        assert_eq!(keys, vec!["total_cost", "gpt-4o-mini-2024-07-18", "gpt-4o-mini"]);
        assert_eq!(breakdown["gpt-4o-mini-2024-07-18"]["total_tokens"], 1000);
        assert!((breakdown["total_cost"].as_f64().unwrap() - 0.0003).abs() < 1e-12);
    }

    #[test]
    fn test_default_selector_picks_gpt_key() {
        let result = ChatResult::new("done").with_model_usage("gpt-4o-mini", 1, 1, 0.0);
        assert_eq!(ModelSelector::default().resolve(&result).unwrap(), "gpt-4o-mini");
    }

    #[test]
    fn test_first_match_wins_in_document_order() {
        let raw: Value = serde_json::from_str(
            r#"{"cost": {"usage_including_cached_inference": {
                "total_cost": 0.1,
                "gpt-4o-mini": {"cost": 0.05},
                "gpt-4": {"cost": 0.05}
            }}}"#,
        )
        .unwrap();

        assert_eq!(ModelSelector::default().resolve(&raw).unwrap(), "gpt-4o-mini");
    }

    #[test]
    fn test_no_matching_key() {
        let result = ChatResult::new("done").with_model_usage("o1-mini", 1, 1, 0.0);
        let err = ModelSelector::default().resolve(&result).unwrap_err();
        assert!(matches!(err, LangfusedError::ModelResolution(_)));
    }

    #[test]
    fn test_missing_breakdown() {
        let err = ModelSelector::default().resolve(&ChatResult::new("done")).unwrap_err();
        assert!(err.to_string().contains(USAGE_INCLUDING_CACHED_INFERENCE));
    }

    #[test]
    fn test_explicit_selector_ignores_report() {
        let selector = ModelSelector::Explicit("o1-mini".to_string());
        assert_eq!(selector.resolve(&ChatResult::new("done")).unwrap(), "o1-mini");
    }

    #[test]
    fn test_custom_substring() {
        let result = ChatResult::new("done").with_model_usage("o1-mini", 1, 1, 0.0);
        let selector = ModelSelector::FirstUsageKeyContaining("o1".to_string());
        assert_eq!(selector.resolve(&result).unwrap(), "o1-mini");
    }

    #[test]
    fn test_chat_result_deserializes_with_defaults() {
        let result: ChatResult = serde_json::from_str(r#"{"summary": "ok"}"#).unwrap();
        assert_eq!(result.summary, "ok");
        assert!(result.chat_history.is_empty());
        assert!(result.usage_breakdown().is_none());
    }
}
