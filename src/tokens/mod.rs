//! Token counting for cost accounting.
//!
//! [`TokenCounter`] counts the tokens of a JSON value for a given model using a
//! [`TokenizerProvider`]. The default provider, [`TiktokenProvider`], resolves
//! model identifiers through tiktoken and keeps one encoder per model.
//!
//! # Examples
//!
//! ```
//! use langfused::tokens::TokenCounter;
//! use serde_json::json;
//!
//! let counter = TokenCounter::default();
//! let first = counter.count(&json!("Hello, world!"), "gpt-4").unwrap();
//! let second = counter.count(&json!("Hello, world!"), "gpt-4").unwrap();
//! assert_eq!(first, second);
//! ```

pub mod tokenizer_gateway;

pub use tokenizer_gateway::TokenizerGateway;

use crate::error::{LangfusedError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Anything that turns text into a sequence of token ids.
pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Vec<usize>;
}

/// Source of model-specific tokenizers.
pub trait TokenizerProvider: Send + Sync {
    /// Tokenizer compatible with `model`.
    ///
    /// Fails with [`LangfusedError::UnsupportedModel`] when no mapping exists.
    fn tokenizer_for(&self, model: &str) -> Result<Arc<dyn Tokenizer>>;
}

/// Tokenizer provider backed by tiktoken's model table.
///
/// Encoders are expensive to build, so each model's gateway is created once and
/// shared afterwards.
#[derive(Default)]
pub struct TiktokenProvider {
    cache: Mutex<HashMap<String, Arc<TokenizerGateway>>>,
}

impl TiktokenProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenizerProvider for TiktokenProvider {
    fn tokenizer_for(&self, model: &str) -> Result<Arc<dyn Tokenizer>> {
        let mut cache = self.cache.lock().unwrap();

        if let Some(gateway) = cache.get(model) {
            let gateway: Arc<TokenizerGateway> = Arc::clone(gateway);
            return Ok(gateway);
        }

        tracing::debug!(model = model, "Loading tiktoken encoder");
        let gateway = Arc::new(TokenizerGateway::for_model(model)?);
        cache.insert(model.to_string(), Arc::clone(&gateway));

        Ok(gateway)
    }
}

/// Counts tokens of arbitrary JSON values for a model.
#[derive(Clone)]
pub struct TokenCounter {
    provider: Arc<dyn TokenizerProvider>,
}

impl TokenCounter {
    pub fn new(provider: Arc<dyn TokenizerProvider>) -> Self {
        Self { provider }
    }

    /// Token count of `text` under the tokenizer for `model`.
    ///
    /// Strings are counted as-is; any other value is counted on its compact
    /// JSON rendering (see [`stringify`]).
    pub fn count(&self, text: &Value, model: &str) -> Result<usize> {
        self.count_str(&stringify(text), model)
    }

    /// Token count of a plain string.
    pub fn count_str(&self, text: &str, model: &str) -> Result<usize> {
        let tokenizer = self.provider.tokenizer_for(model)?;
        Ok(tokenizer.encode(text).len())
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new(Arc::new(TiktokenProvider::new()))
    }
}

/// Deterministic string form of a JSON value.
///
/// A JSON string yields its contents without quotes. `null` yields `"None"`,
/// matching how agent frameworks print a missing message. Everything else is
/// compact JSON, keys in insertion order.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stringify_string_is_raw() {
        assert_eq!(stringify(&json!("hello there")), "hello there");
    }

    #[test]
    fn test_stringify_object_is_compact_and_ordered() {
        let value = json!({"role": "user", "content": "hi", "name": "planner"});
        assert_eq!(stringify(&value), r#"{"role":"user","content":"hi","name":"planner"}"#);
    }

    #[test]
    fn test_stringify_null_and_numbers() {
        assert_eq!(stringify(&Value::Null), "None");
        assert_eq!(stringify(&json!(42)), "42");
    }

    #[test]
    fn test_count_with_double() {
        let counter = TokenCounter::new(Arc::new(WordTokenizerProvider::new(&["gpt-4o-mini"])));
        assert_eq!(counter.count(&json!(words(100)), "gpt-4o-mini").unwrap(), 100);
        assert_eq!(counter.count(&json!(""), "gpt-4o-mini").unwrap(), 0);
    }

    #[test]
    fn test_count_unsupported_model() {
        let counter = TokenCounter::new(Arc::new(WordTokenizerProvider::new(&["gpt-4o-mini"])));
        let err = counter.count(&json!("hi"), "mistral").unwrap_err();
        assert!(matches!(err, LangfusedError::UnsupportedModel(_)));
    }

    #[test]
    fn test_tiktoken_count_is_deterministic() {
        let counter = TokenCounter::default();
        let inputs = vec![
            json!("Plan the migration, then hand off to the coder."),
            json!({"content": "Review the diff", "role": "assistant"}),
            json!([1, 2, 3]),
        ];

        for input in inputs {
            let first = counter.count(&input, "gpt-4").unwrap();
            for _ in 0..3 {
                assert_eq!(counter.count(&input, "gpt-4").unwrap(), first);
            }
        }
    }

    #[test]
    fn test_tiktoken_provider_caches_encoder() {
        let provider = TiktokenProvider::new();
        provider.tokenizer_for("gpt-4").unwrap();
        provider.tokenizer_for("gpt-4").unwrap();

        assert_eq!(provider.cache.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_tiktoken_provider_unsupported() {
        let provider = TiktokenProvider::new();
        let result = provider.tokenizer_for("llama3.2");
        assert!(matches!(result, Err(LangfusedError::UnsupportedModel(_))));
    }
}
