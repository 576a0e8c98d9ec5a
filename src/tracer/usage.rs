//! Token usage and cost of a single generation.

use super::models::TokenUsage;
use crate::error::Result;
use crate::pricing::{get_pricing_table, PricingTable, TokenSide};
use crate::tokens::TokenCounter;
use serde_json::Value;
use std::sync::Arc;

/// Combines a [`PricingTable`] and a [`TokenCounter`] into [`TokenUsage`].
#[derive(Clone)]
pub struct UsageCalculator {
    pricing: Arc<PricingTable>,
    counter: TokenCounter,
}

impl UsageCalculator {
    pub fn new(pricing: Arc<PricingTable>, counter: TokenCounter) -> Self {
        Self { pricing, counter }
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    /// Usage of one generation of `model` that read `input` and wrote `output`.
    ///
    /// # Errors
    ///
    /// [`UnsupportedModel`](crate::LangfusedError::UnsupportedModel) when the model
    /// has no tokenizer, [`UnknownModel`](crate::LangfusedError::UnknownModel) when
    /// it has no price.
    pub fn usage(&self, model: &str, input: &Value, output: &Value) -> Result<TokenUsage> {
        let input_tokens = self.counter.count(input, model)?;
        let output_tokens = self.counter.count(output, model)?;

        let input_cost = self.pricing.cost(model, input_tokens, TokenSide::Input)?;
        let output_cost = self.pricing.cost(model, output_tokens, TokenSide::Output)?;

        Ok(TokenUsage::new(input_tokens, output_tokens, input_cost, output_cost))
    }
}

impl Default for UsageCalculator {
    fn default() -> Self {
        Self::new(Arc::new(get_pricing_table().clone()), TokenCounter::default())
    }
}
