//! Per-model token pricing.
//!
//! [`PricingTable`] maps a model identifier to its input and output price per
//! million tokens and turns token counts into money. The process-wide default
//! table is built lazily from the OpenAI price sheet, see [`get_pricing_table`].
//!
//! # Examples
//!
//! ```
//! use langfused::pricing::{get_pricing_table, TokenSide};
//!
//! let cost = get_pricing_table()
//!     .cost("gpt-4o-mini", 1_000_000, TokenSide::Output)
//!     .unwrap();
//! assert!((cost - 0.60).abs() < 1e-12);
//! ```

mod oai_prices;

use crate::error::{LangfusedError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Which side of a model call a token count belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSide {
    /// Prompt tokens sent to the model
    Input,
    /// Completion tokens produced by the model
    Output,
}

impl fmt::Display for TokenSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSide::Input => write!(f, "input"),
            TokenSide::Output => write!(f, "output"),
        }
    }
}

/// Price of one model, in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    pub input: f64,
    pub output: f64,
}

impl ModelPrice {
    pub fn per_million(input: f64, output: f64) -> Self {
        Self { input, output }
    }

    /// Price per million tokens for one side of the call.
    pub fn for_side(&self, side: TokenSide) -> f64 {
        match side {
            TokenSide::Input => self.input,
            TokenSide::Output => self.output,
        }
    }
}

/// Static mapping from model identifier to [`ModelPrice`].
#[derive(Debug, Clone, Default)]
pub struct PricingTable {
    prices: HashMap<String, ModelPrice>,
}

impl PricingTable {
    /// Create a table holding the OpenAI price sheet.
    pub fn new() -> Self {
        let mut table = Self::empty();
        for (model, input, output) in oai_prices::OAI_PRICES {
            table.insert(*model, ModelPrice::per_million(*input, *output));
        }
        table
    }

    /// Create a table with no entries.
    pub fn empty() -> Self {
        Self {
            prices: HashMap::new(),
        }
    }

    /// Add or replace a model price, builder style.
    pub fn with_model(mut self, model: impl Into<String>, price: ModelPrice) -> Self {
        self.insert(model, price);
        self
    }

    /// Add or replace a model price.
    pub fn insert(&mut self, model: impl Into<String>, price: ModelPrice) {
        self.prices.insert(model.into(), price);
    }

    /// Look up the price entry for a model.
    pub fn price(&self, model: &str) -> Option<&ModelPrice> {
        self.prices.get(model)
    }

    /// Check whether a model has a price entry.
    pub fn contains(&self, model: &str) -> bool {
        self.prices.contains_key(model)
    }

    /// All priced model identifiers, in no particular order.
    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.prices.keys().map(String::as_str)
    }

    /// Cost in USD of `token_count` tokens on one side of a call.
    ///
    /// # Errors
    ///
    /// Returns [`LangfusedError::UnknownModel`] when the model has no entry.
    pub fn cost(&self, model: &str, token_count: usize, side: TokenSide) -> Result<f64> {
        let price = self
            .price(model)
            .ok_or_else(|| LangfusedError::UnknownModel(model.to_string()))?;

        Ok(price.for_side(side) * token_count as f64 / 1_000_000.0)
    }
}

/// Global pricing table instance.
pub static PRICING_TABLE: LazyLock<PricingTable> = LazyLock::new(PricingTable::new);

/// Get the global pricing table built from the OpenAI price sheet.
pub fn get_pricing_table() -> &'static PricingTable {
    &PRICING_TABLE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpt4o_mini_prices() {
        let table = PricingTable::new();
        let price = table.price("gpt-4o-mini").unwrap();
        assert_eq!(price.input, 0.15);
        assert_eq!(price.output, 0.60);
    }

    #[test]
    fn test_cost_matches_formula() {
        let table = PricingTable::new();

        let input = table.cost("gpt-4o-mini", 100, TokenSide::Input).unwrap();
        let output = table.cost("gpt-4o-mini", 50, TokenSide::Output).unwrap();

        assert_eq!(input, 0.15 * 100.0 / 1e6);
        assert_eq!(output, 0.60 * 50.0 / 1e6);
    }

    #[test]
    fn test_zero_tokens_cost_nothing() {
        let table = get_pricing_table();
        for model in table.models() {
            for side in [TokenSide::Input, TokenSide::Output] {
                assert_eq!(table.cost(model, 0, side).unwrap(), 0.0, "{} {}", model, side);
            }
        }
    }

    #[test]
    fn test_cost_is_linear() {
        let table = get_pricing_table();
        for model in table.models() {
            for side in [TokenSide::Input, TokenSide::Output] {
                let one = table.cost(model, 1_000, side).unwrap();
                let three = table.cost(model, 3_000, side).unwrap();
                assert!((three - 3.0 * one).abs() < 1e-12, "{} {}", model, side);
            }
        }
    }

    #[test]
    fn test_unknown_model() {
        let table = PricingTable::new();
        let err = table.cost("llama3.2", 10, TokenSide::Input).unwrap_err();

        match err {
            LangfusedError::UnknownModel(model) => assert_eq!(model, "llama3.2"),
            other => panic!("Expected UnknownModel, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_table() {
        let table = PricingTable::empty().with_model("local-model", ModelPrice::per_million(1.0, 2.0));

        assert!(table.contains("local-model"));
        assert!(!table.contains("gpt-4"));
        assert_eq!(table.cost("local-model", 500_000, TokenSide::Output).unwrap(), 1.0);
    }

    #[test]
    fn test_insert_replaces_entry() {
        let mut table = PricingTable::new();
        table.insert("gpt-4", ModelPrice::per_million(1.0, 1.0));
        assert_eq!(table.price("gpt-4").unwrap().output, 1.0);
    }

    #[test]
    fn test_side_display() {
        assert_eq!(TokenSide::Input.to_string(), "input");
        assert_eq!(TokenSide::Output.to_string(), "output");
    }
}
