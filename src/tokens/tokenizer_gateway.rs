//! Tokenizer gateway for encoding and decoding text using tiktoken.
//!
//! A gateway wraps one tiktoken encoder, chosen either by encoding name or by
//! the model identifier it serves. Gateways implement [`Tokenizer`] so they can
//! be handed out by [`TiktokenProvider`](super::TiktokenProvider).

use super::Tokenizer;
use crate::error::{LangfusedError, Result};
use tiktoken_rs::CoreBPE;

/// Gateway for tokenizing and detokenizing text using tiktoken.
///
/// # Examples
///
/// ```
/// use langfused::tokens::TokenizerGateway;
///
/// let tokenizer = TokenizerGateway::new("cl100k_base").unwrap();
/// let text = "Hello, world!";
/// let tokens = tokenizer.encode(text);
/// let decoded = tokenizer.decode(&tokens);
/// assert_eq!(text, decoded);
/// ```
pub struct TokenizerGateway {
    tokenizer: CoreBPE,
}

impl TokenizerGateway {
    /// Creates a new TokenizerGateway with the specified encoding.
    ///
    /// # Arguments
    ///
    /// * `encoding` - The encoding to use. Common options:
    ///   - "cl100k_base" - Used by GPT-4 and GPT-3.5-turbo (default)
    ///   - "p50k_base" - Used by older GPT-3 models
    ///   - "r50k_base" - Used by even older models
    ///
    /// # Errors
    ///
    /// Returns [`LangfusedError::TokenizerError`] if the encoding is not available.
    pub fn new(encoding: &str) -> Result<Self> {
        let tokenizer = match encoding {
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            "r50k_base" => tiktoken_rs::r50k_base(),
            _ => {
                return Err(LangfusedError::TokenizerError(format!(
                    "Unsupported encoding: {}",
                    encoding
                )))
            }
        }
        .map_err(|e| LangfusedError::TokenizerError(e.to_string()))?;

        Ok(Self { tokenizer })
    }

    /// Creates a gateway with the encoding tiktoken associates with a model.
    ///
    /// # Errors
    ///
    /// Returns [`LangfusedError::UnsupportedModel`] when tiktoken has no mapping
    /// for the model identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use langfused::tokens::TokenizerGateway;
    ///
    /// let tokenizer = TokenizerGateway::for_model("gpt-4").unwrap();
    /// assert!(tokenizer.count_tokens("Hello, world!") > 0);
    /// ```
    pub fn for_model(model: &str) -> Result<Self> {
        if tiktoken_rs::tokenizer::get_tokenizer(model).is_none() {
            return Err(LangfusedError::UnsupportedModel(model.to_string()));
        }

        let tokenizer = tiktoken_rs::get_bpe_from_model(model)
            .map_err(|e| LangfusedError::TokenizerError(e.to_string()))?;

        Ok(Self { tokenizer })
    }

    /// Encodes text into tokens.
    pub fn encode(&self, text: &str) -> Vec<usize> {
        tracing::debug!("Encoding {} bytes of text", text.len());
        self.tokenizer.encode_with_special_tokens(text)
    }

    /// Decodes tokens back into text.
    ///
    /// Invalid token sequences decode to an empty string and are logged.
    pub fn decode(&self, tokens: &[usize]) -> String {
        tracing::debug!("Decoding {} tokens", tokens.len());
        self.tokenizer.decode(tokens.to_vec()).unwrap_or_else(|e| {
            tracing::error!("Failed to decode tokens: {}", e);
            String::new()
        })
    }

    /// Counts the number of tokens in a text string.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.encode(text).len()
    }
}

impl Tokenizer for TokenizerGateway {
    fn encode(&self, text: &str) -> Vec<usize> {
        TokenizerGateway::encode(self, text)
    }
}

impl Default for TokenizerGateway {
    fn default() -> Self {
        // cl100k_base ships with tiktoken-rs and always loads
        Self::new("cl100k_base").expect("cl100k_base should always be available")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_empty() {
        let tokenizer = TokenizerGateway::default();
        assert_eq!(tokenizer.encode("").len(), 0);
    }

    #[test]
    fn test_encode_consistent() {
        let tokenizer = TokenizerGateway::default();
        let text = "The quick brown fox";

        assert_eq!(tokenizer.encode(text), tokenizer.encode(text));
    }

    #[test]
    fn test_round_trip() {
        let tokenizer = TokenizerGateway::default();
        let test_cases = vec![
            "Simple text",
            "Text with numbers: 123456",
            "Multi-line\ntext\nwith\nnewlines",
            "Unicode: 你好世界 🌍",
        ];

        for original in test_cases {
            let tokens = tokenizer.encode(original);
            assert_eq!(original, tokenizer.decode(&tokens), "Round-trip failed for: {}", original);
        }
    }

    #[test]
    fn test_count_tokens() {
        let tokenizer = TokenizerGateway::default();
        let count = tokenizer.count_tokens("What is the capital of France?");

        // Around 7 tokens with cl100k_base
        assert!(count > 5);
        assert!(count < 15);
    }

    #[test]
    fn test_unknown_encoding() {
        let result = TokenizerGateway::new("no_such_base");
        assert!(matches!(result, Err(LangfusedError::TokenizerError(_))));
    }

    #[test]
    fn test_for_model_gpt4() {
        let by_model = TokenizerGateway::for_model("gpt-4").unwrap();
        let by_encoding = TokenizerGateway::new("cl100k_base").unwrap();
        let text = "Coordinator hands the task to the coder.";

        assert_eq!(by_model.encode(text), by_encoding.encode(text));
    }

    #[test]
    fn test_for_model_unsupported() {
        let result = TokenizerGateway::for_model("llama3.2");
        match result {
            Err(LangfusedError::UnsupportedModel(model)) => assert_eq!(model, "llama3.2"),
            _ => panic!("Expected UnsupportedModel"),
        }
    }
}
