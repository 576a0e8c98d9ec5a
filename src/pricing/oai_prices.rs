//! OpenAI list prices in USD per million tokens.
//!
//! Mirrors the upstream price sheet at the time of writing. Entries go stale as
//! OpenAI changes its pricing; update them here rather than patching callers.

/// `(model, input per million, output per million)`
pub(crate) const OAI_PRICES: &[(&str, f64, f64)] = &[
    // GPT-3.5 series
    ("gpt-3.5-turbo", 3.00, 6.00),
    ("gpt-3.5-turbo-0125", 0.50, 1.50),
    ("gpt-3.5-turbo-instruct", 1.50, 2.00),
    ("gpt-3.5-turbo-1106", 1.00, 2.00),
    ("gpt-3.5-turbo-0613", 1.50, 2.00),
    ("gpt-3.5-turbo-16k-0613", 3.00, 4.00),
    // GPT-4 series
    ("gpt-4", 30.00, 60.00),
    ("gpt-4-32k", 60.00, 120.00),
    ("gpt-4-turbo", 10.00, 30.00),
    ("gpt-4-turbo-2024-04-09", 10.00, 30.00),
    ("gpt-4-0125-preview", 10.00, 30.00),
    ("gpt-4-1106-preview", 10.00, 30.00),
    ("gpt-4-vision-preview", 10.00, 30.00),
    ("gpt-4o-mini", 0.15, 0.60),
    ("gpt-4o-mini-2024-07-18", 0.15, 0.60),
    // Reasoning models
    ("o1-mini", 3.00, 12.00),
    ("o1-mini-2024-09-12", 3.00, 12.00),
    ("o1-preview", 15.00, 60.00),
    ("o1-preview-2024-09-12", 15.00, 60.00),
    // Legacy completions and embeddings
    ("davinci-002", 12.00, 6.00),
    ("text-embedding-3-large", 0.13, 0.26),
    ("text-embedding-3-small", 0.02, 0.04),
    ("ada v2", 0.10, 0.20),
];
