//! Explicit sink configuration.

use crate::error::{LangfusedError, Result};
use std::fmt;

pub const DEFAULT_HOST: &str = "https://cloud.langfuse.com";

pub const ENV_SECRET_KEY: &str = "LANGFUSE_SECRET_KEY";
pub const ENV_PUBLIC_KEY: &str = "LANGFUSE_PUBLIC_KEY";
pub const ENV_HOST: &str = "LANGFUSE_HOST";
pub const ENV_SAMPLE_RATE: &str = "LANGFUSE_SAMPLE_RATE";
pub const ENV_DEBUG: &str = "LANGFUSE_DEBUG";

/// Credentials and behaviour flags handed to a sink constructor.
///
/// `Default` gives empty credentials, [`DEFAULT_HOST`], a sample rate of 1.0
/// and debug off. [`SinkConfig::from_env`] starts from those defaults and
/// overrides each value whose environment variable is set.
#[derive(Clone, PartialEq)]
pub struct SinkConfig {
    pub secret_key: String,
    pub public_key: String,
    pub host: String,
    /// Fraction of traces kept, in `[0, 1]`
    pub sample_rate: f64,
    pub debug: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            public_key: String::new(),
            host: DEFAULT_HOST.to_string(),
            sample_rate: 1.0,
            debug: false,
        }
    }
}

impl SinkConfig {
    /// Load from the process environment, reading a `.env` file first if present.
    ///
    /// # Errors
    ///
    /// Returns [`LangfusedError::ConfigError`] when a sample rate or debug flag
    /// cannot be parsed.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secret_key) = lookup(ENV_SECRET_KEY) {
            config.secret_key = secret_key;
        }
        if let Some(public_key) = lookup(ENV_PUBLIC_KEY) {
            config.public_key = public_key;
        }
        if let Some(host) = lookup(ENV_HOST) {
            config.host = host;
        }
        if let Some(rate) = lookup(ENV_SAMPLE_RATE) {
            config.sample_rate = rate.trim().parse::<f64>().map_err(|_| {
                LangfusedError::ConfigError(format!("{} is not a number: {}", ENV_SAMPLE_RATE, rate))
            })?;
        }
        if let Some(debug) = lookup(ENV_DEBUG) {
            config.debug = parse_flag(&debug).ok_or_else(|| {
                LangfusedError::ConfigError(format!("{} is not a boolean: {}", ENV_DEBUG, debug))
            })?;
        }

        Ok(config)
    }

    pub fn with_credentials(
        mut self,
        public_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.public_key = public_key.into();
        self.secret_key = secret_key.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Check that the config can authenticate against a backend.
    pub fn validate(&self) -> Result<()> {
        if self.public_key.trim().is_empty() {
            return Err(LangfusedError::ConfigError("public key is empty".to_string()));
        }
        if self.secret_key.trim().is_empty() {
            return Err(LangfusedError::ConfigError("secret key is empty".to_string()));
        }
        if !(self.host.starts_with("http://") || self.host.starts_with("https://")) {
            return Err(LangfusedError::ConfigError(format!(
                "host must be an http(s) URL: {}",
                self.host
            )));
        }
        if !(0.0..=1.0).contains(&self.sample_rate) {
            return Err(LangfusedError::ConfigError(format!(
                "sample rate must be within [0, 1]: {}",
                self.sample_rate
            )));
        }
        Ok(())
    }

    /// Decide whether the next trace is kept.
    pub fn sampled(&self) -> bool {
        if self.sample_rate >= 1.0 {
            true
        } else if self.sample_rate <= 0.0 {
            false
        } else {
            rand::random::<f64>() < self.sample_rate
        }
    }
}

impl fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkConfig")
            .field("secret_key", &"<redacted>")
            .field("public_key", &self.public_key)
            .field("host", &self.host)
            .field("sample_rate", &self.sample_rate)
            .field("debug", &self.debug)
            .finish()
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SinkConfig::default();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.sample_rate, 1.0);
        assert!(!config.debug);
        assert!(config.public_key.is_empty());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = SinkConfig::from_lookup(lookup_from(&[
            (ENV_SECRET_KEY, "sk-lf-secret"),
            (ENV_PUBLIC_KEY, "pk-lf-public"),
            (ENV_HOST, "http://localhost:3000"),
            (ENV_SAMPLE_RATE, "0.25"),
            (ENV_DEBUG, "False"),
        ]))
        .unwrap();

        assert_eq!(config.secret_key, "sk-lf-secret");
        assert_eq!(config.public_key, "pk-lf-public");
        assert_eq!(config.host, "http://localhost:3000");
        assert_eq!(config.sample_rate, 0.25);
        assert!(!config.debug);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_missing_keeps_defaults() {
        let config = SinkConfig::from_lookup(lookup_from(&[(ENV_DEBUG, "True")])).unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
        assert!(config.debug);
    }

    #[test]
    fn test_from_lookup_bad_sample_rate() {
        let result = SinkConfig::from_lookup(lookup_from(&[(ENV_SAMPLE_RATE, "most")]));
        assert!(matches!(result, Err(LangfusedError::ConfigError(_))));
    }

    #[test]
    fn test_from_lookup_bad_debug_flag() {
        let result = SinkConfig::from_lookup(lookup_from(&[(ENV_DEBUG, "maybe")]));
        assert!(matches!(result, Err(LangfusedError::ConfigError(_))));
    }

    #[test]
    fn test_validate() {
        let valid = SinkConfig::default().with_credentials("pk", "sk");
        assert!(valid.validate().is_ok());

        assert!(SinkConfig::default().validate().is_err());
        assert!(valid.clone().with_host("ftp://example.com").validate().is_err());
        assert!(valid.clone().with_sample_rate(1.5).validate().is_err());
    }

    #[test]
    fn test_sampling_bounds() {
        let config = SinkConfig::default();
        assert!((0..100).all(|_| config.clone().with_sample_rate(1.0).sampled()));
        assert!((0..100).all(|_| !config.clone().with_sample_rate(0.0).sampled()));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = SinkConfig::default().with_credentials("pk-visible", "sk-hidden");
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("pk-visible"));
        assert!(!rendered.contains("sk-hidden"));
    }
}
