//! Configuration loading, validation, and management for inkflow.
//!
//! Loads configuration from a TOML file with environment variable
//! overrides. Validates all settings at startup. Public-pool API keys are
//! redacted from `Debug` output.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Streaming resilience knobs.
    #[serde(default)]
    pub streaming: StreamingConfig,

    /// Non-streaming retry policy.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Billing estimation knobs.
    #[serde(default)]
    pub billing: BillingConfig,

    /// Default sampling parameters.
    #[serde(default)]
    pub defaults: SamplingDefaults,

    /// Public model pool entries, keyed by config id.
    #[serde(default)]
    pub public_models: HashMap<String, PublicModelEntry>,
}

/// Streaming resilience configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Watchdog tick interval in milliseconds.
    #[serde(default = "default_watchdog_interval_ms")]
    pub watchdog_interval_ms: u64,

    /// How long the stream may stay silent before the consumer side is
    /// terminated (content chunks only; heartbeats do not count).
    #[serde(default = "default_silence_timeout_secs")]
    pub silence_timeout_secs: u64,

    /// Startup grace period before silence detection engages. Connection
    /// establishment can itself be silent.
    #[serde(default = "default_grace_period_secs")]
    pub grace_period_secs: u64,

    /// Hard overall timeout for one stream.
    #[serde(default = "default_hard_timeout_secs")]
    pub hard_timeout_secs: u64,

    /// Capacity of the generation → delivery channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_watchdog_interval_ms() -> u64 {
    1_000
}
fn default_silence_timeout_secs() -> u64 {
    30
}
fn default_grace_period_secs() -> u64 {
    10
}
fn default_hard_timeout_secs() -> u64 {
    600
}
fn default_channel_capacity() -> usize {
    256
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            watchdog_interval_ms: default_watchdog_interval_ms(),
            silence_timeout_secs: default_silence_timeout_secs(),
            grace_period_secs: default_grace_period_secs(),
            hard_timeout_secs: default_hard_timeout_secs(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Bounded retry policy for non-streaming provider calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first (1 = no retry).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    500
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// Billing estimation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Chars per token for CJK-dominant text.
    #[serde(default = "default_cjk_chars_per_token")]
    pub cjk_chars_per_token: f64,

    /// Chars per token otherwise.
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: f64,

    /// Per-feature output multiplier overrides, keyed by feature name.
    /// Unlisted features use the built-in table.
    #[serde(default)]
    pub output_multipliers: HashMap<String, f64>,
}

fn default_cjk_chars_per_token() -> f64 {
    1.5
}
fn default_chars_per_token() -> f64 {
    4.0
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            cjk_chars_per_token: default_cjk_chars_per_token(),
            chars_per_token: default_chars_per_token(),
            output_multipliers: HashMap::new(),
        }
    }
}

/// Default sampling parameters applied when a request leaves them unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingDefaults {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}

impl Default for SamplingDefaults {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// One shared, platform-funded model credential pool.
#[derive(Clone, Serialize, Deserialize)]
pub struct PublicModelEntry {
    /// Provider name (e.g., "anthropic").
    pub provider: String,

    /// Model id for the call.
    pub model_id: String,

    /// Key pool; one key is picked uniformly at random per call.
    #[serde(default)]
    pub api_keys: Vec<String>,

    /// Features this pool may serve.
    #[serde(default)]
    pub enabled_features: Vec<String>,

    /// Overall kill switch.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl std::fmt::Debug for PublicModelEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicModelEntry")
            .field("provider", &self.provider)
            .field("model_id", &self.model_id)
            .field("api_keys", &format!("[{} redacted]", self.api_keys.len()))
            .field("enabled_features", &self.enabled_features)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("streaming", &self.streaming)
            .field("retry", &self.retry)
            .field("billing", &self.billing)
            .field("defaults", &self.defaults)
            .field("public_models", &self.public_models)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, then apply env overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: AppConfig = toml::from_str(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from a file if it exists, otherwise defaults + env overrides.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            tracing::debug!("No config file found, using defaults");
            let mut config = AppConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
    }

    /// Environment variable overrides for the streaming knobs.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("INKFLOW_SILENCE_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse() {
                self.streaming.silence_timeout_secs = secs;
            }
        }
        if let Ok(v) = std::env::var("INKFLOW_HARD_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse() {
                self.streaming.hard_timeout_secs = secs;
            }
        }
        if let Ok(v) = std::env::var("INKFLOW_RETRY_MAX_ATTEMPTS") {
            if let Ok(attempts) = v.parse() {
                self.retry.max_attempts = attempts;
            }
        }
    }

    /// Validate all settings. Called at startup; a bad config never makes
    /// it into a running pipeline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.streaming.silence_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "streaming.silence_timeout_secs must be > 0".into(),
            ));
        }
        if self.streaming.hard_timeout_secs <= self.streaming.grace_period_secs {
            return Err(ConfigError::Invalid(
                "streaming.hard_timeout_secs must exceed the grace period".into(),
            ));
        }
        if self.streaming.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "streaming.channel_capacity must be > 0".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be >= 1".into(),
            ));
        }
        if self.billing.chars_per_token <= 0.0 || self.billing.cjk_chars_per_token <= 0.0 {
            return Err(ConfigError::Invalid(
                "billing chars-per-token ratios must be positive".into(),
            ));
        }
        for (factor_name, factor) in &self.billing.output_multipliers {
            if *factor <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "billing.output_multipliers.{factor_name} must be positive"
                )));
            }
        }
        for (id, entry) in &self.public_models {
            if entry.provider.is_empty() || entry.model_id.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "public model '{id}' needs a provider and model_id"
                )));
            }
        }
        Ok(())
    }
}
