//! Configuration types for Citebase.
//!
//! `CitebaseConfig` represents the top-level `config.toml` that controls the
//! rate window, context thresholds, the token cost model, and the model
//! catalog. Every field has a default so an empty file is valid.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::ModelProfile;

/// Top-level configuration.
///
/// Loaded from `~/.citebase/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitebaseConfig {
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub cost: CostConfig,

    /// Model selected when a session starts.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Model catalog override. Empty means the built-in catalog.
    #[serde(default)]
    pub models: Vec<ModelProfile>,
}

fn default_model() -> String {
    "GPT-3.5 Turbo".to_string()
}

impl Default for CitebaseConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            context: ContextConfig::default(),
            cost: CostConfig::default(),
            default_model: default_model(),
            models: Vec::new(),
        }
    }
}

impl CitebaseConfig {
    /// The configured catalog, or the built-in one when none is configured.
    pub fn catalog_profiles(&self) -> Vec<ModelProfile> {
        if self.models.is_empty() {
            builtin_models()
        } else {
            self.models.clone()
        }
    }

    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rate = &self.rate_limit;
        if rate.max_requests == 0 {
            return Err(ConfigError::Invalid("rate_limit.max_requests must be positive".into()));
        }
        if rate.window_secs == 0 {
            return Err(ConfigError::Invalid("rate_limit.window_secs must be positive".into()));
        }
        if !(rate.near_limit_ratio > 0.0 && rate.near_limit_ratio <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "rate_limit.near_limit_ratio must be in (0, 1], got {}",
                rate.near_limit_ratio
            )));
        }
        if rate.initial_requests > rate.max_requests {
            return Err(ConfigError::Invalid(format!(
                "rate_limit.initial_requests ({}) exceeds max_requests ({})",
                rate.initial_requests, rate.max_requests
            )));
        }

        let ctx = &self.context;
        for (field, value) in [
            ("warning_threshold_percent", ctx.warning_threshold_percent),
            ("exceeded_threshold_percent", ctx.exceeded_threshold_percent),
            ("preview_near_limit_percent", ctx.preview_near_limit_percent),
        ] {
            if value == 0 || value > 100 {
                return Err(ConfigError::Invalid(format!(
                    "context.{field} must be in (0, 100], got {value}"
                )));
            }
        }
        if ctx.warning_threshold_percent > ctx.exceeded_threshold_percent {
            return Err(ConfigError::Invalid(format!(
                "context.warning_threshold_percent ({}) exceeds exceeded_threshold_percent ({})",
                ctx.warning_threshold_percent, ctx.exceeded_threshold_percent
            )));
        }

        let cost = &self.cost;
        if cost.chars_per_token == 0 {
            return Err(ConfigError::Invalid("cost.chars_per_token must be positive".into()));
        }
        if cost
            .response_bands
            .windows(2)
            .any(|pair| pair[0].below >= pair[1].below)
        {
            return Err(ConfigError::Invalid(
                "cost.response_bands must be strictly ascending by `below`".into(),
            ));
        }

        let profiles = self.catalog_profiles();
        if let Some(bad) = profiles.iter().find(|m| m.max_context_tokens == 0) {
            return Err(ConfigError::Invalid(format!(
                "model '{}' has a zero context window",
                bad.name
            )));
        }
        if !profiles.iter().any(|m| m.name == self.default_model) {
            return Err(ConfigError::Invalid(format!(
                "default_model '{}' is not in the model catalog",
                self.default_model
            )));
        }

        Ok(())
    }
}

/// Request-rate window settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Length of one rate window in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Requests allowed per window.
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    /// Usage ratio at which the window reports `NearLimit`.
    #[serde(default = "default_near_limit_ratio")]
    pub near_limit_ratio: f64,
    /// Request count at which the rate indicator is surfaced.
    #[serde(default = "default_indicator_threshold")]
    pub indicator_threshold: u32,
    /// Requests already counted when the process starts.
    #[serde(default)]
    pub initial_requests: u32,
}

fn default_window_secs() -> u64 {
    60
}

fn default_max_requests() -> u32 {
    15
}

fn default_near_limit_ratio() -> f64 {
    0.80
}

fn default_indicator_threshold() -> u32 {
    11
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            max_requests: default_max_requests(),
            near_limit_ratio: default_near_limit_ratio(),
            indicator_threshold: default_indicator_threshold(),
            initial_requests: 0,
        }
    }
}

/// What the submission gate does when an exchange would overflow the
/// model's context window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Accept the exchange and report the overshoot through the status.
    #[default]
    Allow,
    /// Refuse the exchange before anything is counted.
    Reject,
}

/// Context window thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "default_warning_threshold_percent")]
    pub warning_threshold_percent: u8,
    #[serde(default = "default_exceeded_threshold_percent")]
    pub exceeded_threshold_percent: u8,
    /// Percentage above which a pre-send preview flags "approaching limit".
    #[serde(default = "default_preview_near_limit_percent")]
    pub preview_near_limit_percent: u8,
    #[serde(default)]
    pub overflow_policy: OverflowPolicy,
}

fn default_warning_threshold_percent() -> u8 {
    75
}

fn default_exceeded_threshold_percent() -> u8 {
    90
}

fn default_preview_near_limit_percent() -> u8 {
    85
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            warning_threshold_percent: default_warning_threshold_percent(),
            exceeded_threshold_percent: default_exceeded_threshold_percent(),
            preview_near_limit_percent: default_preview_near_limit_percent(),
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

/// One step of the expected-response step function: inputs with fewer than
/// `below` tokens expect a `tokens`-sized reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseBand {
    pub below: u64,
    pub tokens: u64,
}

/// Token cost model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostConfig {
    /// Characters per token for the length-based estimate.
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: u32,
    /// Simulated retrieval cost when the knowledge base is enabled.
    #[serde(default = "default_knowledge_base_tokens")]
    pub knowledge_base_tokens: u64,
    /// Fixed system-instruction overhead on every exchange.
    #[serde(default = "default_system_instruction_tokens")]
    pub system_instruction_tokens: u64,
    /// Ascending response-size bands.
    #[serde(default = "default_response_bands")]
    pub response_bands: Vec<ResponseBand>,
    /// Expected reply size for inputs past the last band.
    #[serde(default = "default_max_response_tokens")]
    pub max_response_tokens: u64,
}

fn default_chars_per_token() -> u32 {
    4
}

fn default_knowledge_base_tokens() -> u64 {
    850
}

fn default_system_instruction_tokens() -> u64 {
    180
}

fn default_response_bands() -> Vec<ResponseBand> {
    vec![
        ResponseBand { below: 20, tokens: 100 },
        ResponseBand { below: 50, tokens: 250 },
        ResponseBand { below: 100, tokens: 400 },
    ]
}

fn default_max_response_tokens() -> u64 {
    600
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            chars_per_token: default_chars_per_token(),
            knowledge_base_tokens: default_knowledge_base_tokens(),
            system_instruction_tokens: default_system_instruction_tokens(),
            response_bands: default_response_bands(),
            max_response_tokens: default_max_response_tokens(),
        }
    }
}

/// The built-in model catalog, in display order.
pub fn builtin_models() -> Vec<ModelProfile> {
    vec![
        ModelProfile::new("GPT-3.5 Turbo", 16_385)
            .with_description("Fast and efficient for most tasks"),
        ModelProfile::new("GPT-4", 32_768)
            .with_description("More capable reasoning, longer context"),
        ModelProfile::new("GPT-4 Turbo", 128_000)
            .with_description("Newest model with extended context window"),
        ModelProfile::new("Claude-3 Sonnet", 200_000)
            .with_description("High-performance model with very large context"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = CitebaseConfig::default();
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.rate_limit.max_requests, 15);
        assert!((config.rate_limit.near_limit_ratio - 0.80).abs() < f64::EPSILON);
        assert_eq!(config.rate_limit.indicator_threshold, 11);
        assert_eq!(config.context.warning_threshold_percent, 75);
        assert_eq!(config.context.exceeded_threshold_percent, 90);
        assert_eq!(config.context.overflow_policy, OverflowPolicy::Allow);
        assert_eq!(config.cost.knowledge_base_tokens, 850);
        assert_eq!(config.cost.system_instruction_tokens, 180);
        assert_eq!(config.cost.chars_per_token, 4);
        assert_eq!(config.cost.response_bands.len(), 3);
        assert_eq!(config.cost.max_response_tokens, 600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: CitebaseConfig = toml::from_str("").unwrap();
        assert_eq!(config.default_model, "GPT-3.5 Turbo");
        assert_eq!(config.catalog_profiles().len(), 4);
        assert_eq!(config.rate_limit.max_requests, 15);
    }

    #[test]
    fn test_deserialize_with_values() {
        let toml_str = r#"
default_model = "Local 8K"

[rate_limit]
max_requests = 5
window_secs = 30

[context]
overflow_policy = "reject"

[cost]
knowledge_base_tokens = 400

[[models]]
name = "Local 8K"
max_context_tokens = 8192

[[models]]
name = "Local 32K"
max_context_tokens = 32768
description = "Bigger"
"#;
        let config: CitebaseConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_secs, 30);
        assert_eq!(config.rate_limit.indicator_threshold, 11);
        assert_eq!(config.context.overflow_policy, OverflowPolicy::Reject);
        assert_eq!(config.cost.knowledge_base_tokens, 400);
        assert_eq!(config.cost.system_instruction_tokens, 180);
        let profiles = config.catalog_profiles();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[1].description, "Bigger");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = CitebaseConfig::default();
        config.rate_limit.max_requests = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let mut config = CitebaseConfig::default();
        config.context.warning_threshold_percent = 95;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("warning_threshold_percent"));
    }

    #[test]
    fn test_validate_rejects_unsorted_bands() {
        let mut config = CitebaseConfig::default();
        config.cost.response_bands = vec![
            ResponseBand { below: 50, tokens: 250 },
            ResponseBand { below: 20, tokens: 100 },
        ];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_default_model() {
        let config = CitebaseConfig {
            default_model: "GPT-9".to_string(),
            ..CitebaseConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("GPT-9"));
    }

    #[test]
    fn test_validate_rejects_bad_ratio() {
        let mut config = CitebaseConfig::default();
        config.rate_limit.near_limit_ratio = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serde_roundtrip_preserves_policy() {
        let mut config = CitebaseConfig::default();
        config.context.overflow_policy = OverflowPolicy::Reject;
        let json = serde_json::to_string(&config).unwrap();
        let parsed: CitebaseConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.context.overflow_policy, OverflowPolicy::Reject);
    }
}
