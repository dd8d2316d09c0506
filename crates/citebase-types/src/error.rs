use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// Errors returned by the submission gate.
///
/// `RateLimited` is the only failure in the default configuration. Running
/// over the context window is advisory unless the overflow policy is
/// `reject`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("rate limited: try again in {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("context window exceeded: exchange would use {projected} of {max} tokens")]
    ContextOverflow { projected: u64, max: u32 },
}

/// Errors from conversation lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("conversation {0} not found")]
    NotFound(Uuid),
}

/// Errors related to the model catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("unknown model '{0}'")]
    UnknownModel(String),
}

/// Errors from configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_display() {
        let err = SubmitError::RateLimited {
            retry_after: Duration::from_millis(42_300),
        };
        assert_eq!(err.to_string(), "rate limited: try again in 42s");
    }

    #[test]
    fn test_context_overflow_display() {
        let err = SubmitError::ContextOverflow {
            projected: 17_000,
            max: 16_385,
        };
        assert!(err.to_string().contains("17000"));
        assert!(err.to_string().contains("16385"));
    }

    #[test]
    fn test_conversation_error_display() {
        let id = Uuid::nil();
        assert_eq!(
            ConversationError::NotFound(id).to_string(),
            "conversation 00000000-0000-0000-0000-000000000000 not found"
        );
    }

    #[test]
    fn test_catalog_error_display() {
        let err = CatalogError::UnknownModel("GPT-9".to_string());
        assert_eq!(err.to_string(), "unknown model 'GPT-9'");
    }
}
