//! Model profile types.
//!
//! A `ModelProfile` describes one selectable model and the size of its
//! context window. The context window is the divisor for every usage ratio.

use serde::{Deserialize, Serialize};

/// A selectable model and its context window size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProfile {
    /// Unique model identifier (e.g., "GPT-4 Turbo").
    pub name: String,
    /// Maximum number of tokens the model can consider at once.
    pub max_context_tokens: u32,
    /// Short human-readable summary.
    #[serde(default)]
    pub description: String,
}

impl ModelProfile {
    pub fn new(name: impl Into<String>, max_context_tokens: u32) -> Self {
        Self {
            name: name.into(),
            max_context_tokens,
            description: String::new(),
        }
    }

    /// Attach a description (builder style).
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Context window size in thousands, rounded to the nearest whole number.
    ///
    /// Used for compact labels such as `GPT-4 (33K tokens)`.
    pub fn context_k(&self) -> u32 {
        (self.max_context_tokens + 500) / 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_k_rounds() {
        assert_eq!(ModelProfile::new("a", 16_385).context_k(), 16);
        assert_eq!(ModelProfile::new("b", 32_768).context_k(), 33);
        assert_eq!(ModelProfile::new("c", 200_000).context_k(), 200);
    }

    #[test]
    fn test_description_defaults_when_missing() {
        let json = r#"{"name":"GPT-4","max_context_tokens":32768}"#;
        let profile: ModelProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.name, "GPT-4");
        assert!(profile.description.is_empty());
    }
}
