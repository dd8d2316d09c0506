//! Budget state types: per-conversation context usage and the shared
//! request-rate window.
//!
//! These are plain data. The accounting rules that move them between states
//! live in `citebase-core::budget`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Running context usage of a single conversation.
///
/// `current_tokens` only ever grows while the conversation lives. Starting a
/// new conversation creates a new budget instead of decrementing this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationBudget {
    /// Cumulative tokens consumed so far. May exceed `model_max_tokens`.
    pub current_tokens: u64,
    /// Context window of the active model.
    pub model_max_tokens: u32,
    /// Usage percentage at which the conversation is "approaching" its limit.
    pub warning_threshold_percent: u8,
    /// Usage percentage at which the conversation counts as over its limit.
    pub exceeded_threshold_percent: u8,
}

impl ConversationBudget {
    /// Create an empty budget for a model with the given context window.
    pub fn new(model_max_tokens: u32) -> Self {
        Self {
            current_tokens: 0,
            model_max_tokens,
            warning_threshold_percent: 75,
            exceeded_threshold_percent: 90,
        }
    }

    /// Override the warning and exceeded thresholds (builder style).
    pub fn with_thresholds(mut self, warning_percent: u8, exceeded_percent: u8) -> Self {
        self.warning_threshold_percent = warning_percent;
        self.exceeded_threshold_percent = exceeded_percent;
        self
    }

    /// Start from an existing token count (builder style).
    pub fn with_tokens(mut self, current_tokens: u64) -> Self {
        self.current_tokens = current_tokens;
        self
    }
}

/// Three-tier context usage status, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextStatus {
    Normal,
    Warning,
    Exceeded,
}

impl fmt::Display for ContextStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextStatus::Normal => write!(f, "normal"),
            ContextStatus::Warning => write!(f, "warning"),
            ContextStatus::Exceeded => write!(f, "exceeded"),
        }
    }
}

impl FromStr for ContextStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(ContextStatus::Normal),
            "warning" => Ok(ContextStatus::Warning),
            "exceeded" => Ok(ContextStatus::Exceeded),
            other => Err(format!("invalid context status: '{other}'")),
        }
    }
}

/// Process-wide request counter for the current rate window.
///
/// Invariant: `is_blocked` implies `current_requests >= max_requests`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBudget {
    /// Requests accepted in the current window, in `[0, max_requests]`.
    pub current_requests: u32,
    /// Capacity of one window.
    pub max_requests: u32,
    /// When the current window closes.
    pub reset_time: DateTime<Utc>,
    /// Set once the window is at capacity.
    pub is_blocked: bool,
}

impl RateBudget {
    /// A fresh, unblocked window closing at `reset_time`.
    pub fn new(max_requests: u32, reset_time: DateTime<Utc>) -> Self {
        Self {
            current_requests: 0,
            max_requests,
            reset_time,
            is_blocked: false,
        }
    }

    /// Requests left before the window blocks.
    pub fn remaining(&self) -> u32 {
        self.max_requests.saturating_sub(self.current_requests)
    }

    /// Whether the window has no capacity left, regardless of the flag.
    pub fn is_at_capacity(&self) -> bool {
        self.current_requests >= self.max_requests
    }
}

/// Rate window state as seen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateStatus {
    Available,
    NearLimit,
    Blocked,
}

impl fmt::Display for RateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateStatus::Available => write!(f, "available"),
            RateStatus::NearLimit => write!(f, "near_limit"),
            RateStatus::Blocked => write!(f, "blocked"),
        }
    }
}

/// Estimated token cost of one exchange, split by source.
///
/// Derived on demand and never stored. `conversation_history` is a read of the
/// conversation's usage before the exchange; it is part of `total` for display
/// but is not added to the budget a second time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCostBreakdown {
    pub user_input: u64,
    pub expected_response: u64,
    pub knowledge_base: u64,
    pub system_instructions: u64,
    pub conversation_history: u64,
    pub total: u64,
}

impl TokenCostBreakdown {
    /// Tokens this exchange adds on top of the existing history.
    pub fn new_tokens(&self) -> u64 {
        self.user_input + self.expected_response + self.knowledge_base + self.system_instructions
    }
}
