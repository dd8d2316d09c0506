//! Context budget tracking for a single conversation.
//!
//! Compares a conversation's cumulative token count against the active
//! model's context window. Overshoot is representable and reported through
//! [`ContextStatus::Exceeded`]; nothing here rejects or clamps an update.

use citebase_types::budget::{ContextStatus, ConversationBudget};
use citebase_types::model::ModelProfile;

/// Fraction of the context window in use. May exceed `1.0`.
pub fn usage_ratio(budget: &ConversationBudget) -> f64 {
    if budget.model_max_tokens == 0 {
        return f64::INFINITY;
    }
    budget.current_tokens as f64 / budget.model_max_tokens as f64
}

/// Usage as a percentage (0.0 to 100.0+).
pub fn usage_percent(budget: &ConversationBudget) -> f64 {
    usage_ratio(budget) * 100.0
}

/// Three-tier status of a budget.
///
/// `Exceeded` at or above the exceeded threshold, `Warning` at or above the
/// warning threshold, `Normal` otherwise. Thresholds are compared in integer
/// arithmetic so the tiers are exact at their boundaries and monotonic in
/// `current_tokens`.
pub fn status(budget: &ConversationBudget) -> ContextStatus {
    let used = u128::from(budget.current_tokens) * 100;
    let max = u128::from(budget.model_max_tokens);

    if used >= u128::from(budget.exceeded_threshold_percent) * max {
        ContextStatus::Exceeded
    } else if used >= u128::from(budget.warning_threshold_percent) * max {
        ContextStatus::Warning
    } else {
        ContextStatus::Normal
    }
}

/// Add `token_cost` to the budget. Never fails and never clamps.
pub fn apply_cost(budget: &ConversationBudget, token_cost: u64) -> ConversationBudget {
    ConversationBudget {
        current_tokens: budget.current_tokens.saturating_add(token_cost),
        ..*budget
    }
}

/// Tokens left in the window (negative once the window is overrun).
pub fn remaining(budget: &ConversationBudget) -> i64 {
    i64::from(budget.model_max_tokens) - budget.current_tokens.min(i64::MAX as u64) as i64
}

/// Models with a strictly larger context window than `current`.
///
/// Keeps catalog order; callers display at most the first two.
pub fn higher_capacity_models<'a>(
    all_models: &'a [ModelProfile],
    current: &ModelProfile,
) -> Vec<&'a ModelProfile> {
    all_models
        .iter()
        .filter(|m| m.max_context_tokens > current.max_context_tokens)
        .collect()
}
