//! Derived views over budget state.
//!
//! Presentation policy lives here rather than in the trackers: whether the
//! rate indicator is shown, what a pre-send preview warns about, and which
//! upgrade targets are suggested. Every function is pure.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use citebase_types::budget::{
    ContextStatus, ConversationBudget, RateStatus, TokenCostBreakdown,
};
use citebase_types::model::ModelProfile;

use crate::budget::context::{status, usage_percent};
use crate::budget::rate::RateLimiter;
use crate::catalog::ModelCatalog;

/// Upgrade suggestions shown alongside a context warning.
pub const MAX_SUGGESTIONS: usize = 2;

/// Pre-send estimate of what the draft will cost.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsagePreview {
    pub breakdown: TokenCostBreakdown,
    pub max_tokens: u32,
    /// `max_tokens - total`; negative when the exchange would overflow.
    pub remaining: i64,
    pub usage_percent: f64,
    pub near_limit: bool,
    pub will_exceed: bool,
}

/// Whether a preview is worth showing for this draft.
///
/// An empty draft with the knowledge base off has nothing to estimate.
pub fn preview_visible(input: &str, knowledge_base_enabled: bool) -> bool {
    !input.is_empty() || knowledge_base_enabled
}

pub fn usage_preview(
    breakdown: TokenCostBreakdown,
    max_tokens: u32,
    near_limit_percent: u8,
) -> UsagePreview {
    let usage_percent = if max_tokens == 0 {
        f64::INFINITY
    } else {
        breakdown.total as f64 / max_tokens as f64 * 100.0
    };
    let will_exceed = breakdown.total > u64::from(max_tokens);
    UsagePreview {
        breakdown,
        max_tokens,
        remaining: i64::from(max_tokens) - breakdown.total.min(i64::MAX as u64) as i64,
        usage_percent,
        near_limit: usage_percent > f64::from(near_limit_percent),
        will_exceed,
    }
}

/// Snapshot of the rate window for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateIndicator {
    pub status: RateStatus,
    pub current: u32,
    pub max: u32,
    pub remaining: u32,
    pub usage_percent: f64,
    pub reset_in_ms: u64,
    pub countdown: String,
    pub visible: bool,
}

/// Build the rate indicator.
///
/// The indicator is visible once the request count reaches
/// `indicator_threshold`, or whenever the window is not `Available`.
pub fn rate_indicator(
    limiter: &RateLimiter,
    now: DateTime<Utc>,
    indicator_threshold: u32,
) -> RateIndicator {
    let budget = limiter.budget();
    let status = limiter.status();
    let reset_in = limiter.time_until_reset(now);
    RateIndicator {
        status,
        current: budget.current_requests,
        max: budget.max_requests,
        remaining: budget.remaining(),
        usage_percent: limiter.usage_ratio() * 100.0,
        reset_in_ms: reset_in.as_millis() as u64,
        countdown: format_countdown(reset_in),
        visible: budget.current_requests >= indicator_threshold || status != RateStatus::Available,
    }
}

/// Format a countdown: `m:ss` from one minute up, `Ns` below.
///
/// Partial seconds round up so the countdown only reads `0s` at the deadline.
pub fn format_countdown(remaining: Duration) -> String {
    let seconds = remaining.as_millis().div_ceil(1000) as u64;
    if seconds >= 60 {
        format!("{}:{:02}", seconds / 60, seconds % 60)
    } else {
        format!("{seconds}s")
    }
}

/// Advisory shown when a conversation approaches or passes its window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextWarning {
    pub status: ContextStatus,
    pub model_name: String,
    pub current_tokens: u64,
    pub max_tokens: u32,
    pub usage_percent: f64,
    pub suggestions: Vec<ModelProfile>,
}

/// Build the context warning, or `None` while usage is normal.
pub fn context_warning(
    budget: &ConversationBudget,
    model: &ModelProfile,
    catalog: &ModelCatalog,
) -> Option<ContextWarning> {
    let status = status(budget);
    if status == ContextStatus::Normal {
        return None;
    }
    Some(ContextWarning {
        status,
        model_name: model.name.clone(),
        current_tokens: budget.current_tokens,
        max_tokens: budget.model_max_tokens,
        usage_percent: usage_percent(budget),
        suggestions: catalog
            .higher_capacity(model)
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .cloned()
            .collect(),
    })
}
