//! Event types for the Citebase budget event bus.
//!
//! `BudgetEvent` is broadcast whenever the rate window or a conversation's
//! context budget changes state. All variants are Clone + Send + Sync for use
//! with tokio broadcast channels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::budget::ContextStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BudgetEvent {
    /// A submission passed the rate gate and was counted.
    RequestAccepted { current: u32, max: u32 },

    /// A submission was refused because the window is at capacity.
    RateLimited {
        current: u32,
        max: u32,
        retry_after_ms: u64,
    },

    /// A submission was refused because the exchange would overflow the
    /// model's context window (only under the `reject` overflow policy).
    ContextOverflowRejected {
        /// `None` when the send would have started a new conversation.
        conversation_id: Option<Uuid>,
        projected: u64,
        max: u32,
    },

    /// The rate window rolled over.
    RateWindowReset { reset_at: DateTime<Utc> },

    /// A conversation's context status moved to a different tier.
    ContextStatusChanged {
        conversation_id: Uuid,
        from: ContextStatus,
        to: ContextStatus,
        ratio: f64,
    },

    /// The active model changed.
    ModelSwitched { from: String, to: String },

    /// A new conversation became active.
    ConversationStarted { conversation_id: Uuid },
}
