//! Submission gate: the single point that can refuse a user's send.
//!
//! A send is checked against the shared rate window first. Once it passes,
//! the exchange is costed, the reply is generated, both messages are
//! appended, and the cost is applied to the conversation's budget. Nothing
//! after the gate can fail.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use citebase_types::budget::{ContextStatus, ConversationBudget, TokenCostBreakdown};
use citebase_types::chat::{Conversation, Message};
use citebase_types::config::{CitebaseConfig, OverflowPolicy};
use citebase_types::error::SubmitError;
use citebase_types::model::ModelProfile;

use crate::budget::context::{apply_cost, status};
use crate::budget::cost::CostModel;
use crate::budget::rate::RateLimiter;
use crate::responder::ResponseGenerator;

/// The user's pending message.
#[derive(Debug, Clone, Copy)]
pub struct Draft<'a> {
    pub text: &'a str,
    pub knowledge_base_enabled: bool,
}

impl<'a> Draft<'a> {
    pub fn new(text: &'a str, knowledge_base_enabled: bool) -> Self {
        Self {
            text,
            knowledge_base_enabled,
        }
    }
}

/// Outcome of an accepted submission.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Cost of the exchange; `conversation_history` is the pre-send usage.
    pub breakdown: TokenCostBreakdown,
    /// The conversation's budget after the cost was applied.
    pub budget: ConversationBudget,
    pub previous_status: ContextStatus,
    pub status: ContextStatus,
    /// Whether the request count has reached the indicator threshold.
    pub show_rate_indicator: bool,
    /// The generated assistant message (also appended to the conversation).
    pub reply: Message,
}

impl Submission {
    pub fn status_changed(&self) -> bool {
        self.previous_status != self.status
    }
}

#[derive(Debug, Clone)]
pub struct SubmissionGate {
    cost: CostModel,
    overflow_policy: OverflowPolicy,
    indicator_threshold: u32,
}

impl SubmissionGate {
    pub fn new(cost: CostModel, overflow_policy: OverflowPolicy, indicator_threshold: u32) -> Self {
        Self {
            cost,
            overflow_policy,
            indicator_threshold,
        }
    }

    pub fn from_config(config: &CitebaseConfig) -> Self {
        Self::new(
            CostModel::new(&config.cost),
            config.context.overflow_policy,
            config.rate_limit.indicator_threshold,
        )
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost
    }

    /// Submit a draft to a conversation.
    ///
    /// Fails with [`SubmitError::RateLimited`] when the window is blocked or
    /// at capacity; the window is then marked blocked and neither the counter
    /// nor the conversation changes. Under [`OverflowPolicy::Reject`] an
    /// exchange whose projected total exceeds the model's window fails with
    /// [`SubmitError::ContextOverflow`] before anything is counted.
    pub fn submit(
        &self,
        conversation: &mut Conversation,
        draft: Draft<'_>,
        rate: &mut RateLimiter,
        model: &ModelProfile,
        responder: &dyn ResponseGenerator,
        now: DateTime<Utc>,
    ) -> Result<Submission, SubmitError> {
        let window = rate.budget();
        if window.is_blocked || window.is_at_capacity() {
            rate.force_block();
            let retry_after = rate.time_until_reset(now);
            warn!(
                conversation_id = %conversation.id,
                current = rate.budget().current_requests,
                max = rate.budget().max_requests,
                retry_after_ms = retry_after.as_millis() as u64,
                "Submission rejected: rate limited"
            );
            return Err(SubmitError::RateLimited { retry_after });
        }

        let breakdown = self.cost.breakdown(
            draft.text,
            draft.knowledge_base_enabled,
            conversation.budget.current_tokens,
        );

        if self.overflow_policy == OverflowPolicy::Reject
            && breakdown.total > u64::from(model.max_context_tokens)
        {
            warn!(
                conversation_id = %conversation.id,
                model = %model.name,
                projected = breakdown.total,
                max = model.max_context_tokens,
                "Submission rejected: context window would overflow"
            );
            return Err(SubmitError::ContextOverflow {
                projected: breakdown.total,
                max: model.max_context_tokens,
            });
        }

        rate.record_request();
        let show_rate_indicator = rate.budget().current_requests >= self.indicator_threshold;

        conversation.budget.model_max_tokens = model.max_context_tokens;
        let previous_status = status(&conversation.budget);

        let generated = responder.generate(draft.text, draft.knowledge_base_enabled);
        let reply =
            Message::assistant(generated.content, generated.citations, now).with_resources(generated.resources);
        conversation.push_message(Message::user(draft.text, now));
        conversation.push_message(reply.clone());

        conversation.budget = apply_cost(&conversation.budget, breakdown.new_tokens());
        let new_status = status(&conversation.budget);

        debug!(
            conversation_id = %conversation.id,
            model = %model.name,
            added = breakdown.new_tokens(),
            current_tokens = conversation.budget.current_tokens,
            requests = rate.budget().current_requests,
            status = %new_status,
            "Submission accepted"
        );
        if new_status == ContextStatus::Exceeded && previous_status != ContextStatus::Exceeded {
            warn!(
                conversation_id = %conversation.id,
                current_tokens = conversation.budget.current_tokens,
                max = model.max_context_tokens,
                "Conversation exceeded its context threshold"
            );
        }

        Ok(Submission {
            breakdown,
            budget: conversation.budget,
            previous_status,
            status: new_status,
            show_rate_indicator,
            reply,
        })
    }
}

impl Default for SubmissionGate {
    fn default() -> Self {
        Self::from_config(&CitebaseConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeDelta;

    use super::*;
    use crate::responder::CannedResponder;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_767_225_600, 0).unwrap()
    }

    fn gpt35() -> ModelProfile {
        ModelProfile::new("GPT-3.5 Turbo", 16_385)
    }

    fn conversation() -> Conversation {
        Conversation::new(ConversationBudget::new(16_385), now())
    }

    fn limiter() -> RateLimiter {
        RateLimiter::new(15, Duration::from_secs(60), 0.80, now())
    }

    #[test]
    fn test_eighty_chars_with_knowledge_base_adds_1300() {
        let gate = SubmissionGate::default();
        let mut conv = conversation();
        let mut rate = limiter();
        let text = "x".repeat(80);

        let submission = gate
            .submit(&mut conv, Draft::new(&text, true), &mut rate, &gpt35(), &CannedResponder, now())
            .unwrap();

        assert_eq!(submission.breakdown.total, 1_300);
        assert_eq!(submission.budget.current_tokens, 1_300);
        assert_eq!(conv.budget.current_tokens, 1_300);
        assert_eq!(conv.messages.len(), 2);
        assert!(conv.messages[0].is_user);
        assert!(!conv.messages[1].is_user);
        assert_eq!(conv.messages[1].citations.len(), 1);
        assert_eq!(conv.messages[1].resources.len(), 1);
        assert_eq!(submission.reply.resources, conv.messages[1].resources);
        assert_eq!(rate.budget().current_requests, 1);
    }

    #[test]
    fn test_history_is_read_not_added_twice() {
        let gate = SubmissionGate::default();
        let mut conv = conversation();
        conv.budget.current_tokens = 5_000;
        let mut rate = limiter();

        let submission = gate
            .submit(&mut conv, Draft::new("hello", false), &mut rate, &gpt35(), &CannedResponder, now())
            .unwrap();

        assert_eq!(submission.breakdown.conversation_history, 5_000);
        assert_eq!(submission.breakdown.total, 5_282);
        assert_eq!(conv.budget.current_tokens, 5_282);
    }

    #[test]
    fn test_tenth_request_accepted_then_blocks_after_fifteenth() {
        let gate = SubmissionGate::default();
        let mut conv = conversation();
        let mut rate = limiter();
        for _ in 0..9 {
            rate.record_request();
        }

        gate.submit(&mut conv, Draft::new("hi", false), &mut rate, &gpt35(), &CannedResponder, now())
            .unwrap();
        assert_eq!(rate.budget().current_requests, 10);
        assert!(!rate.budget().is_blocked);

        for _ in 0..5 {
            gate.submit(&mut conv, Draft::new("hi", false), &mut rate, &gpt35(), &CannedResponder, now())
                .unwrap();
        }
        assert_eq!(rate.budget().current_requests, 15);
        assert!(rate.budget().is_blocked);

        let tokens_before = conv.budget.current_tokens;
        let messages_before = conv.messages.len();
        let err = gate
            .submit(&mut conv, Draft::new("hi", false), &mut rate, &gpt35(), &CannedResponder, now())
            .unwrap_err();
        assert!(matches!(err, SubmitError::RateLimited { .. }));
        assert_eq!(rate.budget().current_requests, 15);
        assert_eq!(conv.budget.current_tokens, tokens_before);
        assert_eq!(conv.messages.len(), messages_before);
    }

    #[test]
    fn test_rate_limited_reports_time_until_reset() {
        let gate = SubmissionGate::default();
        let mut conv = conversation();
        let mut rate = limiter();
        for _ in 0..15 {
            rate.record_request();
        }

        let later = now() + TimeDelta::seconds(45);
        let err = gate
            .submit(&mut conv, Draft::new("hi", false), &mut rate, &gpt35(), &CannedResponder, later)
            .unwrap_err();
        assert_eq!(
            err,
            SubmitError::RateLimited {
                retry_after: Duration::from_secs(15)
            }
        );
    }

    #[test]
    fn test_at_capacity_without_flag_forces_block() {
        let gate = SubmissionGate::default();
        let mut conv = conversation();
        let config = citebase_types::config::RateLimitConfig {
            initial_requests: 15,
            ..Default::default()
        };
        let mut rate = RateLimiter::from_config(&config, now());
        assert!(gate
            .submit(&mut conv, Draft::new("hi", false), &mut rate, &gpt35(), &CannedResponder, now())
            .is_err());
        assert!(rate.budget().is_blocked);
    }

    #[test]
    fn test_show_rate_indicator_from_eleventh_request() {
        let gate = SubmissionGate::default();
        let mut conv = conversation();
        let mut rate = limiter();
        let mut shown = Vec::new();
        for _ in 0..12 {
            let submission = gate
                .submit(&mut conv, Draft::new("hi", false), &mut rate, &gpt35(), &CannedResponder, now())
                .unwrap();
            shown.push(submission.show_rate_indicator);
        }
        assert!(shown[..10].iter().all(|s| !s));
        assert!(shown[10] && shown[11]);
    }

    #[test]
    fn test_overshoot_is_allowed_by_default() {
        let gate = SubmissionGate::default();
        let mut conv = conversation();
        conv.budget.current_tokens = 16_300;
        let mut rate = limiter();

        let submission = gate
            .submit(&mut conv, Draft::new("one more question", true), &mut rate, &gpt35(), &CannedResponder, now())
            .unwrap();
        assert!(submission.budget.current_tokens > 16_385);
        assert_eq!(submission.status, ContextStatus::Exceeded);
    }

    #[test]
    fn test_reject_policy_refuses_overflow_without_counting() {
        let gate = SubmissionGate::new(CostModel::default(), OverflowPolicy::Reject, 11);
        let mut conv = conversation();
        conv.budget.current_tokens = 16_300;
        let mut rate = limiter();

        let err = gate
            .submit(&mut conv, Draft::new("one more question", true), &mut rate, &gpt35(), &CannedResponder, now())
            .unwrap_err();
        assert!(matches!(err, SubmitError::ContextOverflow { max: 16_385, .. }));
        assert_eq!(rate.budget().current_requests, 0);
        assert_eq!(conv.budget.current_tokens, 16_300);
        assert!(conv.messages.is_empty());
    }

    #[test]
    fn test_status_transition_is_reported() {
        let gate = SubmissionGate::default();
        let mut conv = conversation();
        conv.budget.current_tokens = 12_000;
        let mut rate = limiter();

        let submission = gate
            .submit(&mut conv, Draft::new("hello there", true), &mut rate, &gpt35(), &CannedResponder, now())
            .unwrap();
        // 12000 + 3 + 100 + 850 + 180 = 13133 (~80%)
        assert_eq!(submission.previous_status, ContextStatus::Normal);
        assert_eq!(submission.status, ContextStatus::Warning);
        assert!(submission.status_changed());
    }

    #[test]
    fn test_submit_uses_active_model_window() {
        let gate = SubmissionGate::default();
        let mut conv = conversation();
        conv.budget.current_tokens = 15_000;
        let mut rate = limiter();
        let big = ModelProfile::new("Claude-3 Sonnet", 200_000);

        let submission = gate
            .submit(&mut conv, Draft::new("hi", false), &mut rate, &big, &CannedResponder, now())
            .unwrap();
        assert_eq!(submission.budget.model_max_tokens, 200_000);
        assert_eq!(submission.previous_status, ContextStatus::Normal);
        assert_eq!(submission.budget.current_tokens, 15_000 + 1 + 100 + 180);
    }
}
