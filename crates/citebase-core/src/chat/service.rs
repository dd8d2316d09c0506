//! Chat service owning the rate window, the active model, and conversations.
//!
//! `ChatService` is the single writer for all budget state. Hosts serialize
//! access to it (one event loop, or a mutex around the whole service) and
//! forward user actions and clock ticks as discrete calls. Every state change
//! is published on the service's [`EventBus`].

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use citebase_types::budget::ConversationBudget;
use citebase_types::chat::Conversation;
use citebase_types::config::CitebaseConfig;
use citebase_types::error::{CatalogError, ConversationError, SubmitError};
use citebase_types::event::BudgetEvent;
use citebase_types::model::ModelProfile;

use crate::budget::context::{status, usage_ratio};
use crate::budget::rate::RateLimiter;
use crate::catalog::ModelCatalog;
use crate::event::bus::EventBus;
use crate::gate::{Draft, Submission, SubmissionGate};
use crate::responder::ResponseGenerator;
use crate::view::{
    context_warning, preview_visible, rate_indicator, usage_preview, ContextWarning,
    RateIndicator, UsagePreview,
};

/// Hosts conversations and gates every send.
///
/// Generic over `ResponseGenerator` so the demo responder can be swapped for
/// a real model call without touching the accounting.
pub struct ChatService<R: ResponseGenerator> {
    config: CitebaseConfig,
    catalog: ModelCatalog,
    gate: SubmissionGate,
    responder: R,
    rate: RateLimiter,
    active_model: ModelProfile,
    /// Most recent first.
    conversations: Vec<Conversation>,
    active: Option<Uuid>,
    knowledge_base_enabled: bool,
    events: EventBus,
}

impl<R: ResponseGenerator> ChatService<R> {
    /// Create a service from configuration.
    ///
    /// The rate window starts at `now`. Fails when the configured default
    /// model is not in the catalog.
    pub fn new(config: CitebaseConfig, responder: R, now: DateTime<Utc>) -> Result<Self, CatalogError> {
        let catalog = ModelCatalog::from_profiles(config.catalog_profiles());
        let active_model = catalog.require(&config.default_model)?.clone();
        let gate = SubmissionGate::from_config(&config);
        let rate = RateLimiter::from_config(&config.rate_limit, now);

        Ok(Self {
            config,
            catalog,
            gate,
            responder,
            rate,
            active_model,
            conversations: Vec::new(),
            active: None,
            knowledge_base_enabled: false,
            events: EventBus::default(),
        })
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn config(&self) -> &CitebaseConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn active_model(&self) -> &ModelProfile {
        &self.active_model
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate
    }

    pub fn knowledge_base_enabled(&self) -> bool {
        self.knowledge_base_enabled
    }

    pub fn set_knowledge_base(&mut self, enabled: bool) {
        self.knowledge_base_enabled = enabled;
    }

    // --- Conversations ---

    /// Start an empty conversation and make it active.
    pub fn start_conversation(&mut self, now: DateTime<Utc>) -> Uuid {
        self.start_conversation_with_history(0, now)
    }

    /// Start a conversation that already carries `history_tokens` of usage.
    pub fn start_conversation_with_history(&mut self, history_tokens: u64, now: DateTime<Utc>) -> Uuid {
        let conversation = self.new_conversation(history_tokens, now);
        self.insert_conversation(conversation)
    }

    fn new_conversation(&self, history_tokens: u64, now: DateTime<Utc>) -> Conversation {
        let budget = ConversationBudget::new(self.active_model.max_context_tokens)
            .with_thresholds(
                self.config.context.warning_threshold_percent,
                self.config.context.exceeded_threshold_percent,
            )
            .with_tokens(history_tokens);
        Conversation::new(budget, now)
    }

    /// Register a conversation as the most recent one and make it active.
    fn insert_conversation(&mut self, conversation: Conversation) -> Uuid {
        let id = conversation.id;
        let history_tokens = conversation.budget.current_tokens;
        self.conversations.insert(0, conversation);
        self.active = Some(id);

        info!(conversation_id = %id, history_tokens, "Conversation started");
        self.events
            .publish(BudgetEvent::ConversationStarted { conversation_id: id });
        id
    }

    /// Make an existing conversation active. Only changes the view.
    pub fn select_conversation(&mut self, id: Uuid) -> Result<(), ConversationError> {
        if self.conversation(id).is_none() {
            return Err(ConversationError::NotFound(id));
        }
        self.active = Some(id);
        Ok(())
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn conversation(&self, id: Uuid) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.active.and_then(|id| self.conversation(id))
    }

    fn active_index(&self) -> Option<usize> {
        let id = self.active?;
        self.conversations.iter().position(|c| c.id == id)
    }

    // --- Model selection ---

    /// Switch the active model.
    ///
    /// Token counts are never rescaled; only the divisor for every
    /// conversation's usage ratio changes.
    pub fn switch_model(&mut self, name: &str) -> Result<&ModelProfile, CatalogError> {
        let next = self.catalog.require(name)?.clone();
        let previous = std::mem::replace(&mut self.active_model, next);

        let before = self.active_conversation().map(|c| status(&c.budget));
        for conversation in &mut self.conversations {
            conversation.budget.model_max_tokens = self.active_model.max_context_tokens;
        }

        info!(from = %previous.name, to = %self.active_model.name, "Model switched");
        self.events.publish(BudgetEvent::ModelSwitched {
            from: previous.name,
            to: self.active_model.name.clone(),
        });

        if let (Some(from), Some(conversation)) = (before, self.active_conversation()) {
            let to = status(&conversation.budget);
            if from != to {
                self.events.publish(BudgetEvent::ContextStatusChanged {
                    conversation_id: conversation.id,
                    from,
                    to,
                    ratio: usage_ratio(&conversation.budget),
                });
            }
        }

        Ok(&self.active_model)
    }

    // --- Submission ---

    /// Estimate what sending `text` to the active conversation would cost.
    ///
    /// `None` when there is nothing to estimate (empty draft, knowledge base
    /// off). Read-only.
    pub fn preview(&self, text: &str) -> Option<UsagePreview> {
        if !preview_visible(text, self.knowledge_base_enabled) {
            return None;
        }
        let history = self
            .active_conversation()
            .map(|c| c.budget.current_tokens)
            .unwrap_or(0);
        let breakdown = self
            .gate
            .cost_model()
            .breakdown(text, self.knowledge_base_enabled, history);
        Some(usage_preview(
            breakdown,
            self.active_model.max_context_tokens,
            self.config.context.preview_near_limit_percent,
        ))
    }

    /// Send `text` to the active conversation, starting one if needed.
    ///
    /// A conversation started for this send is only kept once the gate
    /// accepts it. On failure nothing but the rate window's blocked flag
    /// changes, so the caller can keep the user's draft.
    pub fn send(&mut self, text: &str, now: DateTime<Utc>) -> Result<Submission, SubmitError> {
        let draft = Draft::new(text, self.knowledge_base_enabled);
        let (conversation_id, result) = match self.active_index() {
            Some(index) => {
                let conversation = &mut self.conversations[index];
                let result = self.gate.submit(
                    conversation,
                    draft,
                    &mut self.rate,
                    &self.active_model,
                    &self.responder,
                    now,
                );
                (Some(conversation.id), result)
            }
            None => {
                let mut conversation = self.new_conversation(0, now);
                let result = self.gate.submit(
                    &mut conversation,
                    draft,
                    &mut self.rate,
                    &self.active_model,
                    &self.responder,
                    now,
                );
                let id = result.is_ok().then(|| self.insert_conversation(conversation));
                (id, result)
            }
        };

        let window = self.rate.budget();
        match &result {
            Ok(submission) => {
                self.events.publish(BudgetEvent::RequestAccepted {
                    current: window.current_requests,
                    max: window.max_requests,
                });
                if let (true, Some(conversation_id)) = (submission.status_changed(), conversation_id) {
                    self.events.publish(BudgetEvent::ContextStatusChanged {
                        conversation_id,
                        from: submission.previous_status,
                        to: submission.status,
                        ratio: usage_ratio(&submission.budget),
                    });
                }
            }
            Err(SubmitError::RateLimited { retry_after }) => {
                self.events.publish(BudgetEvent::RateLimited {
                    current: window.current_requests,
                    max: window.max_requests,
                    retry_after_ms: retry_after.as_millis() as u64,
                });
            }
            Err(SubmitError::ContextOverflow { projected, max }) => {
                self.events.publish(BudgetEvent::ContextOverflowRejected {
                    conversation_id,
                    projected: *projected,
                    max: *max,
                });
            }
        }

        result
    }

    // --- Rate window ---

    /// Forward a clock reading. Rolls the window over at its deadline.
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        let reset = self.rate.tick(now);
        if reset {
            self.events.publish(BudgetEvent::RateWindowReset {
                reset_at: self.rate.budget().reset_time,
            });
        }
        reset
    }

    /// Explicitly start a fresh rate window.
    pub fn reset_rate_limit(&mut self, now: DateTime<Utc>) {
        self.rate.reset(now);
        self.events.publish(BudgetEvent::RateWindowReset {
            reset_at: self.rate.budget().reset_time,
        });
    }

    // --- Views ---

    pub fn rate_view(&self, now: DateTime<Utc>) -> RateIndicator {
        rate_indicator(&self.rate, now, self.config.rate_limit.indicator_threshold)
    }

    /// Context warning for the active conversation, if any.
    pub fn context_view(&self) -> Option<ContextWarning> {
        let conversation = self.active_conversation()?;
        context_warning(&conversation.budget, &self.active_model, &self.catalog)
    }
}
