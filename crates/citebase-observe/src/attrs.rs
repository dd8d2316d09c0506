//! Span attribute names for budget instrumentation.
//!
//! Model and usage keys follow the OpenTelemetry GenAI semantic conventions;
//! budget-specific keys live under the `citebase.` namespace. Use them as
//! constant field names: `info_span!("submit", { attrs::CONVERSATION_ID } = %id)`.

// --- GenAI semantic conventions ---

/// The name of the operation being performed (e.g., "submit", "preview").
pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";

/// The model the request is accounted against.
pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";

/// Estimated input tokens for the exchange.
pub const GEN_AI_USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";

// --- Context budget ---

pub const CONVERSATION_ID: &str = "citebase.conversation.id";

/// The model's context window, in tokens.
pub const CONTEXT_MAX_TOKENS: &str = "citebase.context.max_tokens";

/// Tokens accumulated in the conversation before the exchange.
pub const CONTEXT_CURRENT_TOKENS: &str = "citebase.context.current_tokens";

/// `normal`, `warning`, or `exceeded`.
pub const CONTEXT_STATUS: &str = "citebase.context.status";

pub const KNOWLEDGE_BASE_ENABLED: &str = "citebase.knowledge_base.enabled";

// --- Rate window ---

pub const RATE_CURRENT_REQUESTS: &str = "citebase.rate.current_requests";
pub const RATE_MAX_REQUESTS: &str = "citebase.rate.max_requests";

// --- Operation name values ---

/// A gated send.
pub const OP_SUBMIT: &str = "submit";

/// A read-only cost estimate.
pub const OP_PREVIEW: &str = "preview";
