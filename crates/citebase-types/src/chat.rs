//! Conversation, message, citation, and resource types for Citebase.
//!
//! A conversation owns its `ConversationBudget`; nothing outside the
//! conversation mutates it except the submission gate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::budget::ConversationBudget;

/// Title used until the first user message arrives.
pub const DEFAULT_TITLE: &str = "New conversation";

/// Longest title derived from a user message, in characters.
pub const MAX_TITLE_CHARS: usize = 60;

/// A source referenced by a citation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Short excerpt of the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    /// What the source says that is relevant to the question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_context: Option<String>,
    /// How the source was used in the reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_context: Option<String>,
}

/// Further reading attached to an assistant reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub title: String,
    pub description: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
    /// Estimated reading time in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_time: Option<u32>,
}

/// A span of an assistant message attributed to a source.
///
/// `start_index..end_index` are character offsets into the message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub text: String,
    pub start_index: usize,
    pub end_index: usize,
    pub source: Source,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_user: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Resource>,
}

impl Message {
    /// A message typed by the user.
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            content: content.into(),
            timestamp,
            is_user: true,
            citations: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// A reply from the assistant.
    pub fn assistant(
        content: impl Into<String>,
        citations: Vec<Citation>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            content: content.into(),
            timestamp,
            is_user: false,
            citations,
            resources: Vec::new(),
        }
    }

    pub fn with_resources(mut self, resources: Vec<Resource>) -> Self {
        self.resources = resources;
        self
    }
}

/// A conversation and its running context budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<Message>,
    pub budget: ConversationBudget,
}

impl Conversation {
    /// Create an empty conversation with the given budget.
    pub fn new(budget: ConversationBudget, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            title: DEFAULT_TITLE.to_string(),
            created_at,
            messages: Vec::new(),
            budget,
        }
    }

    /// Append a message, deriving the title from the first user message.
    pub fn push_message(&mut self, message: Message) {
        if message.is_user && !self.messages.iter().any(|m| m.is_user) {
            self.title = derive_title(&message.content);
        }
        self.messages.push(message);
    }

    /// Number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

/// Derive a conversation title from the first user message.
///
/// Collapses whitespace and truncates to [`MAX_TITLE_CHARS`] characters,
/// appending "..." when truncated.
pub fn derive_title(content: &str) -> String {
    let collapsed = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return DEFAULT_TITLE.to_string();
    }
    if collapsed.chars().count() <= MAX_TITLE_CHARS {
        return collapsed;
    }
    let truncated: String = collapsed.chars().take(MAX_TITLE_CHARS - 3).collect();
    format!("{}...", truncated.trim_end())
}
