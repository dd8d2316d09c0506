//! Reply generation seam.
//!
//! The submission gate asks a `ResponseGenerator` for the assistant's reply
//! once a request has passed the rate check. `CannedResponder` is the local
//! stand-in used by the demo; a real deployment puts a model call here.

use citebase_types::chat::{Citation, Resource, Source};

/// Reply text plus any citations into that text and further reading.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedReply {
    pub content: String,
    pub citations: Vec<Citation>,
    pub resources: Vec<Resource>,
}

pub trait ResponseGenerator: Send + Sync {
    fn generate(&self, prompt: &str, knowledge_base_enabled: bool) -> GeneratedReply;
}

/// Longest prompt excerpt echoed back in a canned reply, in characters.
const EXCERPT_CHARS: usize = 48;

const OPENING: &str = "Here is what I can tell you about ";

const CITED_CLAIM: &str = "digital interruptions such as notifications are among the most significant focus disruptors in modern work";

const CLOSING: &str = " A practical first step is to batch notifications and protect one uninterrupted block of time each day.";

/// Deterministic reply generator.
///
/// Echoes an excerpt of the prompt. With the knowledge base enabled the reply
/// includes one claim attributed to a fixed source.
#[derive(Debug, Clone, Default)]
pub struct CannedResponder;

impl CannedResponder {
    pub fn new() -> Self {
        Self
    }

    fn source() -> Source {
        Source {
            title: "The Cost of Interrupted Work: More Speed and Stress".to_string(),
            author: Some("Gloria Mark et al.".to_string()),
            year: Some(2008),
            url: Some("https://dl.acm.org/doi/10.1145/1357054.1357072".to_string()),
            image_url: None,
            preview: Some(
                "Interrupted work is completed faster but at the price of more stress, frustration and effort."
                    .to_string(),
            ),
            ai_context: Some(
                "Participants interrupted by notifications reported higher workload and time pressure.".to_string(),
            ),
            usage_context: Some("Supports the claim that notifications disrupt focus.".to_string()),
        }
    }

    fn resource() -> Resource {
        Resource {
            title: "Deep Work: Rules for Focused Success in a Distracted World".to_string(),
            description: "Strategies for protecting long blocks of concentration.".to_string(),
            url: "https://calnewport.com/books/deep-work/".to_string(),
            image_url: None,
            author: Some("Cal Newport".to_string()),
            publish_date: Some("2016-01-05".to_string()),
            reading_time: Some(15),
        }
    }
}

impl ResponseGenerator for CannedResponder {
    fn generate(&self, prompt: &str, knowledge_base_enabled: bool) -> GeneratedReply {
        let excerpt = excerpt(prompt);
        let mut content = format!("{OPENING}\"{excerpt}\".");
        let mut citations = Vec::new();
        let mut resources = Vec::new();

        if knowledge_base_enabled {
            content.push_str(" Research in your knowledge base shows that ");
            let start_index = content.chars().count();
            content.push_str(CITED_CLAIM);
            let end_index = content.chars().count();
            content.push('.');
            citations.push(Citation {
                text: CITED_CLAIM.to_string(),
                start_index,
                end_index,
                source: Self::source(),
            });
            resources.push(Self::resource());
        }

        content.push_str(CLOSING);
        GeneratedReply {
            content,
            citations,
            resources,
        }
    }
}

fn excerpt(prompt: &str) -> String {
    let collapsed = prompt.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= EXCERPT_CHARS {
        return collapsed;
    }
    let head: String = collapsed.chars().take(EXCERPT_CHARS).collect();
    format!("{}...", head.trim_end())
}
