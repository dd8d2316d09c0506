//! Budget display formatting for the CLI.
//!
//! Renders the pre-send usage preview, the rate indicator, context warnings,
//! and assistant replies with their citations. Everything returns a `String`
//! so the chat loop can route output through the readline writer.

use std::time::Duration;

use console::style;

use citebase_core::view::{format_countdown, ContextWarning, RateIndicator, UsagePreview};
use citebase_types::budget::{ContextStatus, RateStatus};
use citebase_types::chat::{Citation, Message, Resource};

/// Format a token count with thousands separators: `12450` -> `12,450`.
pub fn format_tokens(tokens: u64) -> String {
    let digits = tokens.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Render the cost breakdown table of a preview.
///
/// ```text
///   User input            20
///   Expected response    250
///   Knowledge base       850
///   System instructions  180
///   History                0
///   Total              1,300 / 16,385
/// ```
pub fn render_breakdown(preview: &UsagePreview) -> String {
    let b = &preview.breakdown;
    let rows = [
        ("User input", b.user_input),
        ("Expected response", b.expected_response),
        ("Knowledge base", b.knowledge_base),
        ("System instructions", b.system_instructions),
        ("History", b.conversation_history),
    ];

    let mut out = String::new();
    for (label, tokens) in rows {
        out.push_str(&format!(
            "  {:<20} {:>8}\n",
            style(label).dim(),
            format_tokens(tokens)
        ));
    }
    out.push_str(&format!(
        "  {:<20} {:>8} / {}\n",
        style("Total").bold(),
        format_tokens(b.total),
        format_tokens(u64::from(preview.max_tokens)),
    ));
    out.push_str(&render_preview_summary(preview));
    out
}

/// One-line summary of a preview.
///
/// Example: `  [~1,300 tokens · 7.9% of window · 15,085 remaining]`
pub fn render_preview_summary(preview: &UsagePreview) -> String {
    let remaining = if preview.remaining < 0 {
        format!("{} over", format_tokens(preview.remaining.unsigned_abs()))
    } else {
        format!("{} remaining", format_tokens(preview.remaining.unsigned_abs()))
    };
    let text = format!(
        "  [~{} tokens \u{00b7} {:.1}% of window \u{00b7} {}]",
        format_tokens(preview.breakdown.total),
        preview.usage_percent,
        remaining,
    );

    if preview.will_exceed {
        format!(
            "{} {}",
            style(text).red(),
            style("exceeds the model's context window").red().bold()
        )
    } else if preview.near_limit {
        format!("{}", style(text).yellow())
    } else {
        format!("{}", style(text).dim())
    }
}

/// Render the rate indicator.
///
/// Example: `  [requests: 12 / 15 · resets in 42s]`
pub fn render_rate_indicator(indicator: &RateIndicator) -> String {
    let text = format!(
        "  [requests: {} / {} \u{00b7} resets in {}]",
        indicator.current, indicator.max, indicator.countdown
    );
    match indicator.status {
        RateStatus::Blocked => format!("{}", style(text).red()),
        RateStatus::NearLimit => format!("{}", style(text).yellow()),
        RateStatus::Available => format!("{}", style(text).dim()),
    }
}

/// Render a rejected send.
///
/// Example: `  ! Rate limit reached. Try again in 0:42. Your message was kept.`
pub fn render_rate_limited(retry_after: Duration) -> String {
    format!(
        "  {} {} {}",
        style("!").red().bold(),
        style(format!(
            "Rate limit reached. Try again in {}.",
            format_countdown(retry_after)
        ))
        .red(),
        style("Your message was kept; press Enter on an empty line to resend.").dim(),
    )
}

/// Render a context warning with upgrade suggestions.
pub fn render_context_warning(warning: &ContextWarning) -> String {
    let headline = match warning.status {
        ContextStatus::Exceeded => "Context limit reached",
        _ => "Approaching context limit",
    };
    let detail = format!(
        "{headline}: {:.1}% of {} used ({} / {} tokens).",
        warning.usage_percent,
        warning.model_name,
        format_tokens(warning.current_tokens),
        format_tokens(u64::from(warning.max_tokens)),
    );

    let mut out = match warning.status {
        ContextStatus::Exceeded => format!("  {} {}", style("!").red().bold(), style(detail).red()),
        _ => format!("  {} {}", style("!").yellow().bold(), style(detail).yellow()),
    };

    if warning.suggestions.is_empty() {
        out.push_str(&format!(
            "\n  {}",
            style("Start a new conversation with /new to reset context.").dim()
        ));
    } else {
        let names: Vec<String> = warning
            .suggestions
            .iter()
            .map(|m| format!("{} ({}K)", m.name, m.context_k()))
            .collect();
        out.push_str(&format!(
            "\n  {} {}",
            style("Switch with /model:").dim(),
            names.join(", ")
        ));
    }
    out
}

/// Render an assistant reply followed by its sources.
pub fn render_reply(message: &Message) -> String {
    let mut out = format!("  {} {}", style("Assistant >").cyan().bold(), message.content);
    for (i, citation) in message.citations.iter().enumerate() {
        out.push_str(&format!("\n  {}", style(render_citation(i + 1, citation)).dim()));
    }
    if !message.resources.is_empty() {
        out.push_str(&format!("\n  {}", style("Further reading:").bold()));
        for resource in &message.resources {
            out.push_str(&format!("\n  {}", style(render_resource(resource)).dim()));
        }
    }
    out
}

/// Example: `- Deep Work, Cal Newport (15 min read): Strategies for... <https://...>`
pub fn render_resource(resource: &Resource) -> String {
    let mut line = format!("- {}", resource.title);
    if let Some(author) = &resource.author {
        line.push_str(&format!(", {author}"));
    }
    if let Some(minutes) = resource.reading_time {
        line.push_str(&format!(" ({minutes} min read)"));
    }
    line.push_str(&format!(": {} <{}>", resource.description, resource.url));
    line
}

/// Example: `[1] The Cost of Interrupted Work, Gloria Mark et al. (2008) <https://...>`
pub fn render_citation(number: usize, citation: &Citation) -> String {
    let source = &citation.source;
    let mut line = format!("[{number}] {}", source.title);
    if let Some(author) = &source.author {
        line.push_str(&format!(", {author}"));
    }
    if let Some(year) = source.year {
        line.push_str(&format!(" ({year})"));
    }
    if let Some(url) = &source.url {
        line.push_str(&format!(" <{url}>"));
    }
    line
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use citebase_core::budget::cost::CostModel;
    use citebase_core::responder::{CannedResponder, ResponseGenerator};
    use citebase_core::view::usage_preview;
    use citebase_types::model::ModelProfile;

    use super::*;

    #[test]
    fn format_tokens_groups_thousands() {
        assert_eq!(format_tokens(0), "0");
        assert_eq!(format_tokens(999), "999");
        assert_eq!(format_tokens(1_000), "1,000");
        assert_eq!(format_tokens(16_385), "16,385");
        assert_eq!(format_tokens(1_234_567), "1,234,567");
    }

    #[test]
    fn breakdown_lists_every_component() {
        let breakdown = CostModel::default().breakdown(&"x".repeat(80), true, 0);
        let rendered = render_breakdown(&usage_preview(breakdown, 16_385, 85));
        assert!(rendered.contains("Knowledge base"));
        assert!(rendered.contains("850"));
        assert!(rendered.contains("1,300"));
        assert!(rendered.contains("16,385"));
        assert!(rendered.contains("remaining"));
    }

    #[test]
    fn preview_summary_flags_overflow() {
        let breakdown = CostModel::default().breakdown("hi", true, 16_000);
        let rendered = render_preview_summary(&usage_preview(breakdown, 16_385, 85));
        assert!(rendered.contains("over"));
        assert!(rendered.contains("exceeds"));
    }

    #[test]
    fn rate_indicator_shows_counts_and_countdown() {
        let indicator = RateIndicator {
            status: RateStatus::NearLimit,
            current: 12,
            max: 15,
            remaining: 3,
            usage_percent: 80.0,
            reset_in_ms: 42_000,
            countdown: "42s".to_string(),
            visible: true,
        };
        let rendered = render_rate_indicator(&indicator);
        assert!(rendered.contains("12 / 15"));
        assert!(rendered.contains("42s"));
    }

    #[test]
    fn rate_limited_mentions_countdown() {
        let rendered = render_rate_limited(Duration::from_millis(41_200));
        assert!(rendered.contains("42s"));
        assert!(rendered.contains("kept"));
    }

    #[test]
    fn context_warning_lists_suggestions() {
        let warning = ContextWarning {
            status: ContextStatus::Exceeded,
            model_name: "GPT-3.5 Turbo".to_string(),
            current_tokens: 15_000,
            max_tokens: 16_385,
            usage_percent: 91.5,
            suggestions: vec![
                ModelProfile::new("GPT-4", 32_768),
                ModelProfile::new("GPT-4 Turbo", 128_000),
            ],
        };
        let rendered = render_context_warning(&warning);
        assert!(rendered.contains("Context limit reached"));
        assert!(rendered.contains("15,000 / 16,385"));
        assert!(rendered.contains("GPT-4 (33K), GPT-4 Turbo (128K)"));
    }

    #[test]
    fn context_warning_without_suggestions_points_at_new() {
        let warning = ContextWarning {
            status: ContextStatus::Warning,
            model_name: "Claude-3 Sonnet".to_string(),
            current_tokens: 160_000,
            max_tokens: 200_000,
            usage_percent: 80.0,
            suggestions: Vec::new(),
        };
        let rendered = render_context_warning(&warning);
        assert!(rendered.contains("Approaching context limit"));
        assert!(rendered.contains("/new"));
    }

    #[test]
    fn reply_includes_numbered_sources() {
        let generated = CannedResponder::new().generate("focus", true);
        let now = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        let message = Message::assistant(generated.content, generated.citations, now);
        let rendered = render_reply(&message);
        assert!(rendered.contains("[1] The Cost of Interrupted Work"));
        assert!(rendered.contains("(2008)"));
        assert!(!rendered.contains("Further reading"));
    }

    #[test]
    fn reply_lists_further_reading() {
        let generated = CannedResponder::new().generate("focus", true);
        let now = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        let message =
            Message::assistant(generated.content, generated.citations, now).with_resources(generated.resources);
        let rendered = render_reply(&message);
        assert!(rendered.contains("Further reading:"));
        assert!(rendered.contains("Deep Work"));
        assert!(rendered.contains("(15 min read)"));
        assert!(rendered.contains("<https://calnewport.com/books/deep-work/>"));
    }
}
