//! Slash command parsing for the chat loop.

use console::style;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Exit the chat session.
    Exit,
    /// Start a new conversation (the rate window carries over).
    New,
    /// Switch the active model.
    Model(String),
    /// List the model catalog.
    Models,
    /// Toggle the knowledge base.
    KnowledgeBase(bool),
    /// Estimate the cost of a message without sending it.
    Preview(String),
    /// Show budget and rate window status.
    Status,
    /// Reset the rate window now.
    Reset,
    /// Show the active conversation's messages.
    History,
    /// Unknown or malformed command.
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let parts: Vec<&str> = trimmed.splitn(2, ' ').collect();
    let cmd = parts[0].to_lowercase();
    let arg = parts
        .get(1)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    match cmd.as_str() {
        "/help" | "/h" | "/?" => Some(ChatCommand::Help),
        "/exit" | "/quit" | "/q" => Some(ChatCommand::Exit),
        "/new" => Some(ChatCommand::New),
        "/models" => Some(ChatCommand::Models),
        "/model" => match arg {
            Some(name) => Some(ChatCommand::Model(name)),
            None => Some(ChatCommand::Unknown("/model requires a model name".to_string())),
        },
        "/kb" => match arg.as_deref().map(str::to_lowercase).as_deref() {
            Some("on") => Some(ChatCommand::KnowledgeBase(true)),
            Some("off") => Some(ChatCommand::KnowledgeBase(false)),
            _ => Some(ChatCommand::Unknown("/kb expects 'on' or 'off'".to_string())),
        },
        "/preview" => match arg {
            Some(text) => Some(ChatCommand::Preview(text)),
            None => Some(ChatCommand::Preview(String::new())),
        },
        "/status" => Some(ChatCommand::Status),
        "/reset" => Some(ChatCommand::Reset),
        "/history" => Some(ChatCommand::History),
        other => Some(ChatCommand::Unknown(other.to_string())),
    }
}

/// Help text listing all available commands.
pub fn help_text() -> String {
    let rows = [
        ("/help", "Show this help message"),
        ("/new", "Start a new conversation"),
        ("/model NAME", "Switch the active model"),
        ("/models", "List available models"),
        ("/kb on|off", "Toggle the knowledge base"),
        ("/preview TEXT", "Estimate tokens without sending"),
        ("/status", "Show context and rate limit usage"),
        ("/reset", "Reset the rate limit window"),
        ("/history", "Show this conversation's messages"),
        ("/exit", "End the chat session"),
    ];

    let mut out = format!("\n  {}\n\n", style("Available commands:").bold());
    for (command, description) in rows {
        out.push_str(&format!("  {:<16} {}\n", style(command).cyan(), description));
    }
    out.push_str(&format!(
        "\n  {}\n",
        style("Ctrl+D to exit. Enter on an empty line resends a rate-limited draft.").dim()
    ));
    out
}
