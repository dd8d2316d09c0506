//! Welcome banner for chat sessions.

use console::style;

use citebase_types::model::ModelProfile;

/// Banner shown when a chat session starts.
pub fn welcome_banner(model: &ModelProfile, knowledge_base: bool, max_requests: u32, window_secs: u64) -> String {
    let kb = if knowledge_base { "on" } else { "off" };
    let mut out = String::new();
    out.push('\n');
    out.push_str(&format!("  {} {}\n", "*", style("Citebase").cyan().bold()));
    out.push_str(&format!(
        "  {}\n\n",
        style("Research chat with token and rate limit accounting").dim()
    ));
    out.push_str(&format!(
        "  {}     {}\n",
        style("Model:").bold(),
        style(format!("{} ({}K context)", model.name, model.context_k())).dim()
    ));
    out.push_str(&format!(
        "  {} {}\n",
        style("Knowledge:").bold(),
        style(kb).dim()
    ));
    out.push_str(&format!(
        "  {}    {}\n\n",
        style("Limit:").bold(),
        style(format!("{max_requests} requests per {window_secs}s")).dim()
    ));
    out.push_str(&format!(
        "  {}\n",
        style("Type /help for commands, Ctrl+D to exit").dim()
    ));
    out.push_str(&format!("  {}\n", style("---").dim()));
    out
}
