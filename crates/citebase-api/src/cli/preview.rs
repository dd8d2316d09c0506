//! `citebase preview`: estimate what a message would cost without sending it.

use anyhow::Result;
use console::style;
use tracing::info_span;

use citebase_observe::attrs;

use crate::cli::display::render_breakdown;
use crate::state::AppState;

pub async fn preview(
    state: &AppState,
    text: &str,
    knowledge_base: bool,
    history: u64,
    json: bool,
) -> Result<()> {
    let mut service = state.service.lock().await;
    service.start_conversation_with_history(history, state.clock.now());
    service.set_knowledge_base(knowledge_base);

    let model = service.active_model().clone();
    let _span = info_span!(
        "preview",
        { attrs::GEN_AI_OPERATION_NAME } = attrs::OP_PREVIEW,
        { attrs::GEN_AI_REQUEST_MODEL } = %model.name,
        { attrs::CONTEXT_MAX_TOKENS } = model.max_context_tokens,
        { attrs::CONTEXT_CURRENT_TOKENS } = history,
        { attrs::KNOWLEDGE_BASE_ENABLED } = knowledge_base,
    )
    .entered();

    let Some(preview) = service.preview(text) else {
        if json {
            println!("null");
        } else {
            println!("\n  {}\n", style("Nothing to estimate: empty message and knowledge base off.").dim());
        }
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
        return Ok(());
    }

    println!();
    println!(
        "  {}  {}",
        style("Model:").bold(),
        style(format!("{} ({}K)", model.name, model.context_k())).dim()
    );
    println!();
    print!("{}", render_breakdown(&preview));
    println!();
    println!();
    Ok(())
}
