//! Citebase CLI entry point.
//!
//! Binary name: `citebase`
//!
//! Parses CLI arguments, sets up tracing, loads configuration, then
//! dispatches to the chat loop or a one-shot command.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use citebase_observe::tracing_setup::{filter_for_verbosity, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(filter_for_verbosity(cli.verbose, cli.quiet), cli.otel)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "citebase", &mut std::io::stdout());
        return Ok(());
    }

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Chat { model, kb, history } => {
            let state = AppState::init(model.as_deref()).await?;
            cli::chat::loop_runner::run_chat_loop(&state, kb, history).await?;
        }

        Commands::Preview {
            text,
            kb,
            history,
            model,
        } => {
            let state = AppState::init(model.as_deref()).await?;
            cli::preview::preview(&state, &text, kb, history, cli.json).await?;
        }

        Commands::Models => {
            let state = AppState::init(None).await?;
            cli::models::list_models(&state, cli.json).await?;
        }

        Commands::Completions { .. } => {}
    }

    Ok(())
}
