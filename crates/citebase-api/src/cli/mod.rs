//! CLI command definitions for the `citebase` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod chat;
pub mod display;
pub mod models;
pub mod preview;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Chat with token budget and rate limit accounting.
#[derive(Parser)]
#[command(name = "citebase", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans to stdout via OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat session.
    Chat {
        /// Model to start with (defaults to `default_model` from config.toml).
        #[arg(long)]
        model: Option<String>,

        /// Enable the knowledge base for every message.
        #[arg(long)]
        kb: bool,

        /// Seed the first conversation with this many tokens of history.
        #[arg(long, value_name = "TOKENS", default_value_t = 0)]
        history: u64,
    },

    /// Estimate the token cost of sending a message.
    Preview {
        /// The message to estimate.
        text: String,

        /// Include the knowledge base context.
        #[arg(long)]
        kb: bool,

        /// Tokens already used by the conversation.
        #[arg(long, value_name = "TOKENS", default_value_t = 0)]
        history: u64,

        /// Model whose context window to measure against.
        #[arg(long)]
        model: Option<String>,
    },

    /// List the model catalog.
    #[command(alias = "ls")]
    Models,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
