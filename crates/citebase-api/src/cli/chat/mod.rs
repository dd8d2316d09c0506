//! Interactive CLI chat for Citebase.
//!
//! Runs the REPL, slash commands, and the rate window ticker.
//! Entry point: `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
