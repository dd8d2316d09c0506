//! Infrastructure layer for Citebase.
//!
//! Reads `config.toml` from the data directory and resolves where that
//! directory lives.

pub mod config;
pub mod filesystem;
