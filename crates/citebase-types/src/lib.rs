//! Shared domain types for Citebase.
//!
//! This crate contains the data shapes used across the Citebase workspace:
//! model profiles, conversation and rate budgets, conversations with their
//! messages, configuration, events, and the associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod budget;
pub mod chat;
pub mod config;
pub mod error;
pub mod event;
pub mod model;
