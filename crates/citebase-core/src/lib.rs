//! Accounting core for Citebase.
//!
//! Tracks a conversation's context usage against the active model's window,
//! estimates the token cost of each exchange, and gates submissions on a
//! shared per-window request budget. Everything here is synchronous and
//! free of file, network, and terminal I/O; the host forwards clock ticks.

pub mod budget;
pub mod catalog;
pub mod chat;
pub mod clock;
pub mod event;
pub mod gate;
pub mod responder;
pub mod view;
