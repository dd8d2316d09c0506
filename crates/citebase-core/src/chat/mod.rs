//! Conversation hosting: the single-writer owner of the rate window, the
//! active model, and every conversation's budget.

pub mod service;
