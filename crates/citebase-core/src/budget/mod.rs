//! Budget accounting.
//!
//! - `context`: per-conversation usage ratio and status tiers
//! - `rate`: the shared request window and its reset timer
//! - `cost`: token cost estimation for one exchange

pub mod context;
pub mod cost;
pub mod rate;
