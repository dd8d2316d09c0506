//! Budget event distribution.

pub mod bus;
