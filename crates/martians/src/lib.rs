//! Martian directory domain module.
//!
//! This crate contains business rules for martians, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod martian;

pub use martian::{Martian, MartianUpdate};
