//! Deterministic random number generation
//!
//! Activation order, spawn sampling and delay sampling all draw from a single
//! xorshift64* stream owned by the orchestrator.

mod xorshift;

pub use xorshift::RngManager;
