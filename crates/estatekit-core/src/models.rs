//! Domain models for Estate Kit.
//!
//! These are the core types shared across all crates.

pub mod audit;
pub mod delegate;
pub mod session;
pub mod user;
