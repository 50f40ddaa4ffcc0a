//! `tally-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no locking, no IO).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::AccountId;
