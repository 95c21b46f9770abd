//! kanjo Core
//!
//! Core types and error handling shared across the kanjo crates.
//!
//! This crate provides:
//! - The two-valued [`SentimentLabel`] and the label normalization rule
//! - Error types and result handling

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::SentimentLabel;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::SentimentLabel;
}
