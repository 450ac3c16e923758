//! Padel Rating - rating engine for padel doubles tournaments
//!
//! This crate keeps each player's skill rating on a 0-7 scale, seeds new
//! players from three trial matches and settles doubles results under a
//! per-player daily movement cap.

pub mod config;
pub mod error;
pub mod metrics;
pub mod rating;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{RatingError, Result};
pub use types::*;

// Re-export key components
pub use rating::{InMemoryPlayerStore, PlayerStore, RatingEngine, RatingService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
