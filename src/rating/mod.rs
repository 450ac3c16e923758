//! Player rating engine
//!
//! This module provides the step-table rating calculator, the daily change
//! ledger, trial-match onboarding, the engine tying them together and the
//! service that persists results through a [`PlayerStore`].

pub mod calculator;
pub mod engine;
pub mod ledger;
pub mod service;
pub mod storage;
pub mod trial;

// Re-export commonly used types
pub use calculator::{OpponentStrength, RatingCalculator, TieredRatingCalculator};
pub use engine::RatingEngine;
pub use ledger::{DailyChangeLedger, LedgerSnapshot};
pub use service::RatingService;
pub use storage::{InMemoryPlayerStore, PlayerStore};
