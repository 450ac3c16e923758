//! Rating calculator trait and implementations
//!
//! A calculator turns one match outcome into a proposed rating change. It is
//! pure: daily caps and history bookkeeping belong to the engine.

use crate::config::{ChangeTable, RatingConfig};
use crate::utils::clamp_change;
use std::sync::Mutex;

/// Relative strength of the opposing team as seen by one player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpponentStrength {
    Stronger,
    Equal,
    Weaker,
}

impl OpponentStrength {
    /// Classify by the sign of `opponent_average - player_rating`
    pub fn classify(player_rating: f64, opponent_average: f64) -> Self {
        let diff = opponent_average - player_rating;
        if diff > 0.0 {
            OpponentStrength::Stronger
        } else if diff < 0.0 {
            OpponentStrength::Weaker
        } else {
            OpponentStrength::Equal
        }
    }
}

/// Trait for calculating the rating change of a single player after a match
pub trait RatingCalculator: Send + Sync + std::fmt::Debug {
    /// Calculate the change for a player given the opposing team's average rating
    ///
    /// # Arguments
    /// * `player_rating` - the player's rating before the match
    /// * `opponent_average` - mean pre-match rating of the opposing team
    /// * `won` - whether the player's team won
    fn calculate_rating_change(&self, player_rating: f64, opponent_average: f64, won: bool)
        -> f64;

    /// Short identifier used in logs
    fn name(&self) -> &'static str;
}

/// Step-table calculator: a fixed change per (outcome, opponent strength) cell,
/// shrunk so the resulting rating cannot leave the global bounds
#[derive(Debug, Clone)]
pub struct TieredRatingCalculator {
    table: ChangeTable,
    min_rating: f64,
    max_rating: f64,
}

impl TieredRatingCalculator {
    pub fn new(config: &RatingConfig) -> Self {
        Self {
            table: config.change_table.clone(),
            min_rating: config.min_rating,
            max_rating: config.max_rating,
        }
    }

    /// Table value before the bounds pre-clamp
    pub fn raw_change(&self, strength: OpponentStrength, won: bool) -> f64 {
        match (won, strength) {
            (true, OpponentStrength::Stronger) => self.table.win_vs_stronger,
            (true, OpponentStrength::Equal) => self.table.win_vs_equal,
            (true, OpponentStrength::Weaker) => self.table.win_vs_weaker,
            (false, OpponentStrength::Stronger) => -self.table.loss_vs_stronger,
            (false, OpponentStrength::Equal) => -self.table.loss_vs_equal,
            (false, OpponentStrength::Weaker) => -self.table.loss_vs_weaker,
        }
    }
}

impl Default for TieredRatingCalculator {
    fn default() -> Self {
        Self::new(&RatingConfig::default())
    }
}

impl RatingCalculator for TieredRatingCalculator {
    fn calculate_rating_change(
        &self,
        player_rating: f64,
        opponent_average: f64,
        won: bool,
    ) -> f64 {
        let strength = OpponentStrength::classify(player_rating, opponent_average);
        let raw = self.raw_change(strength, won);
        clamp_change(player_rating, raw, self.min_rating, self.max_rating)
    }

    fn name(&self) -> &'static str {
        "tiered"
    }
}

/// Mock rating calculator for testing: proposes the same change to everyone
#[derive(Debug, Default)]
pub struct MockRatingCalculator {
    win_change: f64,
    loss_change: f64,
    calculation_calls: Mutex<Vec<(f64, f64, bool)>>,
}

impl MockRatingCalculator {
    pub fn new(win_change: f64, loss_change: f64) -> Self {
        Self {
            win_change,
            loss_change,
            calculation_calls: Mutex::new(Vec::new()),
        }
    }

    /// Get all calculation calls made as (player_rating, opponent_average, won)
    pub fn get_calculation_calls(&self) -> Vec<(f64, f64, bool)> {
        self.calculation_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl RatingCalculator for MockRatingCalculator {
    fn calculate_rating_change(
        &self,
        player_rating: f64,
        opponent_average: f64,
        won: bool,
    ) -> f64 {
        if let Ok(mut calls) = self.calculation_calls.lock() {
            calls.push((player_rating, opponent_average, won));
        }

        if won {
            self.win_change
        } else {
            self.loss_change
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
