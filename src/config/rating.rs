//! Rating engine configuration
//!
//! Defaults reproduce the club's published rules: a 0-7 scale, a net daily
//! movement of at most 0.3 and new players seeded into the 0-3 band.

use crate::error::{RatingError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How the initial rating is derived from the trial matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialFormula {
    /// Fixed bonus per win, fixed penalty per loss
    #[default]
    Flat,
    /// Adjustment depends on whether the trial opponent was stronger
    OpponentRelative,
}

impl FromStr for TrialFormula {
    type Err = RatingError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flat" => Ok(TrialFormula::Flat),
            "opponent_relative" | "opponent-relative" => Ok(TrialFormula::OpponentRelative),
            other => Err(RatingError::ConfigurationError {
                message: format!("Unknown trial formula: {}", other),
            }),
        }
    }
}

/// Magnitude of a match rating change, by outcome and relative opponent strength.
///
/// Loss entries are magnitudes; the calculator applies them negatively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeTable {
    pub win_vs_stronger: f64,
    pub win_vs_equal: f64,
    pub win_vs_weaker: f64,
    pub loss_vs_stronger: f64,
    pub loss_vs_equal: f64,
    pub loss_vs_weaker: f64,
}

impl Default for ChangeTable {
    fn default() -> Self {
        Self {
            win_vs_stronger: 0.15,
            win_vs_equal: 0.10,
            win_vs_weaker: 0.05,
            loss_vs_stronger: 0.05,
            loss_vs_equal: 0.10,
            loss_vs_weaker: 0.15,
        }
    }
}

impl ChangeTable {
    fn magnitudes(&self) -> [f64; 6] {
        [
            self.win_vs_stronger,
            self.win_vs_equal,
            self.win_vs_weaker,
            self.loss_vs_stronger,
            self.loss_vs_equal,
            self.loss_vs_weaker,
        ]
    }
}

/// Parameters of the trial-match onboarding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialConfig {
    /// Number of trial results required
    pub match_count: usize,
    /// Starting point, the midpoint of the beginner band
    pub base_rating: f64,
    pub win_adjustment: f64,
    pub loss_adjustment: f64,
    /// New players never start above this
    pub max_initial_rating: f64,
    pub formula: TrialFormula,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            match_count: 3,
            base_rating: 1.5,
            win_adjustment: 0.5,
            loss_adjustment: 0.25,
            max_initial_rating: 3.0,
            formula: TrialFormula::Flat,
        }
    }
}

/// Rating system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    pub min_rating: f64,
    pub max_rating: f64,
    /// Largest net movement allowed per player per calendar day
    pub daily_change_limit: f64,
    /// Number of calendar days (today included) kept in the daily ledger
    pub ledger_retention_days: u32,
    pub change_table: ChangeTable,
    pub trial: TrialConfig,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            min_rating: 0.0,
            max_rating: 7.0,
            daily_change_limit: 0.3,
            ledger_retention_days: 2,
            change_table: ChangeTable::default(),
            trial: TrialConfig::default(),
        }
    }
}

impl RatingConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        let bounds = [self.min_rating, self.max_rating, self.daily_change_limit];
        if bounds.iter().any(|v| !v.is_finite()) {
            return Err(config_error("Rating bounds and daily limit must be finite"));
        }

        if self.min_rating >= self.max_rating {
            return Err(config_error(format!(
                "Minimum rating {} must be below maximum rating {}",
                self.min_rating, self.max_rating
            )));
        }

        if self.daily_change_limit <= 0.0 {
            return Err(config_error("Daily change limit must be positive"));
        }

        if self.ledger_retention_days == 0 {
            return Err(config_error("Ledger retention must be at least one day"));
        }

        if self
            .change_table
            .magnitudes()
            .iter()
            .any(|m| !m.is_finite() || *m < 0.0)
        {
            return Err(config_error(
                "Change table entries must be finite and non-negative",
            ));
        }

        let trial = &self.trial;
        if trial.match_count == 0 {
            return Err(config_error("Trial match count must be greater than 0"));
        }
        if [trial.win_adjustment, trial.loss_adjustment]
            .iter()
            .any(|a| !a.is_finite() || *a < 0.0)
        {
            return Err(config_error("Trial adjustments must be finite and non-negative"));
        }
        if !(self.min_rating <= trial.base_rating
            && trial.base_rating <= trial.max_initial_rating
            && trial.max_initial_rating <= self.max_rating)
        {
            return Err(config_error(format!(
                "Trial ratings must satisfy {} <= base {} <= ceiling {} <= {}",
                self.min_rating, trial.base_rating, trial.max_initial_rating, self.max_rating
            )));
        }

        Ok(())
    }
}

fn config_error(message: impl Into<String>) -> anyhow::Error {
    RatingError::ConfigurationError {
        message: message.into(),
    }
    .into()
}
