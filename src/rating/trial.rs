//! Initial rating assignment from trial matches
//!
//! Two formulas exist and are selected by configuration. They are never
//! combined: a deployment picks one.

use crate::config::{TrialConfig, TrialFormula};
use crate::error::{RatingError, Result};
use crate::types::TrialResult;

// Opponent-relative adjustments, measured against the running rating.
const RELATIVE_WIN_VS_STRONGER: f64 = 0.5;
const RELATIVE_WIN_VS_WEAKER: f64 = 0.3;
const RELATIVE_LOSS_VS_STRONGER: f64 = 0.2;
const RELATIVE_LOSS_VS_WEAKER: f64 = 0.3;

/// Compute a new player's rating from exactly `config.match_count` trial results.
///
/// The result is clamped to `[min_rating, config.max_initial_rating]`.
pub fn initial_rating(
    trials: &[TrialResult],
    config: &TrialConfig,
    min_rating: f64,
) -> Result<f64> {
    if trials.len() != config.match_count {
        return Err(RatingError::invalid_input(format!(
            "Expected {} trial results, got {}",
            config.match_count,
            trials.len()
        ))
        .into());
    }

    let rating = match config.formula {
        TrialFormula::Flat => flat(trials, config),
        TrialFormula::OpponentRelative => opponent_relative(trials, config)?,
    };

    Ok(rating.clamp(min_rating, config.max_initial_rating))
}

fn flat(trials: &[TrialResult], config: &TrialConfig) -> f64 {
    trials.iter().fold(config.base_rating, |rating, trial| {
        if trial.won {
            rating + config.win_adjustment
        } else {
            rating - config.loss_adjustment
        }
    })
}

fn opponent_relative(trials: &[TrialResult], config: &TrialConfig) -> Result<f64> {
    let mut rating = config.base_rating;
    for (index, trial) in trials.iter().enumerate() {
        let opponent = match trial.opponent_rating {
            Some(r) if r.is_finite() => r,
            Some(r) => {
                return Err(RatingError::invalid_input(format!(
                    "Trial {} has non-finite opponent rating {}",
                    index + 1,
                    r
                ))
                .into())
            }
            None => {
                return Err(RatingError::invalid_input(format!(
                    "Trial {} is missing the opponent rating",
                    index + 1
                ))
                .into())
            }
        };

        let stronger = opponent >= rating;
        rating += match (trial.won, stronger) {
            (true, true) => RELATIVE_WIN_VS_STRONGER,
            (true, false) => RELATIVE_WIN_VS_WEAKER,
            (false, true) => -RELATIVE_LOSS_VS_STRONGER,
            (false, false) => -RELATIVE_LOSS_VS_WEAKER,
        };
    }
    Ok(rating)
}
