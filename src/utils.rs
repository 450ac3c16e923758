//! Utility functions for the rating engine

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::Player;

/// Generate a new unique player ID
pub fn generate_player_id() -> String {
    Uuid::new_v4().to_string()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Arithmetic mean of the players' ratings, 0.0 for an empty team
pub fn team_average(players: &[Player]) -> f64 {
    if players.is_empty() {
        return 0.0;
    }
    players.iter().map(|p| p.rating).sum::<f64>() / players.len() as f64
}

/// Shrink `change` so that `rating + change` stays inside `[min, max]`
pub fn clamp_change(rating: f64, change: f64, min: f64, max: f64) -> f64 {
    let target = rating + change;
    if target > max {
        max - rating
    } else if target < min {
        min - rating
    } else {
        change
    }
}
