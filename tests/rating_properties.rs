//! Property tests for the rating engine invariants

mod fixtures;

use chrono::Duration;
use fixtures::noon;
use padel_rating::config::{RatingConfig, TrialConfig, TrialFormula};
use padel_rating::rating::RatingEngine;
use padel_rating::types::{DoublesMatch, Player, TeamSide, TrialResult};
use proptest::prelude::*;
use std::collections::HashMap;

// Accumulated float error over a few dozen additions
const TOLERANCE: f64 = 1e-9;

fn engine() -> RatingEngine {
    RatingEngine::new(RatingConfig::default()).unwrap()
}

fn step() -> impl Strategy<Value = (f64, i64)> {
    // (proposed change, hours after the first update)
    (-1.0f64..1.0, 0i64..96)
}

proptest! {
    #[test]
    fn rating_never_leaves_scale(
        start in 0.0f64..=7.0,
        mut steps in prop::collection::vec(step(), 1..40),
    ) {
        let engine = engine();
        let mut player = Player::new("p", "", start);
        steps.sort_by_key(|(_, hours)| *hours);

        for (change, hours) in steps {
            let now = noon(1) + Duration::hours(hours);
            let applied = engine.apply_rating_change_at(&mut player, change, now).unwrap();
            prop_assert!((0.0..=7.0).contains(&applied.new_rating));
            prop_assert_eq!(applied.new_rating, player.rating);
        }
    }

    #[test]
    fn net_daily_movement_is_capped(
        start in 0.0f64..=7.0,
        mut steps in prop::collection::vec(step(), 1..40),
    ) {
        let engine = engine();
        let mut player = Player::new("p", "", start);
        steps.sort_by_key(|(_, hours)| *hours);

        let mut per_day: HashMap<_, f64> = HashMap::new();
        for (change, hours) in steps {
            let now = noon(1) + Duration::hours(hours);
            let applied = engine.apply_rating_change_at(&mut player, change, now).unwrap();
            *per_day.entry(now.date_naive()).or_default() += applied.actual_change;
        }

        for (date, total) in per_day {
            prop_assert!(
                total.abs() <= 0.3 + TOLERANCE,
                "net change {} on {}", total, date
            );
        }
    }

    #[test]
    fn history_grows_by_one_per_change(
        start in 0.0f64..=7.0,
        changes in prop::collection::vec(-0.5f64..0.5, 0..30),
    ) {
        let engine = engine();
        let mut player = Player::with_initial_rating("p", "", start, noon(1));
        let mut applied_ratings = vec![start];

        for (i, change) in changes.iter().enumerate() {
            let now = noon(1) + Duration::minutes(i as i64);
            let applied = engine.apply_rating_change_at(&mut player, *change, now).unwrap();
            applied_ratings.push(applied.new_rating);
        }

        prop_assert_eq!(player.rating_history.len(), 1 + changes.len());
        let recorded: Vec<f64> = player.rating_history.iter().map(|e| e.rating).collect();
        prop_assert_eq!(recorded, applied_ratings);
        prop_assert!(player
            .rating_history
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn apply_is_deterministic(
        start in 0.0f64..=7.0,
        prior in prop::collection::vec(-0.2f64..0.2, 0..5),
        change in -1.0f64..1.0,
    ) {
        let run = || {
            let engine = engine();
            let mut player = Player::new("p", "", start);
            for c in &prior {
                engine.apply_rating_change_at(&mut player, *c, noon(1)).unwrap();
            }
            engine.apply_rating_change_at(&mut player, change, noon(1)).unwrap()
        };

        prop_assert_eq!(run(), run());
    }

    #[test]
    fn flat_trial_rating_in_new_player_band(wins in prop::array::uniform3(any::<bool>())) {
        let trials: Vec<TrialResult> = wins
            .iter()
            .map(|won| if *won { TrialResult::won() } else { TrialResult::lost() })
            .collect();
        let rating = engine().initialize_rating(&trials).unwrap();
        prop_assert!((0.0..=3.0).contains(&rating));
    }

    #[test]
    fn relative_trial_rating_in_new_player_band(
        trials in prop::array::uniform3((any::<bool>(), 0.0f64..=7.0)),
    ) {
        let config = RatingConfig {
            trial: TrialConfig {
                formula: TrialFormula::OpponentRelative,
                ..Default::default()
            },
            ..Default::default()
        };
        let engine = RatingEngine::new(config).unwrap();
        let trials: Vec<TrialResult> = trials
            .iter()
            .map(|(won, opponent)| TrialResult::against(*won, *opponent))
            .collect();

        let rating = engine.initialize_rating(&trials).unwrap();
        prop_assert!((0.0..=3.0).contains(&rating));
    }

    #[test]
    fn settlement_moves_winners_up_and_losers_down(
        ratings in prop::array::uniform4(0.0f64..=7.0),
        team1_wins in any::<bool>(),
    ) {
        let engine = engine();
        let winner = if team1_wins { TeamSide::Team1 } else { TeamSide::Team2 };
        let mut game = DoublesMatch::new(
            vec![Player::new("a", "", ratings[0]), Player::new("b", "", ratings[1])],
            vec![Player::new("c", "", ratings[2]), Player::new("d", "", ratings[3])],
            winner,
        );

        let result = engine.settle_match_at(&mut game, noon(1)).unwrap();

        prop_assert_eq!(result.updates.len(), 4);
        for update in &result.updates {
            prop_assert!((0.0..=7.0).contains(&update.new_rating));
            if update.won {
                prop_assert!(update.actual_change >= 0.0);
            } else {
                prop_assert!(update.actual_change <= 0.0);
            }
            prop_assert!(update.actual_change.abs() <= 0.15 + TOLERANCE);
        }
    }
}
