//! The rating engine
//!
//! Owns the daily change ledger and applies match outcomes to player records
//! handed in by the caller. Player storage stays with the caller; the engine
//! only mutates `rating` and `rating_history` on the records it is given.

use crate::config::RatingConfig;
use crate::error::{RatingError, Result};
use crate::metrics::MetricsCollector;
use crate::rating::calculator::{RatingCalculator, TieredRatingCalculator};
use crate::rating::ledger::{DailyChangeLedger, LedgerSnapshot};
use crate::rating::trial;
use crate::types::{
    AppliedChange, DoublesMatch, HistoryKind, Player, PlayerId, PlayerRatingUpdate,
    SettlementResult, TeamSide, TrialResult,
};
use crate::utils::{current_timestamp, team_average};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

const PLAYERS_PER_TEAM: usize = 2;

pub struct RatingEngine {
    config: RatingConfig,
    calculator: Arc<dyn RatingCalculator>,
    ledger: Mutex<DailyChangeLedger>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl RatingEngine {
    /// Create an engine using the step-table calculator described by `config`
    pub fn new(config: RatingConfig) -> Result<Self> {
        let calculator = Arc::new(TieredRatingCalculator::new(&config));
        Self::with_calculator(config, calculator)
    }

    /// Create an engine with a custom calculator
    pub fn with_calculator(
        config: RatingConfig,
        calculator: Arc<dyn RatingCalculator>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            ledger: Mutex::new(DailyChangeLedger::new(config.daily_change_limit)),
            config,
            calculator,
            metrics: None,
        })
    }

    /// Attach a metrics collector
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    /// Initial rating for a new player from their trial matches.
    ///
    /// Does not persist anything; the caller creates the player record and its
    /// first history entry.
    pub fn initialize_rating(&self, trials: &[TrialResult]) -> Result<f64> {
        let rating = trial::initial_rating(trials, &self.config.trial, self.config.min_rating)?;
        debug!(
            "Initial rating {:.2} from {} trials ({:?} formula)",
            rating,
            trials.len(),
            self.config.trial.formula
        );
        Ok(rating)
    }

    /// Proposed change for one player, already kept inside the global bounds
    pub fn calculate_rating_change(
        &self,
        player_rating: f64,
        opponent_average: f64,
        won: bool,
    ) -> f64 {
        self.calculator
            .calculate_rating_change(player_rating, opponent_average, won)
    }

    /// Apply `proposed_change` to the player now, see [`Self::apply_rating_change_at`]
    pub fn apply_rating_change(
        &self,
        player: &mut Player,
        proposed_change: f64,
    ) -> Result<AppliedChange> {
        self.apply_rating_change_at(player, proposed_change, current_timestamp())
    }

    /// Apply a change through the daily cap and the global bounds.
    ///
    /// The day is the UTC calendar date of `now`. On success the player's
    /// rating is updated and one history entry is appended. Dates before the
    /// ledger's retention window are rejected, since their totals may already
    /// have been pruned.
    pub fn apply_rating_change_at(
        &self,
        player: &mut Player,
        proposed_change: f64,
        now: DateTime<Utc>,
    ) -> Result<AppliedChange> {
        ensure_finite("proposed change", proposed_change)?;
        self.ensure_rating_in_range(player)?;

        let today = now.date_naive();
        let mut ledger = self.lock_ledger()?;
        self.ensure_within_window(&ledger, today)?;
        self.advance_ledger(&mut ledger, today);

        Ok(self.apply_with_ledger(&mut ledger, player, proposed_change, now))
    }

    /// Settle a completed doubles match now, see [`Self::settle_match_at`]
    pub fn settle_match(&self, doubles: &mut DoublesMatch) -> Result<SettlementResult> {
        self.settle_match_at(doubles, current_timestamp())
    }

    /// Update all four players' ratings from a completed match.
    ///
    /// Both team averages are taken from the pre-match ratings. The match is
    /// fully validated before any rating or ledger entry changes, and the
    /// ledger stays locked until all four updates are applied.
    pub fn settle_match_at(
        &self,
        doubles: &mut DoublesMatch,
        now: DateTime<Utc>,
    ) -> Result<SettlementResult> {
        let timer = self.metrics.as_ref().map(|metrics| metrics.start_timer());
        let today = now.date_naive();

        let mut ledger = self.lock_ledger()?;
        let checked = self.validate_match(doubles).and_then(|winner| {
            self.ensure_within_window(&ledger, today)?;
            Ok(winner)
        });
        let winner = match checked {
            Ok(winner) => winner,
            Err(err) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_match_rejected("invalid_input");
                }
                return Err(err);
            }
        };

        let team1_average = team_average(&doubles.team1);
        let team2_average = team_average(&doubles.team2);
        let average_of = |side: TeamSide| match side {
            TeamSide::Team1 => team1_average,
            TeamSide::Team2 => team2_average,
        };

        // Every proposal comes from pre-match ratings and is checked before
        // the first update lands.
        let mut proposals = Vec::with_capacity(PLAYERS_PER_TEAM * 2);
        for side in [TeamSide::Team1, TeamSide::Team2] {
            let won = side == winner;
            let opponent_average = average_of(side.opponent());
            for player in doubles.team(side) {
                let proposed = self.calculate_rating_change(player.rating, opponent_average, won);
                ensure_finite(&format!("proposed change for player {}", player.id), proposed)?;
                proposals.push((side, won, proposed));
            }
        }

        self.advance_ledger(&mut ledger, today);

        let mut updates = Vec::with_capacity(proposals.len());
        let players = doubles.team1.iter_mut().chain(doubles.team2.iter_mut());
        for (player, (side, won, proposed_change)) in players.zip(proposals) {
            let old_rating = player.rating;
            let applied = self.apply_with_ledger(&mut ledger, player, proposed_change, now);

            updates.push(PlayerRatingUpdate {
                player_id: player.id.clone(),
                side,
                won,
                old_rating,
                new_rating: applied.new_rating,
                proposed_change,
                actual_change: applied.actual_change,
            });
        }
        drop(ledger);

        info!(
            "Settled match: {} won ({:.2} vs {:.2} average) using {} calculator",
            winner,
            team1_average,
            team2_average,
            self.calculator.name()
        );
        if let (Some(metrics), Some(timer)) = (&self.metrics, timer) {
            metrics.record_match_settled(timer.stop());
        }

        Ok(SettlementResult {
            winner,
            team1_average,
            team2_average,
            updates,
            settled_at: now,
        })
    }

    /// Net change already applied to a player on `date`
    pub fn daily_total(&self, player_id: &str, date: NaiveDate) -> Result<f64> {
        Ok(self.lock_ledger()?.daily_total(player_id, date))
    }

    /// Capture the players' ledger totals for `date` before a settlement
    pub fn ledger_snapshot(
        &self,
        player_ids: &[PlayerId],
        date: NaiveDate,
    ) -> Result<LedgerSnapshot> {
        Ok(self.lock_ledger()?.snapshot(player_ids, date))
    }

    /// Undo ledger changes made since `snapshot` was taken
    pub fn restore_ledger(&self, snapshot: LedgerSnapshot) -> Result<()> {
        self.lock_ledger()?.restore(snapshot);
        Ok(())
    }

    /// Drop ledger entries outside the retention window ending on `today`
    pub fn prune_ledger(&self, today: NaiveDate) -> Result<usize> {
        let mut ledger = self.lock_ledger()?;
        let pruned = ledger.prune_through(today, self.config.ledger_retention_days);
        if let Some(metrics) = &self.metrics {
            metrics.record_ledger_state(ledger.len(), pruned);
        }
        Ok(pruned)
    }

    /// Number of (player, day) entries held in the ledger
    pub fn ledger_len(&self) -> Result<usize> {
        Ok(self.lock_ledger()?.len())
    }

    fn lock_ledger(&self) -> Result<MutexGuard<'_, DailyChangeLedger>> {
        self.ledger
            .lock()
            .map_err(|_| RatingError::internal("Failed to acquire daily ledger lock").into())
    }

    fn advance_ledger(&self, ledger: &mut DailyChangeLedger, today: NaiveDate) {
        let pruned = ledger.prune_stale(today, self.config.ledger_retention_days);
        if pruned > 0 {
            debug!("Pruned {} stale daily ledger entries", pruned);
            if let Some(metrics) = &self.metrics {
                metrics.record_ledger_state(ledger.len(), pruned);
            }
        }
    }

    /// Cap, clamp and record one change. Inputs are already validated.
    fn apply_with_ledger(
        &self,
        ledger: &mut DailyChangeLedger,
        player: &mut Player,
        proposed_change: f64,
        now: DateTime<Utc>,
    ) -> AppliedChange {
        let today = now.date_naive();
        let current = player.rating;

        let effective_change = ledger.cap(&player.id, today, proposed_change);
        let new_rating =
            (current + effective_change).clamp(self.config.min_rating, self.config.max_rating);
        let actual_change = new_rating - current;
        ledger.record(&player.id, today, actual_change);

        player.rating = new_rating;
        player.record_snapshot(now, HistoryKind::Match);

        if effective_change != proposed_change {
            warn!(
                "Daily cap limited player {} change from {:+.3} to {:+.3}",
                player.id, proposed_change, effective_change
            );
            if let Some(metrics) = &self.metrics {
                metrics.record_daily_cap_hit();
            }
        }
        if (actual_change - effective_change).abs() > f64::EPSILON {
            warn!(
                "Rating bounds limited player {} change from {:+.3} to {:+.3}",
                player.id, effective_change, actual_change
            );
            if let Some(metrics) = &self.metrics {
                metrics.record_global_clamp_hit();
            }
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_rating_change(actual_change, new_rating);
            metrics.record_ledger_state(ledger.len(), 0);
        }

        debug!(
            "Player {} rating {:.3} -> {:.3} (proposed {:+.3}, effective {:+.3})",
            player.id, current, new_rating, proposed_change, effective_change
        );

        AppliedChange {
            new_rating,
            actual_change,
            effective_change,
        }
    }

    fn ensure_rating_in_range(&self, player: &Player) -> Result<()> {
        let (min, max) = (self.config.min_rating, self.config.max_rating);
        if min <= player.rating && player.rating <= max {
            Ok(())
        } else {
            Err(RatingError::invalid_input(format!(
                "Rating {} of player {} is outside [{}, {}]",
                player.rating, player.id, min, max
            ))
            .into())
        }
    }

    fn ensure_within_window(&self, ledger: &DailyChangeLedger, date: NaiveDate) -> Result<()> {
        let retention = self.config.ledger_retention_days;
        if ledger.accepts(date, retention) {
            return Ok(());
        }
        Err(RatingError::invalid_input(format!(
            "Change dated {} is before the daily ledger window starting {}",
            date,
            ledger.window_start(retention).unwrap_or(date)
        ))
        .into())
    }

    /// Check team shapes, winner presence, player uniqueness and rating range
    fn validate_match(&self, doubles: &DoublesMatch) -> Result<TeamSide> {
        let winner = doubles
            .winner
            .ok_or_else(|| RatingError::invalid_input("Match has no winner"))?;

        for side in [TeamSide::Team1, TeamSide::Team2] {
            let team = doubles.team(side);
            if team.len() != PLAYERS_PER_TEAM {
                return Err(RatingError::invalid_input(format!(
                    "{} has {} players, expected {}",
                    side,
                    team.len(),
                    PLAYERS_PER_TEAM
                ))
                .into());
            }
        }

        let mut seen = HashSet::new();
        for player in doubles.team1.iter().chain(doubles.team2.iter()) {
            if !seen.insert(player.id.as_str()) {
                return Err(RatingError::invalid_input(format!(
                    "Player {} appears more than once in the match",
                    player.id
                ))
                .into());
            }
            self.ensure_rating_in_range(player)?;
        }

        Ok(winner)
    }
}

impl std::fmt::Debug for RatingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RatingEngine")
            .field("config", &self.config)
            .field("calculator", &self.calculator.name())
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

fn ensure_finite(what: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(RatingError::invalid_input(format!(
            "{} is not a finite number: {}",
            what, value
        ))
        .into())
    }
}
