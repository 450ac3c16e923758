//! Registration and match recording on top of the rating engine
//!
//! The service is the engine's caller: it loads the affected players from a
//! [`PlayerStore`], lets the engine mutate them and writes them back. Updates
//! touching the same player are serialized by a per-player lock table;
//! matches with disjoint players run in parallel.

use crate::error::{RatingError, Result};
use crate::metrics::MetricsCollector;
use crate::rating::engine::RatingEngine;
use crate::rating::storage::PlayerStore;
use crate::types::{
    DoublesMatch, MatchRecord, Player, PlayerId, RatingHistoryEntry, SettlementResult,
    TrialResult,
};
use crate::utils::{current_timestamp, generate_player_id};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Lock table with one mutex per player currently being updated
#[derive(Debug, Default)]
struct PlayerLocks {
    table: Mutex<HashMap<PlayerId, Arc<Mutex<()>>>>,
}

impl PlayerLocks {
    fn handles(&self, ordered_ids: &[&PlayerId]) -> Result<Vec<Arc<Mutex<()>>>> {
        let mut table = self
            .table
            .lock()
            .map_err(|_| RatingError::internal("Failed to acquire player lock table"))?;
        Ok(ordered_ids
            .iter()
            .map(|id| table.entry((*id).clone()).or_default().clone())
            .collect())
    }

    /// Forget locks nobody else holds a handle to
    fn release(&self, ids: &[&PlayerId]) -> Result<()> {
        let mut table = self
            .table
            .lock()
            .map_err(|_| RatingError::internal("Failed to acquire player lock table"))?;
        for id in ids {
            if table.get(*id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
                table.remove(*id);
            }
        }
        Ok(())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table.lock().map(|t| t.len()).unwrap_or_default()
    }
}

pub struct RatingService {
    engine: Arc<RatingEngine>,
    store: Arc<dyn PlayerStore>,
    locks: PlayerLocks,
    metrics: Option<Arc<MetricsCollector>>,
}

impl RatingService {
    pub fn new(engine: Arc<RatingEngine>, store: Arc<dyn PlayerStore>) -> Self {
        Self {
            engine,
            store,
            locks: PlayerLocks::default(),
            metrics: None,
        }
    }

    /// Attach a metrics collector
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn engine(&self) -> &RatingEngine {
        &self.engine
    }

    /// Register a new player under a generated id
    pub fn register_player(&self, name: &str, trials: &[TrialResult]) -> Result<Player> {
        self.register_player_with_id(&generate_player_id(), name, trials, current_timestamp())
    }

    /// Register a new player whose rating comes from the trial matches
    pub fn register_player_with_id(
        &self,
        player_id: &str,
        name: &str,
        trials: &[TrialResult],
        now: DateTime<Utc>,
    ) -> Result<Player> {
        let rating = self.engine.initialize_rating(trials)?;
        let id = player_id.to_string();

        let player = self.with_player_locks(std::slice::from_ref(&id), || {
            if self.store.get_player(player_id)?.is_some() {
                return Err(RatingError::PlayerAlreadyExists {
                    player_id: player_id.to_string(),
                }
                .into());
            }
            let player = Player::with_initial_rating(player_id, name, rating, now);
            self.store.store_player(player.clone())?;
            Ok(player)
        })?;

        info!(
            "Registered player {} ({}) with initial rating {:.2}",
            player.id, player.name, player.rating
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_player_registered();
        }
        Ok(player)
    }

    /// Record a finished match now
    pub fn record_match(&self, record: &MatchRecord) -> Result<SettlementResult> {
        self.record_match_at(record, current_timestamp())
    }

    /// Load the match's players, settle it and persist the updated records
    pub fn record_match_at(
        &self,
        record: &MatchRecord,
        now: DateTime<Utc>,
    ) -> Result<SettlementResult> {
        let ids: Vec<PlayerId> = record.player_ids().cloned().collect();

        self.with_player_locks(&ids, || {
            let mut loaded = self.store.get_players(&ids)?;

            let mut take_team = |team: &[PlayerId]| -> Result<Vec<Player>> {
                let mut players = Vec::with_capacity(team.len());
                for id in team {
                    // A repeated id falls through to a second lookup; the
                    // engine rejects the duplicate during validation.
                    let player = match loaded.remove(id) {
                        Some(player) => player,
                        None => self.store.get_player(id)?.ok_or_else(|| {
                            RatingError::PlayerNotFound {
                                player_id: id.clone(),
                            }
                        })?,
                    };
                    players.push(player);
                }
                Ok(players)
            };

            let team1 = take_team(&record.team1);
            let team2 = take_team(&record.team2);
            let (team1, team2) = match (team1, team2) {
                (Ok(team1), Ok(team2)) => (team1, team2),
                (Err(err), _) | (_, Err(err)) => {
                    warn!("Rejected match: {}", err);
                    if let Some(metrics) = &self.metrics {
                        metrics.record_match_rejected("player_not_found");
                    }
                    return Err(err);
                }
            };

            let mut doubles = DoublesMatch {
                team1,
                team2,
                winner: record.winner,
            };
            let snapshot = self.engine.ledger_snapshot(&ids, now.date_naive())?;
            let result = self.engine.settle_match_at(&mut doubles, now)?;

            let DoublesMatch { team1, team2, .. } = doubles;
            if let Err(err) = self
                .store
                .store_players(team1.into_iter().chain(team2).collect())
            {
                warn!("Failed to persist settled match, restoring daily ledger: {}", err);
                self.engine.restore_ledger(snapshot)?;
                return Err(err);
            }

            Ok(result)
        })
    }

    /// Players ordered by rating, highest first
    pub fn leaderboard(&self, limit: Option<usize>) -> Result<Vec<Player>> {
        let config = self.engine.config();
        self.store
            .get_players_by_rating_range(config.min_rating, config.max_rating, limit)
    }

    /// Full rating history of a player
    pub fn player_history(&self, player_id: &str) -> Result<Vec<RatingHistoryEntry>> {
        self.store
            .get_player(player_id)?
            .map(|player| player.rating_history)
            .ok_or_else(|| {
                RatingError::PlayerNotFound {
                    player_id: player_id.to_string(),
                }
                .into()
            })
    }

    /// Run `operation` while holding the locks of every listed player.
    ///
    /// Locks are taken in sorted id order so overlapping callers cannot deadlock.
    fn with_player_locks<T>(
        &self,
        ids: &[PlayerId],
        operation: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let mut ordered: Vec<&PlayerId> = ids.iter().collect();
        ordered.sort();
        ordered.dedup();

        let handles = self.locks.handles(&ordered)?;
        let result = {
            let _guards = handles
                .iter()
                .map(|lock| {
                    lock.lock().map_err(|_| {
                        anyhow::Error::from(RatingError::internal("Player lock poisoned"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            operation()
        };
        drop(handles);

        self.locks.release(&ordered)?;
        result
    }
}
