//! Test fixtures and mock implementations for integration testing

use chrono::{DateTime, TimeZone, Utc};
use padel_rating::error::Result;
use padel_rating::rating::{InMemoryPlayerStore, PlayerStore};
use padel_rating::types::{Player, PlayerId};
use std::collections::HashMap;
use std::sync::Mutex;

/// Noon UTC on the given day of June 2024
pub fn noon(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0).unwrap()
}

/// Eight club players spread across the scale
pub fn club_roster() -> Vec<Player> {
    vec![
        Player::new("ana", "Ana", 5.0),
        Player::new("bruno", "Bruno", 5.0),
        Player::new("carla", "Carla", 3.0),
        Player::new("diego", "Diego", 3.0),
        Player::new("elena", "Elena", 6.9),
        Player::new("fede", "Fede", 6.95),
        Player::new("gala", "Gala", 0.1),
        Player::new("hugo", "Hugo", 0.05),
    ]
}

/// Player store that records every write for inspection
#[derive(Debug, Default)]
pub struct RecordingPlayerStore {
    inner: InMemoryPlayerStore,
    writes: Mutex<Vec<Vec<PlayerId>>>,
}

impl RecordingPlayerStore {
    pub fn with_players(players: Vec<Player>) -> Self {
        Self {
            inner: InMemoryPlayerStore::with_players(players),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Ids written by each store call, in call order
    pub fn get_writes(&self) -> Vec<Vec<PlayerId>> {
        self.writes
            .lock()
            .map(|writes| writes.clone())
            .unwrap_or_default()
    }

    fn record_write(&self, ids: Vec<PlayerId>) {
        if let Ok(mut writes) = self.writes.lock() {
            writes.push(ids);
        }
    }
}

impl PlayerStore for RecordingPlayerStore {
    fn get_player(&self, player_id: &str) -> Result<Option<Player>> {
        self.inner.get_player(player_id)
    }

    fn get_players(&self, player_ids: &[PlayerId]) -> Result<HashMap<PlayerId, Player>> {
        self.inner.get_players(player_ids)
    }

    fn store_player(&self, player: Player) -> Result<()> {
        self.record_write(vec![player.id.clone()]);
        self.inner.store_player(player)
    }

    fn store_players(&self, players: Vec<Player>) -> Result<()> {
        self.record_write(players.iter().map(|p| p.id.clone()).collect());
        self.inner.store_players(players)
    }

    fn get_all_players(&self) -> Result<Vec<Player>> {
        self.inner.get_all_players()
    }

    fn remove_player(&self, player_id: &str) -> Result<bool> {
        self.inner.remove_player(player_id)
    }

    fn get_players_by_rating_range(
        &self,
        min_rating: f64,
        max_rating: f64,
        limit: Option<usize>,
    ) -> Result<Vec<Player>> {
        self.inner
            .get_players_by_rating_range(min_rating, max_rating, limit)
    }

    fn get_player_count(&self) -> Result<usize> {
        self.inner.get_player_count()
    }
}
