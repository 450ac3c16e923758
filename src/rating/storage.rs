//! Player storage interface and implementations
//!
//! The engine never owns player records. This trait is the seam to whatever
//! persists them; the service reads the affected players by id, settles, and
//! writes them back.

use crate::error::{RatingError, Result};
use crate::types::{Player, PlayerId};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Trait for player storage operations
#[cfg_attr(test, mockall::automock)]
pub trait PlayerStore: Send + Sync {
    /// Get a player by id
    fn get_player(&self, player_id: &str) -> Result<Option<Player>>;

    /// Get several players; ids without a record are absent from the map
    fn get_players(&self, player_ids: &[PlayerId]) -> Result<HashMap<PlayerId, Player>>;

    /// Store or replace a player
    fn store_player(&self, player: Player) -> Result<()>;

    /// Store several players in one write
    fn store_players(&self, players: Vec<Player>) -> Result<()>;

    /// Get every stored player
    fn get_all_players(&self) -> Result<Vec<Player>>;

    /// Remove a player, returning whether one existed
    fn remove_player(&self, player_id: &str) -> Result<bool>;

    /// Players with `min_rating <= rating <= max_rating`, highest rating first
    fn get_players_by_rating_range(
        &self,
        min_rating: f64,
        max_rating: f64,
        limit: Option<usize>,
    ) -> Result<Vec<Player>>;

    /// Get total number of stored players
    fn get_player_count(&self) -> Result<usize>;
}

/// In-memory player storage implementation
#[derive(Debug, Default)]
pub struct InMemoryPlayerStore {
    players: RwLock<HashMap<PlayerId, Player>>,
}

impl InMemoryPlayerStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `players`
    pub fn with_players(players: impl IntoIterator<Item = Player>) -> Self {
        let players = players
            .into_iter()
            .map(|player| (player.id.clone(), player))
            .collect();
        Self {
            players: RwLock::new(players),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<PlayerId, Player>>> {
        self.players
            .read()
            .map_err(|_| RatingError::internal("Failed to acquire players read lock").into())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<PlayerId, Player>>> {
        self.players
            .write()
            .map_err(|_| RatingError::internal("Failed to acquire players write lock").into())
    }
}

/// Sort by rating, highest first
pub fn sort_by_rating_desc(players: &mut [Player]) {
    players.sort_by(|a, b| {
        b.rating
            .partial_cmp(&a.rating)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}

impl PlayerStore for InMemoryPlayerStore {
    fn get_player(&self, player_id: &str) -> Result<Option<Player>> {
        Ok(self.read()?.get(player_id).cloned())
    }

    fn get_players(&self, player_ids: &[PlayerId]) -> Result<HashMap<PlayerId, Player>> {
        let players = self.read()?;

        let mut result = HashMap::new();
        for player_id in player_ids {
            if let Some(player) = players.get(player_id) {
                result.insert(player_id.clone(), player.clone());
            }
        }

        Ok(result)
    }

    fn store_player(&self, player: Player) -> Result<()> {
        self.write()?.insert(player.id.clone(), player);
        Ok(())
    }

    fn store_players(&self, players: Vec<Player>) -> Result<()> {
        let mut stored = self.write()?;
        for player in players {
            stored.insert(player.id.clone(), player);
        }
        Ok(())
    }

    fn get_all_players(&self) -> Result<Vec<Player>> {
        Ok(self.read()?.values().cloned().collect())
    }

    fn remove_player(&self, player_id: &str) -> Result<bool> {
        Ok(self.write()?.remove(player_id).is_some())
    }

    fn get_players_by_rating_range(
        &self,
        min_rating: f64,
        max_rating: f64,
        limit: Option<usize>,
    ) -> Result<Vec<Player>> {
        let mut matching: Vec<Player> = self
            .read()?
            .values()
            .filter(|player| player.rating >= min_rating && player.rating <= max_rating)
            .cloned()
            .collect();

        sort_by_rating_desc(&mut matching);

        if let Some(limit) = limit {
            matching.truncate(limit);
        }

        Ok(matching)
    }

    fn get_player_count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, rating: f64) -> Player {
        Player::new(id, id.to_uppercase(), rating)
    }

    #[test]
    fn test_basic_operations() {
        let store = InMemoryPlayerStore::new();

        assert!(store.get_player("p1").unwrap().is_none());

        store.store_player(player("p1", 3.5)).unwrap();

        let retrieved = store.get_player("p1").unwrap().unwrap();
        assert_eq!(retrieved.id, "p1");
        assert_eq!(retrieved.rating, 3.5);
        assert_eq!(store.get_player_count().unwrap(), 1);
    }

    #[test]
    fn test_store_replaces_existing_record() {
        let store = InMemoryPlayerStore::with_players(vec![player("p1", 3.5)]);
        store.store_player(player("p1", 3.6)).unwrap();

        assert_eq!(store.get_player_count().unwrap(), 1);
        assert_eq!(store.get_player("p1").unwrap().unwrap().rating, 3.6);
    }

    #[test]
    fn test_bulk_operations() {
        let store = InMemoryPlayerStore::new();
        store
            .store_players(vec![player("p1", 1.0), player("p2", 2.0), player("p3", 3.0)])
            .unwrap();

        let ids = vec!["p1".to_string(), "p3".to_string(), "missing".to_string()];
        let retrieved = store.get_players(&ids).unwrap();

        assert_eq!(retrieved.len(), 2);
        assert!(retrieved.contains_key("p1"));
        assert!(retrieved.contains_key("p3"));
        assert_eq!(store.get_all_players().unwrap().len(), 3);
    }

    #[test]
    fn test_rating_range_query() {
        let store = InMemoryPlayerStore::with_players(vec![
            player("p1", 1.5),
            player("p2", 2.5),
            player("p3", 3.5),
            player("p4", 4.5),
        ]);

        let in_range = store.get_players_by_rating_range(2.0, 4.0, None).unwrap();
        assert_eq!(in_range.len(), 2);
        assert_eq!(in_range[0].id, "p3");
        assert_eq!(in_range[1].id, "p2");

        let limited = store.get_players_by_rating_range(0.0, 7.0, Some(1)).unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, "p4");
    }

    #[test]
    fn test_player_removal() {
        let store = InMemoryPlayerStore::with_players(vec![player("p1", 2.0)]);

        assert!(store.remove_player("p1").unwrap());
        assert!(store.get_player("p1").unwrap().is_none());
        assert!(!store.remove_player("nonexistent").unwrap());
    }

    #[test]
    fn test_sort_breaks_ties_by_id() {
        let mut players = vec![player("b", 3.0), player("a", 3.0), player("c", 4.0)];
        sort_by_rating_desc(&mut players);
        let ids: Vec<_> = players.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
