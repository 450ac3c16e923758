//! Per-player, per-day record of net rating movement
//!
//! The ledger is what enforces the daily cap. Entries are created lazily on
//! a player's first change of the day and dropped once they fall outside the
//! retention window. The window trails the latest date the ledger has seen,
//! so a date whose entries may already be gone is reported as outside it.

use crate::types::PlayerId;
use chrono::{Days, NaiveDate};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct DailyChangeLedger {
    entries: HashMap<(PlayerId, NaiveDate), f64>,
    limit: f64,
    latest: Option<NaiveDate>,
}

/// Daily totals of a set of players, taken so a failed write can be undone
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSnapshot {
    date: NaiveDate,
    totals: Vec<(PlayerId, Option<f64>)>,
}

impl DailyChangeLedger {
    /// Create an empty ledger enforcing a net daily movement of at most `limit`
    pub fn new(limit: f64) -> Self {
        Self {
            entries: HashMap::new(),
            limit,
            latest: None,
        }
    }

    /// Net change already applied to `player_id` on `date`, 0.0 if none
    pub fn daily_total(&self, player_id: &str, date: NaiveDate) -> f64 {
        self.entries
            .get(&(player_id.to_string(), date))
            .copied()
            .unwrap_or(0.0)
    }

    /// Reduce `proposed` so the day's running total stays within `[-limit, limit]`
    pub fn cap(&self, player_id: &str, date: NaiveDate, proposed: f64) -> f64 {
        let prior = self.daily_total(player_id, date);
        let total = prior + proposed;

        if total > self.limit {
            (self.limit - prior).max(0.0)
        } else if total < -self.limit {
            (-self.limit - prior).min(0.0)
        } else {
            proposed
        }
    }

    /// Add an applied change to the day's total and return the new total.
    ///
    /// `change` is the movement the rating actually made, after both the
    /// daily cap and the global bounds. Recording the capped value instead
    /// would let a change absorbed at a bound count against the day, and the
    /// net movement of the rating could then exceed the limit.
    pub fn record(&mut self, player_id: &str, date: NaiveDate, change: f64) -> f64 {
        let limit = self.limit;
        let entry = self
            .entries
            .entry((player_id.to_string(), date))
            .or_insert(0.0);
        // Absorbs float drift from `limit - prior`.
        *entry = (*entry + change).clamp(-limit, limit);
        *entry
    }

    /// First date still inside a window of `retention_days` ending on the
    /// latest date seen. `None` until the ledger has seen a date.
    pub fn window_start(&self, retention_days: u32) -> Option<NaiveDate> {
        self.latest
            .map(|latest| retention_cutoff(latest, retention_days).unwrap_or(NaiveDate::MIN))
    }

    /// Whether changes dated `date` can still be capped correctly
    pub fn accepts(&self, date: NaiveDate, retention_days: u32) -> bool {
        match self.window_start(retention_days) {
            Some(start) => date >= start,
            None => true,
        }
    }

    /// Drop every entry dated before `cutoff`, returning how many were removed
    pub fn prune_before(&mut self, cutoff: NaiveDate) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(_, date), _| *date >= cutoff);
        before - self.entries.len()
    }

    /// Move the window forward to `today` if it is later than any date seen,
    /// then prune everything outside the window.
    pub fn prune_through(&mut self, today: NaiveDate, retention_days: u32) -> usize {
        let latest = self.latest.map_or(today, |latest| latest.max(today));
        self.latest = Some(latest);

        match retention_cutoff(latest, retention_days) {
            Some(cutoff) => self.prune_before(cutoff),
            None => 0,
        }
    }

    /// Prune entries outside a window of `retention_days` ending on `today`.
    ///
    /// Only does work when `today` is later than every date seen so far, so it
    /// is cheap to call on every update.
    pub fn prune_stale(&mut self, today: NaiveDate, retention_days: u32) -> usize {
        if self.latest.is_some_and(|latest| latest >= today) {
            return 0;
        }
        self.prune_through(today, retention_days)
    }

    /// Capture the listed players' totals for `date`
    pub fn snapshot(&self, player_ids: &[PlayerId], date: NaiveDate) -> LedgerSnapshot {
        let totals = player_ids
            .iter()
            .map(|id| (id.clone(), self.entries.get(&(id.clone(), date)).copied()))
            .collect();
        LedgerSnapshot { date, totals }
    }

    /// Put the captured totals back, removing entries that did not exist then
    pub fn restore(&mut self, snapshot: LedgerSnapshot) {
        let date = snapshot.date;
        for (id, total) in snapshot.totals {
            match total {
                Some(total) => {
                    self.entries.insert((id, date), total);
                }
                None => {
                    self.entries.remove(&(id, date));
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// First day of a `retention_days` window ending on `today`
fn retention_cutoff(today: NaiveDate, retention_days: u32) -> Option<NaiveDate> {
    today.checked_sub_days(Days::new(u64::from(retention_days.max(1) - 1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_empty_ledger_passes_change_through() {
        let ledger = DailyChangeLedger::new(0.3);
        assert_eq!(ledger.daily_total("p1", day(1)), 0.0);
        assert_eq!(ledger.cap("p1", day(1), 0.15), 0.15);
        assert_eq!(ledger.cap("p1", day(1), -0.15), -0.15);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_positive_cap() {
        let mut ledger = DailyChangeLedger::new(0.3);
        ledger.record("p1", day(1), 0.28);

        let effective = ledger.cap("p1", day(1), 0.15);
        assert!((effective - 0.02).abs() < EPS);

        let total = ledger.record("p1", day(1), effective);
        assert!(total <= 0.3);
        assert!((total - 0.3).abs() < EPS);

        // Saturated: no further gains today
        assert_eq!(ledger.cap("p1", day(1), 0.05), 0.0);
        // Losses are still allowed
        assert_eq!(ledger.cap("p1", day(1), -0.1), -0.1);
    }

    #[test]
    fn test_negative_cap() {
        let mut ledger = DailyChangeLedger::new(0.3);
        ledger.record("p1", day(1), -0.25);

        let effective = ledger.cap("p1", day(1), -0.15);
        assert!((effective + 0.05).abs() < EPS);
        ledger.record("p1", day(1), effective);

        assert!(ledger.cap("p1", day(1), -0.05).abs() < EPS);
    }

    #[test]
    fn test_entries_are_per_player_and_per_day() {
        let mut ledger = DailyChangeLedger::new(0.3);
        ledger.record("p1", day(1), 0.3);

        assert_eq!(ledger.cap("p2", day(1), 0.15), 0.15);
        assert_eq!(ledger.cap("p1", day(2), 0.15), 0.15);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_prune_before() {
        let mut ledger = DailyChangeLedger::new(0.3);
        ledger.record("p1", day(1), 0.1);
        ledger.record("p1", day(2), 0.1);
        ledger.record("p2", day(3), 0.1);

        assert_eq!(ledger.prune_before(day(2)), 1);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.daily_total("p1", day(1)), 0.0);
        assert_eq!(ledger.daily_total("p1", day(2)), 0.1);
    }

    #[test]
    fn test_prune_stale_keeps_retention_window() {
        let mut ledger = DailyChangeLedger::new(0.3);
        ledger.record("p1", day(1), 0.1);
        ledger.record("p1", day(2), 0.1);
        ledger.record("p1", day(3), 0.1);

        // Two-day window ending on the 3rd keeps the 2nd and 3rd
        assert_eq!(ledger.prune_stale(day(3), 2), 1);
        assert_eq!(ledger.len(), 2);

        // Second call on the same day is a no-op
        ledger.record("p2", day(1), 0.1);
        assert_eq!(ledger.prune_stale(day(3), 2), 0);
        assert_eq!(ledger.len(), 3);

        // A one-day window on the next day keeps only that day
        assert_eq!(ledger.prune_stale(day(4), 1), 3);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_window_trails_latest_date() {
        let mut ledger = DailyChangeLedger::new(0.3);
        assert!(ledger.accepts(day(1), 2));
        assert_eq!(ledger.window_start(2), None);

        ledger.prune_stale(day(5), 2);
        assert_eq!(ledger.window_start(2), Some(day(4)));
        assert!(ledger.accepts(day(4), 2));
        assert!(!ledger.accepts(day(3), 2));

        // An earlier date does not move the window back
        assert_eq!(ledger.prune_stale(day(4), 2), 0);
        assert_eq!(ledger.window_start(2), Some(day(4)));
        assert!(!ledger.accepts(day(1), 2));
    }

    #[test]
    fn test_restore_undoes_recorded_changes() {
        let mut ledger = DailyChangeLedger::new(0.3);
        ledger.record("p1", day(1), 0.1);
        let ids = vec!["p1".to_string(), "p2".to_string()];

        let snapshot = ledger.snapshot(&ids, day(1));
        ledger.record("p1", day(1), 0.15);
        ledger.record("p2", day(1), -0.15);
        assert_eq!(ledger.len(), 2);

        ledger.restore(snapshot);
        assert_eq!(ledger.daily_total("p1", day(1)), 0.1);
        assert_eq!(ledger.daily_total("p2", day(1)), 0.0);
        assert_eq!(ledger.len(), 1);
    }
}
