//! Alert tracker - remembers which alert tiers have already fired

use chrono::{DateTime, Local};
use orgalert_api::{AlertKey, EventKey};
use std::collections::{HashMap, HashSet};

/// Record of one fired (or deliberately skipped) alert tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRecord {
    pub key: AlertKey,
    pub fired_at: DateTime<Local>,
    /// False when the tier was marked fired without being presented
    pub presented: bool,
}

/// In-memory set of fired alerts.
///
/// Not persisted: a restarted process re-arms every alert.
#[derive(Debug, Default)]
pub struct AlertTracker {
    records: HashMap<AlertKey, AlertRecord>,
}

impl AlertTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_fired(&self, key: &AlertKey) -> bool {
        self.records.contains_key(key)
    }

    /// Record a presented alert. An existing record is kept as is.
    pub fn mark_fired(&mut self, key: AlertKey, at: DateTime<Local>) {
        self.insert(key, at, true);
    }

    /// Record a tier that was crossed but deliberately not presented
    pub fn mark_skipped(&mut self, key: AlertKey, at: DateTime<Local>) {
        self.insert(key, at, false);
    }

    fn insert(&mut self, key: AlertKey, at: DateTime<Local>, presented: bool) {
        self.records.entry(key.clone()).or_insert(AlertRecord {
            key,
            fired_at: at,
            presented,
        });
    }

    pub fn get(&self, key: &AlertKey) -> Option<&AlertRecord> {
        self.records.get(key)
    }

    /// Drop every record whose event is not in `live`. Returns the number removed.
    pub fn prune(&mut self, live: &HashSet<EventKey>) -> usize {
        let before = self.records.len();
        self.records.retain(|key, _| live.contains(&key.event));
        before - self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
