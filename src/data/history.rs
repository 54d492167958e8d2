//! Bounded snapshot history for chart series rebuilds.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::data::model::Snapshot;

/// Default number of retained snapshots, matching the producer's own
/// broadcast window.
pub const DEFAULT_HISTORY_CAP: usize = 200;

/// Timestamp-ordered history of accepted snapshots.
///
/// Keyed by timestamp so a late out-of-order arrival lands in its proper
/// position and a re-delivered instant replaces instead of duplicating;
/// the push envelope resends overlapping history windows on every update.
/// Eviction always drops the oldest retained instant, never a recent
/// arrival that merely happened to be delivered late.
#[derive(Debug, Clone)]
pub struct SnapshotHistory {
    snapshots: BTreeMap<DateTime<Utc>, Snapshot>,
    cap: usize,
}

impl SnapshotHistory {
    /// Create a history retaining at most `cap` snapshots.
    pub fn new(cap: usize) -> Self {
        Self {
            snapshots: BTreeMap::new(),
            cap: cap.max(1),
        }
    }

    /// Insert a snapshot, replacing any existing entry at the same instant
    /// and evicting the oldest entries beyond the cap.
    pub fn insert(&mut self, snapshot: Snapshot) {
        self.snapshots.insert(snapshot.timestamp, snapshot);
        while self.snapshots.len() > self.cap {
            self.snapshots.pop_first();
        }
    }

    /// Snapshots in ascending timestamp order.
    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.values()
    }

    /// The highest-timestamp snapshot retained, if any.
    pub fn newest(&self) -> Option<&Snapshot> {
        self.snapshots.values().next_back()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}

impl Default for SnapshotHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}
