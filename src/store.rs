//! The composed metrics state container.
//!
//! All mutation funnels through [`MetricsStore::apply`] (or the raw-payload
//! wrapper) on a single owner; readers observe the published [`StoreView`]
//! through a watch channel and never mutate. The store arbitrates update
//! ordering: history accepts every snapshot, while the latest view only
//! moves forward in timestamp order, so a slow initial pull cannot clobber
//! a newer push that arrived first and an out-of-order push cannot roll the
//! live view backward.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::watch;

use crate::data::model::{AggregateKpis, ChartPoint, InterfaceInfo, PerformanceSample, Snapshot};
use crate::data::{
    aggregate, series, Clock, Normalizer, SelectionManager, SelectionState, SnapshotHistory,
    SystemClock,
};
use crate::error::{FetchError, NormalizeError};

/// Composed state published to consumers on every accepted update.
#[derive(Debug, Clone, Default)]
pub struct StoreView {
    /// Samples of the highest-timestamp snapshot seen so far.
    pub latest_samples: Vec<PerformanceSample>,
    /// Interface set of the highest-timestamp snapshot seen so far.
    pub interfaces: Vec<InterfaceInfo>,
    /// Chart series rebuilt from the retained history.
    pub series: Vec<ChartPoint>,
    /// KPIs over the latest samples, filtered by the selection.
    pub kpis: AggregateKpis,
    pub selection: SelectionState,
    /// True while a pull is in flight.
    pub loading: bool,
    /// Set when the last pull failed; derived state is zeroed alongside it.
    pub error: Option<FetchError>,
    /// False when the store runs pull-only, with no push mechanism.
    pub channel_available: bool,
    /// Push payloads rejected by the normalizer since startup.
    pub discarded_updates: u64,
}

/// Single-writer state container arbitrating update ordering.
pub struct MetricsStore<C: Clock = SystemClock> {
    normalizer: Normalizer<C>,
    history: SnapshotHistory,
    selection: SelectionManager,
    latest_samples: Vec<PerformanceSample>,
    interfaces: Vec<InterfaceInfo>,
    series: Vec<ChartPoint>,
    kpis: AggregateKpis,
    last_applied: Option<DateTime<Utc>>,
    loading: bool,
    error: Option<FetchError>,
    channel_available: bool,
    discarded_updates: u64,
    publisher: watch::Sender<StoreView>,
}

impl MetricsStore<SystemClock> {
    /// Create a store with a wall-clock normalizer.
    ///
    /// Returns the store and the receiving end of its publication channel.
    pub fn new(history_cap: usize) -> (Self, watch::Receiver<StoreView>) {
        Self::with_clock(history_cap, SystemClock)
    }
}

impl<C: Clock> MetricsStore<C> {
    pub fn with_clock(history_cap: usize, clock: C) -> (Self, watch::Receiver<StoreView>) {
        let (publisher, receiver) = watch::channel(StoreView::default());
        let store = Self {
            normalizer: Normalizer::with_clock(clock),
            history: SnapshotHistory::new(history_cap),
            selection: SelectionManager::new(),
            latest_samples: Vec::new(),
            interfaces: Vec::new(),
            series: Vec::new(),
            kpis: AggregateKpis::default(),
            last_applied: None,
            loading: false,
            error: None,
            channel_available: false,
            discarded_updates: 0,
            publisher,
        };
        (store, receiver)
    }

    /// Normalize a raw wire payload and apply every snapshot it carries.
    ///
    /// Returns the number of snapshots applied. A rejected payload leaves
    /// every field untouched; the caller logs it and records the discard.
    pub fn apply_raw(&mut self, raw: &Value) -> Result<usize, NormalizeError> {
        let snapshots = self.normalizer.normalize(raw)?;
        let applied = snapshots.len();
        for snapshot in snapshots {
            self.apply(snapshot);
        }
        Ok(applied)
    }

    /// Accept one canonical snapshot.
    ///
    /// Every snapshot enters history for series completeness; the latest
    /// view (interfaces, latest samples, and hence latest KPIs) advances
    /// only when the snapshot's timestamp is not older than anything
    /// already applied.
    pub fn apply(&mut self, snapshot: Snapshot) {
        let advances = self
            .last_applied
            .map_or(true, |applied| snapshot.timestamp >= applied);

        if advances {
            self.latest_samples = snapshot.samples.clone();
            self.interfaces = snapshot.interfaces.clone();
            self.last_applied = Some(snapshot.timestamp);
        }

        self.history.insert(snapshot);
        self.series = series::build(self.history.iter());

        let available: BTreeSet<String> = self.interfaces.iter().map(|i| i.name.clone()).collect();
        self.selection.update_available(available);
        self.kpis = aggregate::compute(&self.latest_samples, self.selection.selected());

        self.loading = false;
        self.error = None;
        self.publish();
    }

    /// Explicit operator override of the interface selection.
    pub fn set_selected(&mut self, selected: BTreeSet<String>) {
        self.selection.set_selected(selected);
        self.kpis = aggregate::compute(&self.latest_samples, self.selection.selected());
        self.publish();
    }

    /// Mark a pull as in flight (or completed).
    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
        self.publish();
    }

    /// Record whether a push mechanism exists. Pull-only mode must be
    /// distinguishable from a failed pull.
    pub fn set_channel_available(&mut self, available: bool) {
        self.channel_available = available;
        self.publish();
    }

    /// A failed pull zeroes every derived value so stale numbers are never
    /// displayed next to an error banner.
    pub fn reset_to_error(&mut self, error: FetchError) {
        self.history.clear();
        self.selection = SelectionManager::new();
        self.latest_samples.clear();
        self.interfaces.clear();
        self.series.clear();
        self.kpis = AggregateKpis::default();
        self.last_applied = None;
        self.loading = false;
        self.error = Some(error);
        self.publish();
    }

    /// Record a discarded push payload without touching good state.
    pub fn note_discarded(&mut self) {
        self.discarded_updates += 1;
        self.publish();
    }

    /// The current composed state.
    pub fn current(&self) -> StoreView {
        StoreView {
            latest_samples: self.latest_samples.clone(),
            interfaces: self.interfaces.clone(),
            series: self.series.clone(),
            kpis: self.kpis,
            selection: self.selection.state(),
            loading: self.loading,
            error: self.error.clone(),
            channel_available: self.channel_available,
            discarded_updates: self.discarded_updates,
        }
    }

    /// Number of retained snapshots.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    fn publish(&self) {
        // Receivers may all be gone during teardown; nothing to do then.
        let _ = self.publisher.send(self.current());
    }
}
