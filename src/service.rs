//! The synchronization worker and its consumer handle.
//!
//! One tokio task owns the [`MetricsStore`] and consumes one update at a
//! time: fetch completion, push delivery, refresh requests, and selection
//! overrides are all serialized through its select loop, so no two events
//! ever interleave inside an `apply`. Consumers hold a cloneable
//! [`MetricsHandle`] that reads published state and forwards mutation
//! requests to the worker.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::data::model::{AggregateKpis, ChartPoint};
use crate::data::DEFAULT_HISTORY_CAP;
use crate::error::{ChannelError, FetchError};
use crate::source::{SnapshotFetch, Subscription, UpdateBus, METRICS_TOPIC};
use crate::store::{MetricsStore, StoreView};

/// Worker configuration. Defaults mirror the producer's own settings.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Topic to subscribe to for push updates.
    pub topic: String,
    /// Maximum retained snapshots.
    pub history_cap: usize,
    /// Bound on the initial pull and every refresh.
    pub fetch_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            topic: METRICS_TOPIC.to_string(),
            history_cap: DEFAULT_HISTORY_CAP,
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

enum Command {
    Refresh,
    SetSelected(BTreeSet<String>),
}

/// Consumer-facing read and control surface.
///
/// Cloneable; reads are lock-free borrows of the latest published view, and
/// every mutation request goes through the single writer. Dropping the last
/// handle stops the worker, which releases its bus subscription.
#[derive(Debug, Clone)]
pub struct MetricsHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<StoreView>,
}

impl MetricsHandle {
    /// The full composed state.
    pub fn view(&self) -> StoreView {
        self.state.borrow().clone()
    }

    pub fn selected(&self) -> BTreeSet<String> {
        self.state.borrow().selection.selected.clone()
    }

    pub fn available(&self) -> BTreeSet<String> {
        self.state.borrow().selection.available.clone()
    }

    pub fn series(&self) -> Vec<ChartPoint> {
        self.state.borrow().series.clone()
    }

    pub fn kpis(&self) -> AggregateKpis {
        self.state.borrow().kpis
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<FetchError> {
        self.state.borrow().error.clone()
    }

    /// Override the interface selection.
    pub async fn set_selected(&self, selected: BTreeSet<String>) -> Result<()> {
        self.commands
            .send(Command::SetSelected(selected))
            .await
            .map_err(|_| anyhow::anyhow!("metrics service stopped"))
    }

    /// Trigger a fresh pull.
    pub async fn refresh(&self) -> Result<()> {
        self.commands
            .send(Command::Refresh)
            .await
            .map_err(|_| anyhow::anyhow!("metrics service stopped"))
    }

    /// Change notifications; await `changed()` on the returned receiver to
    /// follow updates.
    pub fn watch(&self) -> watch::Receiver<StoreView> {
        self.state.clone()
    }
}

/// Spawns and names the single writer task.
pub struct MetricsService;

impl MetricsService {
    /// Start the worker: perform the initial pull, subscribe to the push
    /// topic when a bus is provided, then serve updates until every handle
    /// is dropped.
    pub fn spawn(
        fetcher: Arc<dyn SnapshotFetch>,
        bus: Option<UpdateBus>,
        config: ServiceConfig,
    ) -> MetricsHandle {
        let (store, state) = MetricsStore::new(config.history_cap);
        let (commands, command_rx) = mpsc::channel(16);

        tokio::spawn(run(store, fetcher, bus, config, command_rx));

        MetricsHandle { commands, state }
    }
}

async fn run(
    mut store: MetricsStore,
    fetcher: Arc<dyn SnapshotFetch>,
    bus: Option<UpdateBus>,
    config: ServiceConfig,
    mut commands: mpsc::Receiver<Command>,
) {
    // Subscribe before the initial pull so a push racing the fetch is
    // queued rather than lost; the store's ordering rule sorts out which
    // one wins the latest view.
    let mut subscription: Option<Subscription> = match &bus {
        Some(bus) => Some(bus.subscribe(&config.topic)),
        None => {
            warn!(error = %ChannelError::Unavailable, "running pull-only");
            None
        }
    };
    store.set_channel_available(subscription.is_some());

    pull(&mut store, fetcher.as_ref(), config.fetch_timeout).await;

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Refresh) => {
                    pull(&mut store, fetcher.as_ref(), config.fetch_timeout).await;
                }
                Some(Command::SetSelected(selected)) => store.set_selected(selected),
                // Every handle dropped: tear down. The subscription drops
                // with this task and unregisters from the bus.
                None => break,
            },
            payload = recv_push(&mut subscription) => match payload {
                Some(raw) => apply_push(&mut store, &raw),
                None => {
                    warn!("push channel closed; continuing pull-only");
                    subscription = None;
                    store.set_channel_available(false);
                }
            },
        }
    }

    debug!("metrics service stopped");
}

async fn recv_push(subscription: &mut Option<Subscription>) -> Option<Value> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}

fn apply_push(store: &mut MetricsStore, raw: &Value) {
    match store.apply_raw(raw) {
        Ok(applied) => debug!(snapshots = applied, "applied push update"),
        Err(e) => {
            // A malformed push degrades to "ignored", never "system down".
            warn!(error = %e, "discarding push payload");
            store.note_discarded();
        }
    }
}

async fn pull(store: &mut MetricsStore, fetcher: &dyn SnapshotFetch, timeout: Duration) {
    store.set_loading(true);

    match tokio::time::timeout(timeout, fetcher.fetch()).await {
        Ok(Ok(raw)) => match store.apply_raw(&raw) {
            Ok(applied) => {
                info!(source = fetcher.description(), snapshots = applied, "snapshot pull applied");
            }
            Err(e) => {
                warn!(source = fetcher.description(), error = %e, "pulled payload unusable");
                store.reset_to_error(FetchError::Parse(e.to_string()));
            }
        },
        Ok(Err(e)) => {
            warn!(source = fetcher.description(), error = %e, "snapshot pull failed");
            store.reset_to_error(e);
        }
        Err(_) => {
            warn!(source = fetcher.description(), "snapshot pull timed out");
            store.reset_to_error(FetchError::Timeout);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    use crate::source::FileFetch;

    fn legacy_payload(ts: &str, iface: &str, latency: f64) -> Value {
        json!({
            "timestamp": ts,
            "performance_metrics": [{
                "interface": iface,
                "latency": latency,
                "throughput": latency * 2.0,
                "packets_sent": 100,
                "packets_recv": 98,
                "bytes_recv": 1048576
            }],
            "interfaces": [{"name": iface, "ipv4": "10.0.0.2"}]
        })
    }

    fn fixture_file(payload: &Value) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", payload).unwrap();
        file
    }

    async fn settled_view(handle: &MetricsHandle) -> StoreView {
        // The worker publishes several times during startup; wait for the
        // pull to complete one way or the other.
        let mut state = handle.watch();
        loop {
            {
                let view = state.borrow();
                if !view.loading && (view.error.is_some() || !view.series.is_empty()) {
                    return view.clone();
                }
            }
            state.changed().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_initial_pull_fills_store() {
        let file = fixture_file(&legacy_payload("2026-08-06T10:00:00Z", "eth0", 12.5));
        let handle = MetricsService::spawn(
            Arc::new(FileFetch::new(file.path())),
            Some(UpdateBus::new()),
            ServiceConfig::default(),
        );

        let view = settled_view(&handle).await;
        assert!(view.error.is_none());
        assert!(view.channel_available);
        assert_eq!(view.kpis.latest_latency, 12.5);
        assert_eq!(handle.available(), handle.selected());
    }

    #[tokio::test]
    async fn test_push_update_advances_latest_view() {
        let file = fixture_file(&legacy_payload("2026-08-06T10:00:00Z", "eth0", 12.5));
        let bus = UpdateBus::new();
        let handle = MetricsService::spawn(
            Arc::new(FileFetch::new(file.path())),
            Some(bus.clone()),
            ServiceConfig::default(),
        );
        settled_view(&handle).await;

        let mut state = handle.watch();
        bus.publish(
            METRICS_TOPIC,
            &legacy_payload("2026-08-06T10:00:05Z", "eth0", 20.0),
        );

        loop {
            state.changed().await.unwrap();
            let latency = state.borrow().kpis.latest_latency;
            if latency == 20.0 {
                break;
            }
        }
        assert_eq!(handle.series().len(), 2);
    }

    #[tokio::test]
    async fn test_out_of_order_push_does_not_roll_back_latest_view() {
        let file = fixture_file(&legacy_payload("2026-08-06T10:00:10Z", "eth0", 12.5));
        let bus = UpdateBus::new();
        let handle = MetricsService::spawn(
            Arc::new(FileFetch::new(file.path())),
            Some(bus.clone()),
            ServiceConfig::default(),
        );
        settled_view(&handle).await;

        let mut state = handle.watch();
        bus.publish(
            METRICS_TOPIC,
            &legacy_payload("2026-08-06T10:00:05Z", "eth0", 99.0),
        );

        // The stale snapshot lands in the series without touching KPIs.
        loop {
            state.changed().await.unwrap();
            if state.borrow().series.len() == 2 {
                break;
            }
        }
        assert_eq!(handle.kpis().latest_latency, 12.5);
    }

    #[tokio::test]
    async fn test_malformed_push_is_discarded_and_counted() {
        let file = fixture_file(&legacy_payload("2026-08-06T10:00:00Z", "eth0", 12.5));
        let bus = UpdateBus::new();
        let handle = MetricsService::spawn(
            Arc::new(FileFetch::new(file.path())),
            Some(bus.clone()),
            ServiceConfig::default(),
        );
        let before = settled_view(&handle).await;

        let mut state = handle.watch();
        bus.publish(METRICS_TOPIC, &json!({"foo": 1}));

        loop {
            state.changed().await.unwrap();
            if state.borrow().discarded_updates == 1 {
                break;
            }
        }
        let after = handle.view();
        assert_eq!(after.kpis, before.kpis);
        assert_eq!(after.latest_samples, before.latest_samples);
        assert!(after.error.is_none());
    }

    #[tokio::test]
    async fn test_fetch_failure_surfaces_error_with_zeroed_state() {
        let handle = MetricsService::spawn(
            Arc::new(FileFetch::new("/nonexistent/metrics.json")),
            Some(UpdateBus::new()),
            ServiceConfig::default(),
        );

        let view = settled_view(&handle).await;
        assert!(matches!(view.error, Some(FetchError::Io(_))));
        assert!(view.latest_samples.is_empty());
        assert_eq!(view.kpis, AggregateKpis::default());
        // A failed pull is not the same thing as a missing channel.
        assert!(view.channel_available);
    }

    #[tokio::test]
    async fn test_missing_bus_means_pull_only_mode() {
        let file = fixture_file(&legacy_payload("2026-08-06T10:00:00Z", "eth0", 12.5));
        let handle = MetricsService::spawn(
            Arc::new(FileFetch::new(file.path())),
            None,
            ServiceConfig::default(),
        );

        let view = settled_view(&handle).await;
        assert!(!view.channel_available);
        assert!(view.error.is_none());
        assert_eq!(view.kpis.latest_latency, 12.5);
    }

    #[tokio::test]
    async fn test_set_selected_filters_kpis() {
        let payload = json!({
            "timestamp": "2026-08-06T10:00:00Z",
            "performance_metrics": [
                {"interface": "eth0", "latency": 10.0, "throughput": 100.0},
                {"interface": "wlan0", "latency": 30.0, "throughput": 20.0}
            ],
            "interfaces": [{"name": "eth0"}, {"name": "wlan0"}]
        });
        let file = fixture_file(&payload);
        let handle = MetricsService::spawn(
            Arc::new(FileFetch::new(file.path())),
            None,
            ServiceConfig::default(),
        );
        settled_view(&handle).await;
        assert_eq!(handle.kpis().latest_latency, 20.0);

        let mut state = handle.watch();
        handle
            .set_selected(["eth0".to_string()].into_iter().collect())
            .await
            .unwrap();

        loop {
            state.changed().await.unwrap();
            if state.borrow().kpis.latest_latency == 10.0 {
                break;
            }
        }
        assert_eq!(handle.selected().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_repulls_from_source() {
        let file = fixture_file(&legacy_payload("2026-08-06T10:00:00Z", "eth0", 12.5));
        let handle = MetricsService::spawn(
            Arc::new(FileFetch::new(file.path())),
            None,
            ServiceConfig::default(),
        );
        settled_view(&handle).await;

        // Rewrite the fixture with newer data, then refresh.
        std::fs::write(
            file.path(),
            legacy_payload("2026-08-06T10:00:09Z", "eth0", 42.0).to_string(),
        )
        .unwrap();

        let mut state = handle.watch();
        handle.refresh().await.unwrap();
        loop {
            state.changed().await.unwrap();
            if state.borrow().kpis.latest_latency == 42.0 {
                break;
            }
        }
    }

    #[tokio::test]
    async fn test_slow_fetch_times_out() {
        #[derive(Debug)]
        struct StalledFetch;

        #[async_trait]
        impl SnapshotFetch for StalledFetch {
            async fn fetch(&self) -> Result<Value, FetchError> {
                std::future::pending().await
            }
            fn description(&self) -> &str {
                "stalled"
            }
        }

        let handle = MetricsService::spawn(
            Arc::new(StalledFetch),
            None,
            ServiceConfig {
                fetch_timeout: Duration::from_millis(50),
                ..ServiceConfig::default()
            },
        );

        let view = settled_view(&handle).await;
        assert_eq!(view.error, Some(FetchError::Timeout));
    }

    #[tokio::test]
    async fn test_dropping_handles_releases_subscription() {
        let file = fixture_file(&legacy_payload("2026-08-06T10:00:00Z", "eth0", 12.5));
        let bus = UpdateBus::new();
        let handle = MetricsService::spawn(
            Arc::new(FileFetch::new(file.path())),
            Some(bus.clone()),
            ServiceConfig::default(),
        );
        settled_view(&handle).await;
        assert_eq!(bus.subscriber_count(METRICS_TOPIC), 1);

        drop(handle);
        // The worker notices the closed command channel on its next loop
        // turn and drops the subscription with it.
        for _ in 0..50 {
            if bus.subscriber_count(METRICS_TOPIC) == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("subscription was not released");
    }
}
