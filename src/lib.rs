//! # netpulse
//!
//! Metrics synchronization engine for live network-interface monitoring.
//!
//! The engine reconciles an initial pull-based snapshot with a continuous
//! push stream carrying two wire shapes, derives chart-ready series and
//! aggregate KPIs, and keeps an operator-controlled interface selection
//! consistent as the known interface set changes.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  ┌──────────────┐                      ┌────────────────────┐  │
//! │  │ SnapshotFetch│── one-shot pull ────▶│                    │  │
//! │  └──────────────┘                      │   MetricsService   │  │
//! │  ┌──────────────┐                      │  (single writer)   │  │
//! │  │  UpdateBus   │── push by topic ────▶│                    │  │
//! │  └──────────────┘                      └─────────┬──────────┘  │
//! │         ▲                                        │             │
//! │  ┌──────┴───────┐                     Normalizer │ apply       │
//! │  │  spawn_feed  │◀── TCP / bytes                 ▼             │
//! │  └──────────────┘                      ┌────────────────────┐  │
//! │                                        │    MetricsStore    │  │
//! │                                        │ history · series   │  │
//! │                                        │ KPIs · selection   │  │
//! │                                        └─────────┬──────────┘  │
//! │                                        watch     │ StoreView   │
//! │                                                  ▼             │
//! │                                        ┌────────────────────┐  │
//! │                                        │   MetricsHandle    │  │
//! │                                        │ (read-only fan-out)│  │
//! │                                        └────────────────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: acquisition seams: the one-shot [`SnapshotFetch`]
//!   pull, the named-topic [`UpdateBus`] push channel with drop-to-
//!   unsubscribe registrations, and the newline-JSON stream bridge
//! - **[`data`]**: the canonical model plus the pure derivation logic:
//!   normalization of both wire shapes, bounded snapshot history, chart
//!   series, aggregate KPIs, and selection reconciliation
//! - **[`store`]**: the composed state container arbitrating update
//!   ordering and publishing [`StoreView`]s to consumers
//! - **[`service`]**: the single-writer worker task and the cloneable
//!   consumer handle
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use netpulse::{FileFetch, MetricsService, ServiceConfig, UpdateBus};
//!
//! # tokio_test::block_on(async {
//! let bus = UpdateBus::new();
//! let handle = MetricsService::spawn(
//!     Arc::new(FileFetch::new("metrics.json")),
//!     Some(bus.clone()),
//!     ServiceConfig::default(),
//! );
//!
//! // Readers follow published state; producers push raw payloads.
//! let mut state = handle.watch();
//! state.changed().await.unwrap();
//! println!("latency: {:.1} ms", state.borrow().kpis.latest_latency);
//! # });
//! ```

pub mod data;
pub mod error;
pub mod service;
pub mod settings;
pub mod source;
pub mod store;

pub use data::{
    AggregateKpis, ChartPoint, Clock, FixedClock, InterfaceInfo, Normalizer, PerformanceSample,
    SelectionManager, SelectionState, Snapshot, SnapshotHistory, SystemClock,
};
pub use error::{ChannelError, FetchError, NormalizeError};
pub use service::{MetricsHandle, MetricsService, ServiceConfig};
pub use settings::Settings;
pub use source::{FileFetch, SnapshotFetch, Subscription, UpdateBus, METRICS_TOPIC};
pub use store::{MetricsStore, StoreView};
