//! Data model and derivation logic.
//!
//! Everything in here is synchronous and side-effect free: normalization of
//! wire payloads into the canonical model, bounded snapshot history, and the
//! derived values (chart series, aggregate KPIs, selection state) the store
//! recomputes on every accepted update.

pub mod aggregate;
pub mod history;
pub mod model;
pub mod normalize;
pub mod selection;
pub mod series;

pub use history::{SnapshotHistory, DEFAULT_HISTORY_CAP};
pub use model::{AggregateKpis, ChartPoint, InterfaceInfo, PerformanceSample, Snapshot};
pub use normalize::{Clock, FixedClock, Normalizer, SystemClock};
pub use selection::{SelectionManager, SelectionState};
