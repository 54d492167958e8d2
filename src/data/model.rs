//! Canonical data model for normalized metrics.
//!
//! These are the internal shapes every wire payload is converted into.
//! Producers of either wire generation end up here; everything downstream
//! (series, aggregates, the store) only ever sees these types.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One interface's measurements at a single instant.
///
/// Immutable once created; there is one sample per (interface, timestamp).
/// The derived fields `packet_loss_pct` and `bandwidth_mb` are computed by
/// the normalizer so downstream consumers never recompute them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    pub interface: String,
    pub timestamp: DateTime<Utc>,
    pub latency_ms: f64,
    pub throughput_mbps: f64,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    /// Percentage of sent packets with no matching receive, in [0, 100].
    pub packet_loss_pct: f64,
    /// Received volume in mebibytes.
    pub bandwidth_mb: f64,
}

/// A known network interface.
///
/// Replaced wholesale on each accepted snapshot; there is no partial merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceInfo {
    /// Unique key across the interface set.
    pub name: String,
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
    pub iface_type: Option<String>,
    pub is_up: Option<bool>,
}

/// One consistent observation of all interfaces' metrics at a point in time.
///
/// The atomic unit of update, and the canonical form after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub samples: Vec<PerformanceSample>,
    pub interfaces: Vec<InterfaceInfo>,
}

impl Snapshot {
    /// Names of all interfaces known to this snapshot.
    pub fn interface_names(&self) -> BTreeSet<String> {
        self.interfaces.iter().map(|i| i.name.clone()).collect()
    }
}

/// One chart row derived from a snapshot.
///
/// Field keys are `latency_<iface>` and `throughput_<iface>`. Interfaces
/// absent from the source snapshot have no key at all; consumers must treat
/// a missing key as "no data", not zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// The snapshot timestamp formatted for axis display.
    pub time_label: String,
    pub fields: BTreeMap<String, f64>,
}

/// Aggregate KPIs computed over the selected interfaces.
///
/// `latest_*` values come from the most recent sample per interface,
/// averaged across the selection; `avg_*` are arithmetic means over every
/// sample in the filtered set. All zeroes is the valid result of an empty
/// selection.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateKpis {
    pub latest_latency: f64,
    pub latest_throughput: f64,
    pub latest_packet_loss_pct: f64,
    pub latest_bandwidth_mb: f64,
    pub avg_latency: f64,
    pub avg_throughput: f64,
}
