//! Wire payload normalization.
//!
//! Two producer generations coexist on the push topic. The current one
//! wraps its data in an envelope carrying `current_data` plus a
//! `historical_data` window; the legacy one sends `performance_metrics`
//! and `interfaces` directly, usually without a timestamp. Both are
//! converted to the same canonical [`Snapshot`] here, and nowhere else.
//!
//! Shape detection is a tagged-variant parse on the distinguishing keys
//! only: `current_data` present means envelope, otherwise both
//! `performance_metrics` and `interfaces` must be present for the legacy
//! shape. Anything else is rejected; the shape is never inferred from
//! partial or ambiguous fields.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::data::model::{InterfaceInfo, PerformanceSample, Snapshot};
use crate::error::NormalizeError;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Time injection point for legacy payloads without a timestamp.
///
/// The receipt instant comes from here instead of an implicit global "now"
/// so normalization is deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a single instant. Mainly for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Envelope emitted by current producers.
///
/// `historical_data`, not `current_data` alone, is what the chart series is
/// built from; the producer broadcasts its whole retained window each time.
#[derive(Debug, Deserialize)]
struct CurrentEnvelope {
    current_data: RecordPayload,
    #[serde(default)]
    historical_data: Vec<RecordPayload>,
}

/// The record shape shared by `current_data`, each `historical_data` entry,
/// and a bare legacy payload. Unknown keys (`hardware_info` and friends)
/// are presentation data for out-of-scope panes and are ignored.
#[derive(Debug, Deserialize)]
struct RecordPayload {
    #[serde(default, deserialize_with = "de_opt_timestamp")]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    performance_metrics: Vec<WireSample>,
    #[serde(default)]
    interfaces: Vec<WireInterface>,
}

#[derive(Debug, Deserialize)]
struct WireSample {
    interface: String,
    #[serde(default, deserialize_with = "de_opt_timestamp")]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    latency: Option<f64>,
    #[serde(default)]
    throughput: Option<f64>,
    #[serde(default)]
    bytes_sent: u64,
    #[serde(default)]
    bytes_recv: u64,
    #[serde(default)]
    packets_sent: u64,
    #[serde(default)]
    packets_recv: u64,
}

#[derive(Debug, Deserialize)]
struct WireInterface {
    name: String,
    #[serde(default)]
    ipv4: Option<String>,
    #[serde(default)]
    ipv6: Option<String>,
    #[serde(default, rename = "type")]
    iface_type: Option<String>,
    #[serde(default)]
    is_up: Option<bool>,
}

/// Converts either wire shape into canonical snapshots.
#[derive(Debug, Clone)]
pub struct Normalizer<C = SystemClock> {
    clock: C,
}

impl Normalizer<SystemClock> {
    /// A normalizer stamping legacy payloads with wall-clock receipt time.
    pub fn new() -> Self {
        Self { clock: SystemClock }
    }
}

impl Default for Normalizer<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Normalizer<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    /// Normalize a raw pull or push payload.
    ///
    /// The envelope shape yields its historical records in order followed by
    /// the current record (deduplicated when the current record is already
    /// the tail of the window, which is how the producer broadcasts). The
    /// legacy shape yields a single snapshot.
    ///
    /// A rejected payload must be logged and discarded by the caller; it
    /// never crashes the store or clears existing state.
    pub fn normalize(&self, raw: &Value) -> Result<Vec<Snapshot>, NormalizeError> {
        let obj = raw.as_object().ok_or(NormalizeError::UnrecognizedSchema)?;

        if obj.contains_key("current_data") {
            let envelope: CurrentEnvelope = serde_json::from_value(raw.clone())
                .map_err(|e| NormalizeError::InvalidPayload(e.to_string()))?;

            let mut snapshots: Vec<Snapshot> = envelope
                .historical_data
                .iter()
                .map(|record| self.snapshot_from(record))
                .collect();

            let current = self.snapshot_from(&envelope.current_data);
            if snapshots.last().map(|s| s.timestamp) != Some(current.timestamp) {
                snapshots.push(current);
            }
            Ok(snapshots)
        } else if obj.contains_key("performance_metrics") && obj.contains_key("interfaces") {
            self.normalize_record(raw).map(|snapshot| vec![snapshot])
        } else {
            Err(NormalizeError::UnrecognizedSchema)
        }
    }

    /// Normalize one legacy-shaped record.
    ///
    /// Assigns the clock's current instant when the record carries no
    /// timestamp of its own.
    pub fn normalize_record(&self, raw: &Value) -> Result<Snapshot, NormalizeError> {
        let obj = raw.as_object().ok_or(NormalizeError::UnrecognizedSchema)?;
        if !obj.contains_key("performance_metrics") || !obj.contains_key("interfaces") {
            return Err(NormalizeError::UnrecognizedSchema);
        }
        let record: RecordPayload = serde_json::from_value(raw.clone())
            .map_err(|e| NormalizeError::InvalidPayload(e.to_string()))?;
        Ok(self.snapshot_from(&record))
    }

    fn snapshot_from(&self, record: &RecordPayload) -> Snapshot {
        let timestamp = record.timestamp.unwrap_or_else(|| self.clock.now());

        let samples = record
            .performance_metrics
            .iter()
            .map(|m| PerformanceSample {
                interface: m.interface.clone(),
                timestamp: m.timestamp.unwrap_or(timestamp),
                latency_ms: m.latency.unwrap_or(0.0).max(0.0),
                throughput_mbps: m.throughput.unwrap_or(0.0).max(0.0),
                bytes_sent: m.bytes_sent,
                bytes_recv: m.bytes_recv,
                packets_sent: m.packets_sent,
                packets_recv: m.packets_recv,
                packet_loss_pct: packet_loss_pct(m.packets_sent, m.packets_recv),
                bandwidth_mb: m.bytes_recv as f64 / BYTES_PER_MB,
            })
            .collect();

        let interfaces = record
            .interfaces
            .iter()
            .map(|i| InterfaceInfo {
                name: i.name.clone(),
                ipv4: i.ipv4.clone(),
                ipv6: i.ipv6.clone(),
                iface_type: i.iface_type.clone(),
                is_up: i.is_up,
            })
            .collect();

        Snapshot {
            timestamp,
            samples,
            interfaces,
        }
    }
}

/// Share of sent packets with no matching receive, clamped to [0, 100].
///
/// Receive counters can exceed send counters on chatty interfaces, so the
/// lower clamp is load-bearing, not just defensive.
fn packet_loss_pct(packets_sent: u64, packets_recv: u64) -> f64 {
    if packets_sent == 0 {
        return 0.0;
    }
    let lost = packets_sent.saturating_sub(packets_recv) as f64;
    (lost / packets_sent as f64 * 100.0).clamp(0.0, 100.0)
}

/// Accept the timestamp spellings seen on the wire: RFC 3339, naive
/// ISO 8601 (assumed UTC), or integer epoch milliseconds.
fn de_opt_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_timestamp))
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                return Some(ts.with_timezone(&Utc));
            }
            // datetime.isoformat() without an offset
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| DateTime::<Utc>::from_timestamp_millis(ms)),
        _ => None,
    }
}
