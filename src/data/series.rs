//! Chart series derivation.
//!
//! Pivots the snapshot history into time-indexed, per-interface rows ready
//! for axis display. This is a pure function of its input: rebuilding from
//! the same history always yields the same series, so the store can safely
//! regenerate it on every accepted update.

use std::collections::BTreeMap;

use crate::data::model::{ChartPoint, Snapshot};

/// Build the chart series from a timestamp-ordered snapshot sequence.
///
/// One point per snapshot, with `latency_<iface>` and `throughput_<iface>`
/// fields for every sample it carries. Interfaces absent from a snapshot
/// simply have no field for that point.
pub fn build<'a, I>(history: I) -> Vec<ChartPoint>
where
    I: IntoIterator<Item = &'a Snapshot>,
{
    history.into_iter().map(point_for).collect()
}

fn point_for(snapshot: &Snapshot) -> ChartPoint {
    let mut fields = BTreeMap::new();
    for sample in &snapshot.samples {
        fields.insert(format!("latency_{}", sample.interface), sample.latency_ms);
        fields.insert(
            format!("throughput_{}", sample.interface),
            sample.throughput_mbps,
        );
    }

    ChartPoint {
        time_label: snapshot.timestamp.format("%H:%M:%S").to_string(),
        fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::PerformanceSample;
    use chrono::{TimeZone, Utc};

    fn sample(iface: &str, ts_secs: i64, latency: f64, throughput: f64) -> PerformanceSample {
        PerformanceSample {
            interface: iface.to_string(),
            timestamp: Utc.timestamp_opt(ts_secs, 0).unwrap(),
            latency_ms: latency,
            throughput_mbps: throughput,
            bytes_sent: 0,
            bytes_recv: 0,
            packets_sent: 0,
            packets_recv: 0,
            packet_loss_pct: 0.0,
            bandwidth_mb: 0.0,
        }
    }

    fn snap(ts_secs: i64, samples: Vec<PerformanceSample>) -> Snapshot {
        Snapshot {
            timestamp: Utc.timestamp_opt(ts_secs, 0).unwrap(),
            samples,
            interfaces: Vec::new(),
        }
    }

    #[test]
    fn test_build_pivots_samples_into_fields() {
        let history = vec![snap(
            3600,
            vec![sample("eth0", 3600, 12.5, 80.0), sample("wlan0", 3600, 30.0, 20.0)],
        )];

        let series = build(&history);
        assert_eq!(series.len(), 1);

        let point = &series[0];
        assert_eq!(point.time_label, "01:00:00");
        assert_eq!(point.fields["latency_eth0"], 12.5);
        assert_eq!(point.fields["throughput_eth0"], 80.0);
        assert_eq!(point.fields["latency_wlan0"], 30.0);
        assert_eq!(point.fields["throughput_wlan0"], 20.0);
    }

    #[test]
    fn test_absent_interface_has_no_field_not_zero() {
        let history = vec![
            snap(0, vec![sample("eth0", 0, 10.0, 50.0), sample("wlan0", 0, 40.0, 5.0)]),
            snap(1, vec![sample("eth0", 1, 11.0, 52.0)]),
        ];

        let series = build(&history);
        assert!(series[0].fields.contains_key("latency_wlan0"));
        assert!(!series[1].fields.contains_key("latency_wlan0"));
        assert!(!series[1].fields.contains_key("throughput_wlan0"));
    }

    #[test]
    fn test_build_is_idempotent() {
        let history = vec![
            snap(0, vec![sample("eth0", 0, 10.0, 50.0)]),
            snap(1, vec![sample("eth0", 1, 11.0, 52.0)]),
        ];

        assert_eq!(build(&history), build(&history));
    }

    #[test]
    fn test_empty_history_yields_empty_series() {
        assert!(build(&Vec::<Snapshot>::new()).is_empty());
    }
}
