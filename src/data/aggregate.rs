//! Aggregate KPI computation over the selected interfaces.

use std::collections::{BTreeMap, BTreeSet};

use crate::data::model::{AggregateKpis, PerformanceSample};

/// Compute KPIs over the samples whose interface is in `selected`.
///
/// An empty filtered set is a valid, displayable state and yields all-zero
/// KPIs rather than an error. `latest_*` values are taken from the most
/// recent sample per interface and then averaged across the selection, not
/// summed, so the units stay comparable regardless of selection size.
pub fn compute(samples: &[PerformanceSample], selected: &BTreeSet<String>) -> AggregateKpis {
    let filtered: Vec<&PerformanceSample> = samples
        .iter()
        .filter(|s| selected.contains(&s.interface))
        .collect();

    if filtered.is_empty() {
        return AggregateKpis::default();
    }

    let count = filtered.len() as f64;
    let avg_latency = filtered.iter().map(|s| s.latency_ms).sum::<f64>() / count;
    let avg_throughput = filtered.iter().map(|s| s.throughput_mbps).sum::<f64>() / count;

    let mut latest: BTreeMap<&str, &PerformanceSample> = BTreeMap::new();
    for &sample in &filtered {
        match latest.get(sample.interface.as_str()) {
            Some(existing) if existing.timestamp >= sample.timestamp => {}
            _ => {
                latest.insert(sample.interface.as_str(), sample);
            }
        }
    }

    let interfaces = latest.len() as f64;
    AggregateKpis {
        latest_latency: latest.values().map(|s| s.latency_ms).sum::<f64>() / interfaces,
        latest_throughput: latest.values().map(|s| s.throughput_mbps).sum::<f64>() / interfaces,
        latest_packet_loss_pct: latest.values().map(|s| s.packet_loss_pct).sum::<f64>()
            / interfaces,
        latest_bandwidth_mb: latest.values().map(|s| s.bandwidth_mb).sum::<f64>() / interfaces,
        avg_latency,
        avg_throughput,
    }
}
