//! Prometheus metrics for the reconciliation engine.
//!
//! Metric names are a compatibility surface for existing dashboards; do not
//! rename them.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::LazyLock;

/// Registry holding all zonesync metrics, exposed by the daemon's exporter.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Total number of records created by the engine
pub static RECORDS_CREATED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "records_created_total",
        "The total number of created records",
    )
    .unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of records deleted by the engine
pub static RECORDS_DELETED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "records_deleted_total",
        "The total number of deleted records",
    )
    .unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Number of domains currently advertised by the proxy, refreshed on every diff
pub static MANAGED_RECORDS: LazyLock<IntGauge> = LazyLock::new(|| {
    let gauge = IntGauge::new("managed_records", "The number of managed records").unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Render the registry in Prometheus text exposition format.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&METRICS_REGISTRY.gather(), &mut buffer) {
        tracing::warn!("failed to encode metrics: {e}");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_are_stable() {
        RECORDS_CREATED_TOTAL.inc();
        RECORDS_DELETED_TOTAL.inc();
        MANAGED_RECORDS.set(3);

        let rendered = render();
        assert!(rendered.contains("records_created_total"));
        assert!(rendered.contains("records_deleted_total"));
        assert!(rendered.contains("managed_records"));
    }
}
