//! Metrics helpers
//!
//! Prometheus-style counters and histograms for planet writes and the
//! appearance enrichment upstream.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Metrics prefix for all Planetdex metrics
pub const METRICS_PREFIX: &str = "planetdex";

/// Buckets for enrichment latency (in seconds); the upstream is a public API
pub const ENRICHMENT_BUCKETS: &[f64] = &[
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s, client timeout
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_planet_writes_total", METRICS_PREFIX),
        Unit::Count,
        "Planet writes by operation"
    );

    describe_counter!(
        format!("{}_enrichment_lookups_total", METRICS_PREFIX),
        Unit::Count,
        "Appearance lookups by outcome"
    );

    describe_histogram!(
        format!("{}_enrichment_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Appearance lookup latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Record a successful create, update or delete
pub fn record_write(op: &'static str) {
    counter!(
        format!("{}_planet_writes_total", METRICS_PREFIX),
        "op" => op
    )
    .increment(1);
}

/// Record one enrichment lookup
pub fn record_enrichment(duration_secs: f64, provider: &str, success: bool) {
    let outcome = if success { "resolved" } else { "unavailable" };

    counter!(
        format!("{}_enrichment_lookups_total", METRICS_PREFIX),
        "provider" => provider.to_string(),
        "outcome" => outcome
    )
    .increment(1);

    histogram!(
        format!("{}_enrichment_duration_seconds", METRICS_PREFIX),
        "provider" => provider.to_string()
    )
    .record(duration_secs);
}
