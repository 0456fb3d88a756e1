// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for `zonectl` runs.
//!
//! All metrics use the `zonectl` prefix. A run is short-lived, so instead of
//! serving `/metrics` the CLI writes the text exposition format to a file
//! (`--metrics-file`), suitable for a node-exporter textfile collector.
//!
//! # Example
//!
//! ```rust,no_run
//! use zonectl::metrics::{record_zone, gather_metrics, ZoneOutcome};
//!
//! record_zone(ZoneOutcome::Success, std::time::Duration::from_secs(1));
//! let text = gather_metrics().unwrap();
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

/// Prefix for all metric names
const METRICS_NAMESPACE: &str = "zonectl";

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Corrections processed, by provider and outcome
///
/// Labels:
/// - `provider`: Provider or registrar name from the configuration
/// - `outcome`: `executed`, `failed`, `skipped` (dry-run or abandoned) or `report`
pub static CORRECTIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_corrections_total"),
        "Total number of corrections by provider and outcome",
    );
    let counter = CounterVec::new(opts, &["provider", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Zones reconciled, by outcome
///
/// Labels:
/// - `outcome`: see [`ZoneOutcome`]
pub static ZONES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_zones_total"),
        "Total number of zones reconciled by outcome",
    );
    let counter = CounterVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Time spent on one zone, in seconds
pub static ZONE_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_zone_duration_seconds"),
        "Duration of zone reconciliation in seconds by outcome",
    )
    .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 300.0]);
    let histogram = HistogramVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// How a zone finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneOutcome {
    /// Every correction succeeded (or was only printed)
    Success,
    /// Some corrections failed
    Failed,
    /// The zone was aborted by a fatal error
    Aborted,
    /// The zone ran past its timeout
    TimedOut,
}

impl ZoneOutcome {
    /// Label value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
            Self::TimedOut => "timeout",
        }
    }
}

/// Record one processed correction.
pub fn record_correction(provider: &str, outcome: &str) {
    CORRECTIONS_TOTAL
        .with_label_values(&[provider, outcome])
        .inc();
}

/// Record a finished zone.
pub fn record_zone(outcome: ZoneOutcome, duration: Duration) {
    ZONES_TOTAL.with_label_values(&[outcome.as_str()]).inc();
    ZONE_DURATION_SECONDS
        .with_label_values(&[outcome.as_str()])
        .observe(duration.as_secs_f64());
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

/// Write the text exposition to `path`, replacing it atomically.
///
/// # Errors
/// Returns error if encoding or writing fails
pub fn write_metrics_file(path: &Path) -> anyhow::Result<()> {
    use anyhow::Context;

    let text = gather_metrics()?;
    let tmp = path.with_extension("prom.tmp");
    std::fs::write(&tmp, text).with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
