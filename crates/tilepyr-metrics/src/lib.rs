//! Metrics infrastructure for tile ingestion.
//!
//! This crate declares every metric emitted during an ingestion run as a const
//! [`Metric`], so names and units live in one place. It re-exports the
//! `metrics` crate; whichever recorder the binary installs receives the values.
//!
//! # Example
//!
//! ```rust,ignore
//! use tilepyr_metrics::{describe_metrics, metric_defs, RunLabels};
//!
//! describe_metrics();
//!
//! let labels = RunLabels::new("coastline");
//! metrics::counter!(metric_defs::INGEST_RECORDS.name, &labels.to_labels()).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use tilepyr_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const TILES: Metric = Metric::counter("tilepyr.test.tiles")
///     .with_description("Tiles seen")
///     .with_unit(Unit::Count)
///     .with_labels(&["tileset"]);
///
/// assert_eq!(TILES.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "tilepyr.ingest.records").
    pub name: &'static str,
    /// The kind of metric.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// The unit of measurement (optional).
    pub unit: Option<Unit>,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn with_kind(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Counter)
    }

    /// Creates a new gauge metric with the given name.
    pub const fn gauge(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Gauge)
    }

    /// Creates a new histogram metric with the given name.
    pub const fn histogram(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Histogram)
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys for the metric.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }
}

/// All metric definitions for ingestion runs.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Labels present on every run-scoped metric.
    pub const RUN_LABELS: &[&str] = &["tileset"];

    /// Records pulled from the input stream, valid or not.
    pub const INGEST_RECORDS: Metric = Metric::counter("tilepyr.ingest.records")
        .with_description("Records pulled from the input stream")
        .with_unit(Unit::Count)
        .with_labels(RUN_LABELS);

    /// Malformed records that were skipped.
    pub const INGEST_SKIPPED: Metric = Metric::counter("tilepyr.ingest.skipped")
        .with_description("Malformed records skipped")
        .with_unit(Unit::Count)
        .with_labels(RUN_LABELS);

    /// Tiles written to the container.
    pub const INGEST_TILES_WRITTEN: Metric = Metric::counter("tilepyr.ingest.tiles_written")
        .with_description("Tiles written to the container")
        .with_unit(Unit::Count)
        .with_labels(RUN_LABELS);

    /// Size of each stored payload.
    pub const INGEST_PAYLOAD_BYTES: Metric = Metric::histogram("tilepyr.ingest.payload_bytes")
        .with_description("Size of each stored tile payload")
        .with_unit(Unit::Bytes)
        .with_labels(RUN_LABELS);

    /// Tiles stored in the open write window and not yet committed.
    pub const INGEST_PENDING_TILES: Metric = Metric::gauge("tilepyr.ingest.pending_tiles")
        .with_description("Tiles written since the last commit")
        .with_unit(Unit::Count)
        .with_labels(RUN_LABELS);

    /// Completed ingestion runs, labelled by outcome.
    pub const INGEST_RUNS: Metric = Metric::counter("tilepyr.ingest.runs")
        .with_description("Completed ingestion runs")
        .with_unit(Unit::Count)
        .with_labels(&["tileset", "outcome"]);

    /// Every metric above, for bulk registration.
    pub const ALL: &[&Metric] = &[
        &INGEST_RECORDS,
        &INGEST_SKIPPED,
        &INGEST_TILES_WRITTEN,
        &INGEST_PAYLOAD_BYTES,
        &INGEST_PENDING_TILES,
        &INGEST_RUNS,
    ];
}

/// Labels identifying one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLabels {
    /// Tile set name, also the container file stem.
    pub tileset: String,
}

impl RunLabels {
    /// Labels for the run producing `tileset`.
    pub fn new(tileset: impl Into<String>) -> Self {
        Self {
            tileset: tileset.into(),
        }
    }

    /// Converts the labels to the metrics crate label format.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![("tileset", self.tileset.clone())]
    }

    /// Returns labels with additional key-value pairs.
    pub fn with(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.extend_from_slice(extra);
        labels
    }
}

/// Describes all ingestion metrics. Call once after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
