//! Ingestion pipeline: records in, container and report out.
//!
//! For every valid record the pipeline
//! 1. validates the tile address and the enforced zoom,
//! 2. stores the payload in the container's open write window,
//! 3. only then folds the address into the aggregator.
//!
//! The aggregator therefore never counts a tile whose payload failed to store.
//! Malformed records are counted and skipped; any other failure ends the run,
//! and the write window guard commits what was already written.

use crate::config::PipelineConfig;
use crate::record::{RecordError, TileRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tilepyr_geo::{GeoBBox, GeoError, TileAddress, TileAggregator, ZoomPyramid};
use tilepyr_mbtiles::{MbtilesSink, StoreError, TileFormat, TilesetMetadata};
use tilepyr_metrics::{metric_defs, RunLabels};
use tracing::{debug, info, warn};

/// Errors that end an ingestion run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Tile coordinate error: {0}")]
    Geo(#[from] GeoError),

    #[error("Container error: {0}")]
    Store(#[from] StoreError),

    #[error("Record source error: {0}")]
    Source(#[from] RecordError),

    /// The input held no valid tile, so there is no box or pyramid to report.
    #[error("No valid tiles in input ({skipped} malformed records skipped)")]
    NoTiles { skipped: u64 },
}

/// Outcome of a successful ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    /// Tile set name.
    pub tileset: String,
    /// Container file written.
    pub container: PathBuf,
    pub bbox: GeoBBox,
    /// `[longitude, latitude]`.
    pub centre: [f64; 2],
    /// Valid tiles ingested, duplicates included.
    pub tile_count: u64,
    /// Records pulled from the input.
    pub records: u64,
    /// Malformed records skipped.
    pub skipped: u64,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Extents for every zoom from 0 to `max_zoom`.
    pub zoom_extents: ZoomPyramid,
    pub format: TileFormat,
    pub completed_at: DateTime<Utc>,
}

/// Runs ingestion for one tile set.
///
/// A pipeline holds no per-run state; every call to [`run`](Self::run) builds
/// a fresh aggregator, so one pipeline can drive several runs.
#[derive(Debug, Clone)]
pub struct IngestPipeline {
    config: PipelineConfig,
    labels: RunLabels,
}

impl IngestPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let labels = RunLabels::new(config.name.clone());
        Self { config, labels }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Create `<work_dir>/<name>.mbtiles`, ingest `records` into it and close it.
    ///
    /// A container left at that path by an earlier run is replaced, so the
    /// report always describes every tile in the file.
    pub fn run_to_dir<I>(&self, records: I, work_dir: &Path) -> Result<IngestReport, PipelineError>
    where
        I: IntoIterator<Item = Result<TileRecord, RecordError>>,
    {
        let path = self.config.container_path(work_dir);
        let mut sink = MbtilesSink::create(&path)?;
        let result = self.run(records, &mut sink);
        let closed = sink.close();
        let report = result?;
        closed?;
        Ok(report)
    }

    /// Ingest `records` into an already open sink.
    pub fn run<I>(&self, records: I, sink: &mut MbtilesSink) -> Result<IngestReport, PipelineError>
    where
        I: IntoIterator<Item = Result<TileRecord, RecordError>>,
    {
        let result = self.ingest(records, sink);
        let outcome = if result.is_ok() { "ok" } else { "failed" };
        metrics::counter!(
            metric_defs::INGEST_RUNS.name,
            &self.labels.with(&[("outcome", outcome.to_string())])
        )
        .increment(1);
        result
    }

    fn ingest<I>(&self, records: I, sink: &mut MbtilesSink) -> Result<IngestReport, PipelineError>
    where
        I: IntoIterator<Item = Result<TileRecord, RecordError>>,
    {
        let name = &self.config.name;
        info!(tileset = %name, container = %sink.path().display(), "starting ingestion run");

        let labels = self.labels.to_labels();
        let records_counter = metrics::counter!(metric_defs::INGEST_RECORDS.name, &labels);
        let skipped_counter = metrics::counter!(metric_defs::INGEST_SKIPPED.name, &labels);
        let written_counter = metrics::counter!(metric_defs::INGEST_TILES_WRITTEN.name, &labels);
        let payload_bytes = metrics::histogram!(metric_defs::INGEST_PAYLOAD_BYTES.name, &labels);
        let pending_gauge = metrics::gauge!(metric_defs::INGEST_PENDING_TILES.name, &labels);

        let mut aggregator = TileAggregator::new(self.config.aggregator_config());
        let mut formats: BTreeMap<TileFormat, u64> = BTreeMap::new();
        let mut total: u64 = 0;
        let mut skipped: u64 = 0;

        {
            let mut scope = sink.write_scope()?;
            let mut pending: u64 = 0;

            for item in records {
                total += 1;
                records_counter.increment(1);

                let record = match item {
                    Ok(record) => record,
                    Err(e) if e.is_recoverable() => {
                        skipped += 1;
                        skipped_counter.increment(1);
                        warn!(tileset = %name, line = e.line(), error = %e, "skipping malformed record");
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };

                let address = TileAddress::from_signed(record.zoom, record.column, record.row)?;
                aggregator.check(&address)?;
                scope.put_tile(&address, &record.image)?;
                aggregator.observe(&address)?;

                written_counter.increment(1);
                payload_bytes.record(record.image.len() as f64);
                if let Some(format) = TileFormat::sniff(&record.image) {
                    *formats.entry(format).or_default() += 1;
                }

                pending += 1;
                if self.config.commit_every > 0 && pending >= self.config.commit_every {
                    scope.checkpoint()?;
                    debug!(tileset = %name, tiles = aggregator.tile_count(), "committed batch");
                    pending = 0;
                }
                pending_gauge.set(pending as f64);
            }

            scope.finish()?;
            pending_gauge.set(0.0);
        }

        if aggregator.tile_count() == 0 {
            warn!(tileset = %name, records = total, skipped, "no valid tiles in input");
            return Err(PipelineError::NoTiles { skipped });
        }

        let zoom_extents = ZoomPyramid::generate(&aggregator)?;
        let centre = aggregator.centre()?;
        let bbox = aggregator.bbox().ok_or(GeoError::NoData)?;
        let (min_zoom, max_zoom) = match (aggregator.min_zoom(), aggregator.max_zoom()) {
            (Some(min), Some(max)) => (min, max),
            _ => return Err(GeoError::NotReady.into()),
        };
        let format = dominant_format(&formats);

        let mut metadata = TilesetMetadata::new(name.clone(), format)
            .with_bounds(&bbox)
            .with_center(centre[0], centre[1], min_zoom)
            .with_zoom_range(min_zoom, max_zoom);
        metadata.description = self.config.description.clone();
        metadata.layer_type = Some("overlay".to_string());
        sink.set_metadata(&metadata)?;

        info!(
            tileset = %name,
            tiles = aggregator.tile_count(),
            skipped,
            min_zoom,
            max_zoom,
            "ingestion run complete"
        );

        Ok(IngestReport {
            tileset: name.clone(),
            container: sink.path().to_path_buf(),
            bbox,
            centre,
            tile_count: aggregator.tile_count(),
            records: total,
            skipped,
            min_zoom,
            max_zoom,
            zoom_extents,
            format,
            completed_at: Utc::now(),
        })
    }
}

/// Most frequent recognised format, ties going to the earlier variant.
/// Defaults to PNG when no payload was recognised.
fn dominant_format(counts: &BTreeMap<TileFormat, u64>) -> TileFormat {
    counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(format, _)| *format)
        .unwrap_or(TileFormat::Png)
}
