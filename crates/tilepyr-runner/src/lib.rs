//! Tile ingestion runner.
//!
//! Reads newline-delimited JSON tile records, stores each payload in an
//! MBTiles container and aggregates the addresses into a bounding box, centre
//! and per-zoom extent pyramid, which end up in the container's metadata and
//! in an [`IngestReport`].

pub mod cli;
pub mod config;
pub mod pipeline;
pub mod record;

pub use cli::{Cli, LogFormat};
pub use config::{ConfigError, PipelineConfig, DEFAULT_COMMIT_EVERY};
pub use pipeline::{IngestPipeline, IngestReport, PipelineError};
pub use record::{parse_line, NdjsonRecords, RecordError, TileRecord};
