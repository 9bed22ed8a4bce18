//! Command-line surface of the `tilepyr` binary.

use crate::config::PipelineConfig;
use crate::pipeline::{IngestPipeline, IngestReport};
use crate::record::NdjsonRecords;
use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tilepyr_geo::LongitudeMode;
use tracing::{error, info};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "tilepyr")]
#[command(about = "Aggregate tile records into MBTiles containers", long_about = None)]
pub struct Cli {
    /// NDJSON record files, one container each. `-` reads standard input.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// YAML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory the containers are written to
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Tile set name (single input only; otherwise each file stem is used)
    #[arg(long)]
    pub name: Option<String>,

    /// Reject tiles at any other zoom level
    #[arg(long)]
    pub enforced_zoom: Option<u8>,

    /// Allow bounding boxes to cross the antimeridian
    #[arg(long)]
    pub antimeridian: bool,

    /// Tiles per committed batch (0 commits once at the end)
    #[arg(long)]
    pub commit_every: Option<u64>,

    /// Write the run reports to this file as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

impl Cli {
    /// Configuration file values with command-line overrides applied.
    pub fn resolve_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        if let Some(dir) = &self.work_dir {
            config.work_dir = Some(dir.clone());
        }
        if let Some(name) = &self.name {
            config.name = name.clone();
        }
        if let Some(zoom) = self.enforced_zoom {
            config.enforced_zoom = Some(zoom);
        }
        if self.antimeridian {
            config.longitude_mode = LongitudeMode::Antimeridian;
        }
        if let Some(n) = self.commit_every {
            config.commit_every = n;
        }
        config.validate()?;
        Ok(config)
    }

    /// One configuration per input, named after the input.
    fn run_plan(&self, base: &PipelineConfig) -> Result<Vec<(PathBuf, PipelineConfig)>> {
        let stdin_inputs = self.inputs.iter().filter(|p| is_stdin(p)).count();
        if stdin_inputs > 1 {
            bail!("Standard input can only be read once");
        }
        if self.inputs.len() > 1 && self.name.is_some() {
            bail!("--name applies to a single input; multiple inputs are named by file stem");
        }

        let mut seen = HashSet::new();
        let mut plan = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            let mut config = base.clone();
            if self.inputs.len() > 1 && !is_stdin(input) {
                config.name = input
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
                    .with_context(|| format!("Cannot derive a tile set name from {}", input.display()))?;
                config.validate()?;
            }
            if !seen.insert(config.name.clone()) {
                bail!("Two inputs would both write tile set {:?}", config.name);
            }
            plan.push((input.clone(), config));
        }
        Ok(plan)
    }

    /// Ingest every input, in parallel, one container per input.
    pub fn execute(&self) -> Result<Vec<IngestReport>> {
        let base = self.resolve_config()?;
        let work_dir = base.work_dir();
        std::fs::create_dir_all(&work_dir)
            .with_context(|| format!("Failed to create work dir {}", work_dir.display()))?;

        let plan = self.run_plan(&base)?;
        info!(inputs = plan.len(), work_dir = %work_dir.display(), "starting");

        let results: Vec<Result<IngestReport>> = plan
            .par_iter()
            .map(|(input, config)| ingest_input(input, config, &work_dir))
            .collect();

        let mut reports = Vec::with_capacity(results.len());
        let mut failures = 0usize;
        for ((input, _), result) in plan.iter().zip(results) {
            match result {
                Ok(report) => reports.push(report),
                Err(e) => {
                    failures += 1;
                    error!(input = %input.display(), error = %format!("{:#}", e), "ingestion failed");
                }
            }
        }

        if let Some(path) = &self.report {
            let json = serde_json::to_string_pretty(&reports)?;
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write report {}", path.display()))?;
        }

        if failures > 0 {
            bail!("{} of {} inputs failed", failures, plan.len());
        }
        Ok(reports)
    }
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn ingest_input(input: &Path, config: &PipelineConfig, work_dir: &Path) -> Result<IngestReport> {
    let reader: Box<dyn BufRead> = if is_stdin(input) {
        Box::new(std::io::stdin().lock())
    } else {
        let file = File::open(input)
            .with_context(|| format!("Failed to open input {}", input.display()))?;
        Box::new(BufReader::new(file))
    };
    let pipeline = IngestPipeline::new(config.clone());
    let report = pipeline
        .run_to_dir(NdjsonRecords::new(reader), work_dir)
        .with_context(|| format!("Failed to ingest {}", input.display()))?;
    Ok(report)
}
