//! End-to-end ingestion tests: NDJSON text in, container and report out.

use approx::assert_relative_eq;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::Parser;
use std::io::Cursor;
use tempfile::TempDir;
use tilepyr_geo::{LongitudeMode, TileAddress, ZoomExtent};
use tilepyr_mbtiles::{MbtilesSink, TileFormat};
use tilepyr_runner::{Cli, IngestPipeline, NdjsonRecords, PipelineConfig, PipelineError};

const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

fn line(z: i64, x: i64, y: i64, payload: &[u8]) -> String {
    format!(
        "{{\"z\":{},\"x\":{},\"y\":{},\"image\":\"{}\"}}\n",
        z,
        x,
        y,
        STANDARD.encode(payload)
    )
}

fn ndjson(tiles: &[(i64, i64, i64)]) -> String {
    tiles.iter().map(|&(z, x, y)| line(z, x, y, JPEG)).collect()
}

fn extent(min_column: u32, min_row: u32, max_column: u32, max_row: u32) -> ZoomExtent {
    ZoomExtent {
        min_column,
        min_row,
        max_column,
        max_row,
    }
}

#[test]
fn test_report_matches_two_tile_example() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let input = ndjson(&[(3, 2, 3), (3, 5, 5)]);
    let pipeline = IngestPipeline::new(PipelineConfig {
        name: "example".to_string(),
        ..PipelineConfig::default()
    });

    let report = pipeline
        .run_to_dir(NdjsonRecords::new(Cursor::new(input)), temp.path())
        .expect("run");

    assert_eq!(report.tile_count, 2);
    assert_eq!(report.format, TileFormat::Jpg);
    assert_relative_eq!(report.bbox.west, -90.0);
    assert_relative_eq!(report.bbox.east, 90.0);
    assert_relative_eq!(report.bbox.south, -66.51326044311186, epsilon = 1e-9);
    assert_relative_eq!(report.bbox.north, 40.979898069620134, epsilon = 1e-9);
    assert_relative_eq!(report.centre[0], 0.0);

    let pyramid = &report.zoom_extents;
    assert_eq!(pyramid.get(3), Some(&extent(2, 3, 5, 5)));
    assert_eq!(pyramid.get(2), Some(&extent(1, 1, 2, 2)));
    assert_eq!(pyramid.get(1), Some(&extent(0, 0, 1, 1)));
    assert_eq!(pyramid.get(0), Some(&extent(0, 0, 0, 0)));

    let sink = MbtilesSink::open(&report.container).expect("reopen");
    assert_eq!(sink.tile_count().unwrap(), 2);
    let address = TileAddress::new(3, 5, 5).unwrap();
    assert_eq!(sink.get_tile(&address).unwrap().as_deref(), Some(JPEG));

    let metadata = sink.metadata().unwrap();
    assert_eq!(metadata["format"], "jpg");
    assert_eq!(metadata["minzoom"], "3");
    assert_eq!(metadata["maxzoom"], "3");
    assert!(metadata["bounds"].starts_with("-90,"));
}

#[test]
fn test_malformed_line_is_skipped() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let mut input = String::new();
    for i in 0..100i64 {
        if i == 57 {
            input.push_str("{\"z\": 10, \"x\": \n");
        } else {
            input.push_str(&line(10, i, 300, JPEG));
        }
    }

    let pipeline = IngestPipeline::new(PipelineConfig::default());
    let report = pipeline
        .run_to_dir(NdjsonRecords::new(Cursor::new(input)), temp.path())
        .expect("run");

    assert_eq!(report.tile_count, 99);
    assert_eq!(report.skipped, 1);
    let sink = MbtilesSink::open(&report.container).unwrap();
    assert_eq!(sink.tile_count().unwrap(), 99);
}

#[test]
fn test_empty_input() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let pipeline = IngestPipeline::new(PipelineConfig::default());
    let err = pipeline
        .run_to_dir(NdjsonRecords::new(Cursor::new("\n\n")), temp.path())
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoTiles { skipped: 0 }));
}

#[test]
fn test_duplicates_count_but_store_once() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let mut input = ndjson(&[(5, 10, 12)]);
    input.push_str(&line(5, 10, 12, b"\x89PNG second"));

    let pipeline = IngestPipeline::new(PipelineConfig::default());
    let report = pipeline
        .run_to_dir(NdjsonRecords::new(Cursor::new(input)), temp.path())
        .expect("run");
    assert_eq!(report.tile_count, 2);

    let sink = MbtilesSink::open(&report.container).unwrap();
    assert_eq!(sink.tile_count().unwrap(), 1);
    let stored = sink
        .get_tile(&TileAddress::new(5, 10, 12).unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(stored, b"\x89PNG second");
}

#[test]
fn test_antimeridian_mode_reports_narrow_box() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let input = ndjson(&[(2, 3, 1), (2, 0, 1)]);

    let clipped = IngestPipeline::new(PipelineConfig {
        name: "clipped".to_string(),
        ..PipelineConfig::default()
    })
    .run_to_dir(NdjsonRecords::new(Cursor::new(input.clone())), temp.path())
    .expect("clipped run");
    assert_relative_eq!(clipped.bbox.west, -180.0);
    assert_relative_eq!(clipped.bbox.east, 180.0);

    let wrapped = IngestPipeline::new(PipelineConfig {
        name: "wrapped".to_string(),
        longitude_mode: LongitudeMode::Antimeridian,
        ..PipelineConfig::default()
    })
    .run_to_dir(NdjsonRecords::new(Cursor::new(input)), temp.path())
    .expect("wrapped run");
    assert_relative_eq!(wrapped.bbox.west, 90.0);
    assert_relative_eq!(wrapped.bbox.east, 270.0);
    assert_relative_eq!(wrapped.centre[0], 180.0);
}

#[test]
fn test_cli_runs_inputs_in_parallel() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let out = temp.path().join("out");
    let mut args = vec![
        "tilepyr".to_string(),
        "--work-dir".to_string(),
        out.display().to_string(),
        "--commit-every".to_string(),
        "2".to_string(),
        "--report".to_string(),
        temp.path().join("report.json").display().to_string(),
    ];
    for i in 0..4i64 {
        let path = temp.path().join(format!("set{i}.ndjson"));
        let tiles: Vec<_> = (0..=i).map(|x| (4, x, i)).collect();
        std::fs::write(&path, ndjson(&tiles)).unwrap();
        args.push(path.display().to_string());
    }

    let cli = Cli::try_parse_from(args).expect("args");
    let reports = cli.execute().expect("execute");
    assert_eq!(reports.len(), 4);

    for i in 0..4i64 {
        let report = reports
            .iter()
            .find(|r| r.tileset == format!("set{i}"))
            .expect("report per input");
        assert_eq!(report.tile_count, i as u64 + 1);
        assert_eq!(report.container, out.join(format!("set{i}.mbtiles")));
        let sink = MbtilesSink::open(&report.container).unwrap();
        assert_eq!(sink.tile_count().unwrap(), i as u64 + 1);
    }

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(temp.path().join("report.json")).unwrap())
            .unwrap();
    assert_eq!(written.as_array().map(Vec::len), Some(4));
    assert!(written[0]["zoom_extents"]["0"].is_object());
}

#[test]
fn test_cli_reports_failed_input() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let good = temp.path().join("good.ndjson");
    std::fs::write(&good, ndjson(&[(1, 0, 0)])).unwrap();
    let missing = temp.path().join("missing.ndjson");

    let cli = Cli::try_parse_from([
        "tilepyr".to_string(),
        "--work-dir".to_string(),
        temp.path().display().to_string(),
        good.display().to_string(),
        missing.display().to_string(),
    ])
    .unwrap();
    let err = cli.execute().unwrap_err();
    assert!(err.to_string().contains("1 of 2 inputs failed"));
    assert!(temp.path().join("good.mbtiles").exists());
}
