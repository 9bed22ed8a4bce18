//! Integration tests for the MBTiles container.
//!
//! These tests write a container, close it, and open it again the way a tile
//! server would, checking that payloads and metadata survive.

use tempfile::TempDir;
use tilepyr_geo::{GeoBBox, TileAddress};
use tilepyr_mbtiles::{MbtilesSink, SinkState, StoreError, TileFormat, TilesetMetadata};

fn tile(z: u8, x: u32, y: u32) -> TileAddress {
    TileAddress::new(z, x, y).expect("valid tile")
}

#[test]
fn test_reopen_reads_back_tiles() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = temp.path().join("roundtrip.mbtiles");

    let tiles = [
        (tile(0, 0, 0), b"world".to_vec()),
        (tile(2, 1, 3), b"south".to_vec()),
        (tile(2, 3, 0), b"north-east".to_vec()),
    ];

    let mut sink = MbtilesSink::open(&path).expect("open");
    {
        let mut scope = sink.write_scope().expect("scope");
        for (address, payload) in &tiles {
            scope.put_tile(address, payload).expect("put");
        }
        scope.finish().expect("finish");
    }
    sink.close().expect("close");

    let reopened = MbtilesSink::open(&path).expect("reopen");
    assert_eq!(reopened.tile_count().unwrap(), 3);
    for (address, payload) in &tiles {
        assert_eq!(
            reopened.get_tile(address).unwrap().as_deref(),
            Some(payload.as_slice()),
            "payload mismatch for {}",
            address
        );
    }
    assert_eq!(reopened.get_tile(&tile(2, 0, 0)).unwrap(), None);
}

#[test]
fn test_metadata_roundtrip() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = temp.path().join("meta.mbtiles");

    let metadata = TilesetMetadata::new("coastline", TileFormat::Webp)
        .with_bounds(&GeoBBox::new(-45.0, -10.0, 45.0, 10.0))
        .with_center(0.0, 0.0, 2)
        .with_zoom_range(0, 4);

    let mut sink = MbtilesSink::open(&path).expect("open");
    sink.set_metadata(&metadata).expect("metadata");
    // Overwriting a key replaces it.
    sink.set_metadata(&metadata.clone().with_zoom_range(0, 5))
        .expect("metadata");
    sink.close().expect("close");

    let reopened = MbtilesSink::open(&path).expect("reopen");
    let stored = reopened.metadata().unwrap();
    assert_eq!(stored["name"], "coastline");
    assert_eq!(stored["format"], "webp");
    assert_eq!(stored["bounds"], "-45,-10,45,10");
    assert_eq!(stored["center"], "0,0,2");
    assert_eq!(stored["maxzoom"], "5");
}

#[test]
fn test_metadata_allowed_while_writing() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let mut sink = MbtilesSink::open(temp.path().join("w.mbtiles")).expect("open");
    let mut scope = sink.write_scope().expect("scope");
    scope
        .set_metadata(&TilesetMetadata::new("inflight", TileFormat::Png))
        .expect("metadata inside scope");
    scope.finish().expect("finish");
    assert_eq!(sink.metadata().unwrap()["name"], "inflight");
}

#[test]
fn test_committed_batches_survive_unfinished_window() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = temp.path().join("partial.mbtiles");

    let mut sink = MbtilesSink::open(&path).expect("open");
    sink.begin_write().unwrap();
    sink.put_tile(&tile(1, 0, 0), b"committed").unwrap();
    sink.end_write().unwrap();

    sink.begin_write().unwrap();
    sink.put_tile(&tile(1, 1, 0), b"discarded").unwrap();
    sink.abort_write().unwrap();
    sink.close().unwrap();

    let reopened = MbtilesSink::open(&path).expect("reopen");
    assert_eq!(reopened.tile_count().unwrap(), 1);
    assert!(reopened.get_tile(&tile(1, 0, 0)).unwrap().is_some());
}

#[test]
fn test_close_commits_open_window() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = temp.path().join("close.mbtiles");

    let mut sink = MbtilesSink::open(&path).expect("open");
    sink.begin_write().unwrap();
    sink.put_tile(&tile(0, 0, 0), b"x").unwrap();
    sink.close().unwrap();
    assert_eq!(sink.state(), SinkState::Closed);
    assert!(matches!(
        sink.tile_count(),
        Err(StoreError::InvalidState { .. })
    ));

    let reopened = MbtilesSink::open(&path).expect("reopen");
    assert_eq!(reopened.tile_count().unwrap(), 1);
}

#[test]
fn test_independent_sinks_in_parallel() {
    let temp = TempDir::new().expect("Failed to create temp dir");

    std::thread::scope(|s| {
        for run in 0..4u32 {
            let path = temp.path().join(format!("run-{run}.mbtiles"));
            s.spawn(move || {
                let mut sink = MbtilesSink::open(&path).expect("open");
                let mut scope = sink.write_scope().expect("scope");
                for x in 0..=run {
                    scope.put_tile(&tile(3, x, run), &[run as u8]).expect("put");
                }
                scope.finish().expect("finish");
                sink.close().expect("close");
            });
        }
    });

    for run in 0..4u32 {
        let sink = MbtilesSink::open(temp.path().join(format!("run-{run}.mbtiles"))).unwrap();
        assert_eq!(sink.tile_count().unwrap(), run as u64 + 1);
    }
}
