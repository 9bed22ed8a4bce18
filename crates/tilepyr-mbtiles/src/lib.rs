//! # tilepyr-mbtiles
//!
//! Tile container sink backed by an [MBTiles](https://github.com/mapbox/mbtiles-spec)
//! SQLite file.
//!
//! Payloads are opaque bytes stored verbatim under their `(zoom, column, row)`
//! address. Writes happen inside explicit write windows, and each window is
//! one transaction, so an interrupted run leaves a valid but incomplete file.
//!
//! ## Example
//!
//! ```no_run
//! use tilepyr_geo::TileAddress;
//! use tilepyr_mbtiles::{MbtilesSink, TileFormat, TilesetMetadata};
//!
//! let mut sink = MbtilesSink::open("/tmp/tiles.mbtiles")?;
//! {
//!     let mut scope = sink.write_scope()?;
//!     scope.put_tile(&TileAddress::new(0, 0, 0).unwrap(), b"...")?;
//!     scope.finish()?;
//! }
//! sink.set_metadata(&TilesetMetadata::new("world", TileFormat::Png))?;
//! sink.close()?;
//! # Ok::<(), tilepyr_mbtiles::StoreError>(())
//! ```

mod error;
mod metadata;
mod sink;

pub use error::StoreError;
pub use metadata::{TileFormat, TilesetMetadata};
pub use sink::{MbtilesSink, SinkState, WriteScope};

/// Result type for container operations.
pub type Result<T> = std::result::Result<T, StoreError>;
