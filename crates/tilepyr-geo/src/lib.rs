//! # tilepyr-geo
//!
//! Tile-coordinate aggregation for web-tile sets.
//!
//! This crate turns a stream of `(zoom, column, row)` tile addresses into:
//! - the geographic bounding box of everything seen, in longitude/latitude
//! - the min/max column and row at every observed zoom level
//! - a zoom pyramid that extends those extents down to zoom 0
//!
//! ## Tile Coordinate System
//!
//! Uses the OpenStreetMap Slippy Map convention:
//! - `zoom` is the zoom level (0-30)
//! - `column` runs 0 to 2^zoom - 1, from west to east
//! - `row` runs 0 to 2^zoom - 1, from north to south
//!
//! ## Example
//!
//! ```
//! use tilepyr_geo::{AggregatorConfig, TileAggregator, ZoomPyramid};
//!
//! let mut aggregator = TileAggregator::new(AggregatorConfig::default());
//! aggregator.tile(3, 2, 3)?;
//! aggregator.tile(3, 5, 5)?;
//!
//! let pyramid = ZoomPyramid::generate(&aggregator)?;
//! assert_eq!(pyramid.len(), 4);
//!
//! let [lon, lat] = aggregator.centre()?;
//! println!("centre: {lon:.4}, {lat:.4}");
//! # Ok::<(), tilepyr_geo::GeoError>(())
//! ```

mod aggregate;
mod error;
mod projection;
mod pyramid;
mod tile;

pub use aggregate::{AggregatorConfig, TileAggregator};
pub use error::GeoError;
pub use projection::{project, project_xyz, LongitudeMode, MAX_LATITUDE, TILE_SIZE};
pub use pyramid::ZoomPyramid;
pub use tile::{tiles_per_side, GeoBBox, TileAddress, ZoomExtent, MAX_ZOOM};

/// Result type for geo operations.
pub type Result<T> = std::result::Result<T, GeoError>;
