//! Spherical web-tile projection.
//!
//! Tiles are 256 pixels square. At zoom `z` the world is `256 * 2^z` pixels wide,
//! and a pixel position converts back to longitude/latitude with
//!
//! - lon = (px - zc) / Bc
//! - lat = (2 atan(exp((py - zc) / -Cc)) - π/2) in degrees
//!
//! where `Bc = size / 360`, `Cc = size / 2π` and `zc = size / 2`.

use crate::tile::TileAddress;
use crate::{GeoBBox, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Tile edge length in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Latitude limit of the projection, `atan(sinh(π))` in degrees.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// How longitudes are treated when projecting and merging boxes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LongitudeMode {
    /// Longitudes stay within [-180, 180]; a set of tiles on both sides of the
    /// date line spans the whole width of the map.
    #[default]
    Clipped,
    /// Longitude is continuous, so boxes crossing the date line can be expressed
    /// with `east > 180`.
    Antimeridian,
}

/// Per-zoom pixel-space constants.
#[derive(Debug, Clone, Copy)]
struct PixelScale {
    bc: f64,
    cc: f64,
    zc: f64,
}

impl PixelScale {
    fn for_zoom(zoom: u8) -> Self {
        let size = TILE_SIZE * 2f64.powi(zoom as i32);
        Self {
            bc: size / 360.0,
            cc: size / (2.0 * PI),
            zc: size / 2.0,
        }
    }

    /// Pixel position to `(lon, lat)`.
    fn lon_lat(&self, px: f64, py: f64) -> (f64, f64) {
        let g = (py - self.zc) / -self.cc;
        let lon = (px - self.zc) / self.bc;
        let lat = (2.0 * g.exp().atan() - 0.5 * PI).to_degrees();
        (lon, lat)
    }
}

/// Geographic bounds `[west, south, east, north]` of a tile.
pub fn project(address: &TileAddress, mode: LongitudeMode) -> GeoBBox {
    let scale = PixelScale::for_zoom(address.zoom());
    let x = address.column() as f64;
    let y = address.row() as f64;

    let (west, south) = scale.lon_lat(x * TILE_SIZE, (y + 1.0) * TILE_SIZE);
    let (east, north) = scale.lon_lat((x + 1.0) * TILE_SIZE, y * TILE_SIZE);
    let bbox = GeoBBox::new(west, south, east, north);

    match mode {
        LongitudeMode::Clipped => clip(bbox),
        LongitudeMode::Antimeridian => bbox,
    }
}

/// Project a raw `(zoom, column, row)` triple, validating it first.
pub fn project_xyz(zoom: i64, column: i64, row: i64, mode: LongitudeMode) -> Result<GeoBBox> {
    let address = TileAddress::from_signed(zoom, column, row)?;
    Ok(project(&address, mode))
}

fn clip(bbox: GeoBBox) -> GeoBBox {
    GeoBBox {
        west: bbox.west.clamp(-180.0, 180.0),
        south: bbox.south.clamp(-MAX_LATITUDE, MAX_LATITUDE),
        east: bbox.east.clamp(-180.0, 180.0),
        north: bbox.north.clamp(-MAX_LATITUDE, MAX_LATITUDE),
    }
}
