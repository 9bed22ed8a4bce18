//! Tile addresses, per-zoom extents and geographic bounds.

use crate::{GeoError, Result};
use serde::{Deserialize, Serialize};

/// Deepest zoom level accepted.
///
/// This is an implementation bound, not a limit of the tiling scheme. It is
/// deeper than any published tile set, and a whole-level [`ZoomExtent`] at
/// this zoom still has a tile count that fits in a `u64`.
pub const MAX_ZOOM: u8 = 30;

/// Number of tiles along one axis at `zoom`.
#[inline]
pub fn tiles_per_side(zoom: u8) -> u64 {
    1u64 << zoom
}

/// Slippy-map tile address (z, x, y).
///
/// Rows count from the north edge, as in XYZ tile URLs. The address is validated
/// on construction and cannot be changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileAddress {
    zoom: u8,
    column: u32,
    row: u32,
}

impl TileAddress {
    /// Create a tile address, checking `column` and `row` against `2^zoom`.
    pub fn new(zoom: u8, column: u32, row: u32) -> Result<Self> {
        Self::from_signed(zoom as i64, column as i64, row as i64)
    }

    /// Create a tile address from signed integers, as they arrive in records.
    ///
    /// Negative values are rejected with [`GeoError::InvalidCoordinate`].
    pub fn from_signed(zoom: i64, column: i64, row: i64) -> Result<Self> {
        let invalid = GeoError::InvalidCoordinate { zoom, column, row };
        if !(0..=MAX_ZOOM as i64).contains(&zoom) {
            return Err(invalid);
        }
        let side = tiles_per_side(zoom as u8) as i64;
        if !(0..side).contains(&column) || !(0..side).contains(&row) {
            return Err(invalid);
        }
        Ok(Self {
            zoom: zoom as u8,
            column: column as u32,
            row: row as u32,
        })
    }

    /// Zoom level.
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Column (x), 0 at 180°W.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Row (y), 0 at the northern edge of the projection.
    pub fn row(&self) -> u32 {
        self.row
    }

    /// The tile one level up that contains this one, or `None` at zoom 0.
    pub fn parent(&self) -> Option<Self> {
        if self.zoom == 0 {
            return None;
        }
        Some(Self {
            zoom: self.zoom - 1,
            column: self.column >> 1,
            row: self.row >> 1,
        })
    }

    /// Row in the TMS convention (origin at the south edge), as stored by MBTiles.
    pub fn tms_row(&self) -> u32 {
        (tiles_per_side(self.zoom) - 1 - self.row as u64) as u32
    }
}

impl std::fmt::Display for TileAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.column, self.row)
    }
}

/// Column/row extent of the tiles present at one zoom level.
///
/// Serialized with the short `minx`/`miny`/`maxx`/`maxy` keys used in tile-set reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoomExtent {
    /// Westernmost column.
    #[serde(rename = "minx")]
    pub min_column: u32,
    /// Northernmost row.
    #[serde(rename = "miny")]
    pub min_row: u32,
    /// Easternmost column.
    #[serde(rename = "maxx")]
    pub max_column: u32,
    /// Southernmost row.
    #[serde(rename = "maxy")]
    pub max_row: u32,
}

impl ZoomExtent {
    /// Extent covering exactly one tile.
    pub fn from_tile(column: u32, row: u32) -> Self {
        Self {
            min_column: column,
            min_row: row,
            max_column: column,
            max_row: row,
        }
    }

    /// Widen the extent so it includes `(column, row)`. Never narrows.
    pub fn include(&mut self, column: u32, row: u32) {
        self.min_column = self.min_column.min(column);
        self.min_row = self.min_row.min(row);
        self.max_column = self.max_column.max(column);
        self.max_row = self.max_row.max(row);
    }

    /// Extent one zoom level up, from the parents of the two extreme corners.
    ///
    /// Halving is floor division; coordinates are never negative so a shift is exact.
    pub fn parent(&self) -> Self {
        Self {
            min_column: self.min_column >> 1,
            min_row: self.min_row >> 1,
            max_column: self.max_column >> 1,
            max_row: self.max_row >> 1,
        }
    }

    /// Whether `(column, row)` lies inside the extent.
    pub fn contains(&self, column: u32, row: u32) -> bool {
        (self.min_column..=self.max_column).contains(&column)
            && (self.min_row..=self.max_row).contains(&row)
    }

    /// Number of tiles in the rectangle spanned by the extent.
    pub fn tile_count(&self) -> u64 {
        let columns = (self.max_column - self.min_column) as u64 + 1;
        let rows = (self.max_row - self.min_row) as u64 + 1;
        columns * rows
    }
}

/// Geographic bounding box in degrees.
///
/// In antimeridian mode `east` may exceed 180 for a box that crosses the date line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBBox {
    /// Western edge (longitude).
    pub west: f64,
    /// Southern edge (latitude).
    pub south: f64,
    /// Eastern edge (longitude).
    pub east: f64,
    /// Northern edge (latitude).
    pub north: f64,
}

impl GeoBBox {
    /// Create a box from its four edges.
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &GeoBBox) -> GeoBBox {
        GeoBBox {
            west: self.west.min(other.west),
            south: self.south.min(other.south),
            east: self.east.max(other.east),
            north: self.north.max(other.north),
        }
    }

    /// Whether `other` lies entirely inside `self`.
    pub fn contains_box(&self, other: &GeoBBox) -> bool {
        self.west <= other.west
            && self.south <= other.south
            && self.east >= other.east
            && self.north >= other.north
    }

    /// Longitudinal span in degrees.
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Planar centroid of the box rectangle as `[longitude, latitude]`.
    pub fn centre(&self) -> [f64; 2] {
        [
            (self.west + self.east) / 2.0,
            (self.south + self.north) / 2.0,
        ]
    }

    /// Same box moved `degrees` east.
    pub fn shifted(&self, degrees: f64) -> GeoBBox {
        GeoBBox {
            west: self.west + degrees,
            east: self.east + degrees,
            ..*self
        }
    }

    /// `[west, south, east, north]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }
}
