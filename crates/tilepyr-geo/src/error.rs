//! Error types for the geo crate.

use thiserror::Error;

/// Errors raised while projecting or aggregating tile coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeoError {
    /// Zoom is negative or above [`crate::MAX_ZOOM`], or column/row fall outside `[0, 2^zoom)`.
    ///
    /// Zooms past `MAX_ZOOM` are rejected even though the tiling scheme has no
    /// upper limit; see [`crate::MAX_ZOOM`].
    #[error("Invalid tile coordinate z={zoom} x={column} y={row}")]
    InvalidCoordinate {
        /// Requested zoom level.
        zoom: i64,
        /// Requested column.
        column: i64,
        /// Requested row.
        row: i64,
    },

    /// The aggregator was configured for a single zoom level and got another.
    #[error("Tile zoom {actual} does not match enforced zoom {expected}")]
    ZoomMismatch {
        /// Zoom level the aggregator was configured with.
        expected: u8,
        /// Zoom level of the rejected tile.
        actual: u8,
    },

    /// No tile has been observed yet, so there is no box to take the centre of.
    #[error("No tiles have been observed")]
    NoData,

    /// The pyramid cannot be generated before any tile is observed.
    #[error("Zoom pyramid is not ready: no minimum zoom observed")]
    NotReady,
}
