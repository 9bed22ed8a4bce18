//! Running bounding box and per-zoom extents over a stream of tiles.

use crate::projection::{project, LongitudeMode};
use crate::tile::{TileAddress, ZoomExtent};
use crate::{GeoBBox, GeoError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregator settings, fixed for the lifetime of one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// When set, every tile must be at this zoom level.
    #[serde(default)]
    pub enforced_zoom: Option<u8>,
    /// Longitude handling for projected tiles.
    #[serde(default)]
    pub longitude_mode: LongitudeMode,
}

/// Accumulates the geographic envelope and zoom extents of observed tiles.
///
/// Every update is a min/max fold, so the final state does not depend on the
/// order tiles arrive in. Extents and the box only ever grow.
///
/// In [`LongitudeMode::Antimeridian`] two envelopes are kept: one in the usual
/// [-180, 180] frame and one with western-hemisphere tiles moved into
/// [180, 360]. The narrower of the two is reported, the usual frame winning
/// ties, so a tile set straddling the date line yields a box with `east > 180`.
#[derive(Debug, Clone, Default)]
pub struct TileAggregator {
    config: AggregatorConfig,
    bbox: Option<GeoBBox>,
    standard: Option<GeoBBox>,
    wrapped: Option<GeoBBox>,
    tile_count: u64,
    min_zoom: Option<u8>,
    max_zoom: Option<u8>,
    extents: BTreeMap<u8, ZoomExtent>,
}

impl TileAggregator {
    /// Fresh aggregator with the given configuration.
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Observe a raw tile coordinate and return the updated box.
    ///
    /// Fails with [`GeoError::InvalidCoordinate`] or [`GeoError::ZoomMismatch`],
    /// in which case nothing is recorded.
    pub fn tile(&mut self, zoom: i64, column: i64, row: i64) -> Result<GeoBBox> {
        let address = TileAddress::from_signed(zoom, column, row)?;
        self.observe(&address)
    }

    /// Observe an already validated address and return the updated box.
    pub fn observe(&mut self, address: &TileAddress) -> Result<GeoBBox> {
        self.check(address)?;

        let zoom = address.zoom();
        self.tile_count += 1;
        self.min_zoom = Some(self.min_zoom.map_or(zoom, |z| z.min(zoom)));
        self.max_zoom = Some(self.max_zoom.map_or(zoom, |z| z.max(zoom)));
        self.extents
            .entry(zoom)
            .and_modify(|extent| extent.include(address.column(), address.row()))
            .or_insert_with(|| ZoomExtent::from_tile(address.column(), address.row()));

        let projected = project(address, self.config.longitude_mode);
        let standard = merge(self.standard, projected);
        self.standard = Some(standard);

        let bbox = match self.config.longitude_mode {
            LongitudeMode::Clipped => standard,
            LongitudeMode::Antimeridian => {
                let moved = if projected.west < 0.0 {
                    projected.shifted(360.0)
                } else {
                    projected
                };
                let wrapped = merge(self.wrapped, moved);
                self.wrapped = Some(wrapped);
                if wrapped.width() < standard.width() {
                    wrapped
                } else {
                    standard
                }
            }
        };
        self.bbox = Some(bbox);
        Ok(bbox)
    }

    /// Check an address against the configured zoom without recording it.
    pub fn check(&self, address: &TileAddress) -> Result<()> {
        match self.config.enforced_zoom {
            Some(expected) if expected != address.zoom() => Err(GeoError::ZoomMismatch {
                expected,
                actual: address.zoom(),
            }),
            _ => Ok(()),
        }
    }

    /// Centre of the current box as `[longitude, latitude]`.
    ///
    /// Longitude is folded back into [-180, 180] when the box crosses the date line.
    pub fn centre(&self) -> Result<[f64; 2]> {
        let bbox = self.bbox.ok_or(GeoError::NoData)?;
        let [mut lon, lat] = bbox.centre();
        if lon > 180.0 {
            lon -= 360.0;
        }
        Ok([lon, lat])
    }

    /// Current box, if any tile was observed.
    pub fn bbox(&self) -> Option<GeoBBox> {
        self.bbox
    }

    /// Number of tiles observed, duplicates included.
    pub fn tile_count(&self) -> u64 {
        self.tile_count
    }

    /// Shallowest zoom observed.
    pub fn min_zoom(&self) -> Option<u8> {
        self.min_zoom
    }

    /// Deepest zoom observed.
    pub fn max_zoom(&self) -> Option<u8> {
        self.max_zoom
    }

    /// Observed extents by zoom level.
    pub fn extents(&self) -> &BTreeMap<u8, ZoomExtent> {
        &self.extents
    }

    /// Configuration this aggregator was built with.
    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }
}

fn merge(current: Option<GeoBBox>, next: GeoBBox) -> GeoBBox {
    match current {
        Some(bbox) => bbox.union(&next),
        None => next,
    }
}
