//! Zoom pyramid synthesis.
//!
//! Observed extents are authoritative for `[min_zoom, max_zoom]`. Every level
//! below `min_zoom` is derived from the one above it by taking the parent tile
//! of the extent's two extreme corners, down to zoom 0.

use crate::aggregate::TileAggregator;
use crate::tile::{TileAddress, ZoomExtent};
use crate::{GeoError, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Tile extents for every zoom level from 0 up to the deepest observed level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ZoomPyramid {
    levels: BTreeMap<u8, ZoomExtent>,
}

impl ZoomPyramid {
    /// Complete the pyramid for the tiles an aggregator has seen.
    pub fn generate(aggregator: &TileAggregator) -> Result<Self> {
        Self::from_extents(aggregator.extents(), aggregator.min_zoom())
    }

    /// Complete the pyramid from observed extents.
    ///
    /// Fails with [`GeoError::NotReady`] when `min_zoom` is absent.
    pub fn from_extents(
        observed: &BTreeMap<u8, ZoomExtent>,
        min_zoom: Option<u8>,
    ) -> Result<Self> {
        let min_zoom = min_zoom.ok_or(GeoError::NotReady)?;
        let mut levels = observed.clone();

        for zoom in (0..min_zoom).rev() {
            if levels.contains_key(&zoom) {
                continue;
            }
            let child = levels.get(&(zoom + 1)).copied().ok_or(GeoError::NotReady)?;
            levels.insert(zoom, child.parent());
        }

        Ok(Self { levels })
    }

    /// Extent at `zoom`, if that level is covered.
    pub fn get(&self, zoom: u8) -> Option<&ZoomExtent> {
        self.levels.get(&zoom)
    }

    /// Whether the pyramid covers `address`.
    pub fn contains(&self, address: &TileAddress) -> bool {
        self.get(address.zoom())
            .is_some_and(|extent| extent.contains(address.column(), address.row()))
    }

    /// Levels in ascending zoom order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &ZoomExtent)> {
        self.levels.iter().map(|(zoom, extent)| (*zoom, extent))
    }

    /// Number of zoom levels covered.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether no level is covered.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Borrow the underlying map.
    pub fn levels(&self) -> &BTreeMap<u8, ZoomExtent> {
        &self.levels
    }

    /// Consume into the underlying map.
    pub fn into_levels(self) -> BTreeMap<u8, ZoomExtent> {
        self.levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregatorConfig;

    fn extent(min_column: u32, min_row: u32, max_column: u32, max_row: u32) -> ZoomExtent {
        ZoomExtent {
            min_column,
            min_row,
            max_column,
            max_row,
        }
    }

    #[test]
    fn test_not_ready_without_tiles() {
        let agg = TileAggregator::new(AggregatorConfig::default());
        assert_eq!(ZoomPyramid::generate(&agg), Err(GeoError::NotReady));
    }

    #[test]
    fn test_two_tile_example() {
        let mut agg = TileAggregator::new(AggregatorConfig::default());
        agg.tile(3, 2, 3).unwrap();
        agg.tile(3, 5, 5).unwrap();

        let pyramid = ZoomPyramid::generate(&agg).unwrap();
        assert_eq!(pyramid.len(), 4);
        assert_eq!(pyramid.get(3), Some(&extent(2, 3, 5, 5)));
        assert_eq!(pyramid.get(2), Some(&extent(1, 1, 2, 2)));
        assert_eq!(pyramid.get(1), Some(&extent(0, 0, 1, 1)));
        assert_eq!(pyramid.get(0), Some(&extent(0, 0, 0, 0)));
    }

    #[test]
    fn test_single_tile_path() {
        let (z, x, y) = (12u8, 2_345u32, 1_234u32);
        let mut agg = TileAggregator::new(AggregatorConfig::default());
        agg.tile(z as i64, x as i64, y as i64).unwrap();
        let pyramid = ZoomPyramid::generate(&agg).unwrap();

        let mut tile = TileAddress::new(z, x, y).unwrap();
        loop {
            let level = pyramid.get(tile.zoom()).unwrap();
            assert_eq!(*level, ZoomExtent::from_tile(tile.column(), tile.row()));
            match tile.parent() {
                Some(parent) => tile = parent,
                None => break,
            }
        }
    }

    #[test]
    fn test_observed_levels_are_kept() {
        let mut observed = BTreeMap::new();
        observed.insert(2, extent(0, 0, 3, 3));
        observed.insert(4, extent(5, 5, 6, 6));

        let pyramid = ZoomPyramid::from_extents(&observed, Some(2)).unwrap();
        assert_eq!(pyramid.get(4), Some(&extent(5, 5, 6, 6)));
        assert_eq!(pyramid.get(2), Some(&extent(0, 0, 3, 3)));
        assert_eq!(pyramid.get(1), Some(&extent(0, 0, 1, 1)));
        assert_eq!(pyramid.get(3), None);
    }

    #[test]
    fn test_contains() {
        let mut agg = TileAggregator::new(AggregatorConfig::default());
        agg.tile(4, 9, 6).unwrap();
        let pyramid = ZoomPyramid::generate(&agg).unwrap();
        assert!(pyramid.contains(&TileAddress::new(2, 2, 1).unwrap()));
        assert!(!pyramid.contains(&TileAddress::new(2, 1, 1).unwrap()));
        assert!(!pyramid.contains(&TileAddress::new(5, 18, 12).unwrap()));
    }
}
