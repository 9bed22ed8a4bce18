//! Tileset metadata and payload format detection.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tilepyr_geo::GeoBBox;

/// Image or tile encoding, as written to the `format` metadata key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileFormat {
    Png,
    Jpg,
    Webp,
    Pbf,
}

impl TileFormat {
    /// Guess the format from a payload's leading magic bytes.
    pub fn sniff(payload: &[u8]) -> Option<Self> {
        match payload {
            [0x89, b'P', b'N', b'G', ..] => Some(TileFormat::Png),
            [0xFF, 0xD8, 0xFF, ..] => Some(TileFormat::Jpg),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => {
                Some(TileFormat::Webp)
            }
            // Vector tiles are normally stored gzipped.
            [0x1F, 0x8B, ..] => Some(TileFormat::Pbf),
            _ => None,
        }
    }

    /// Returns the format as it appears in MBTiles metadata.
    pub const fn as_str(&self) -> &'static str {
        match self {
            TileFormat::Png => "png",
            TileFormat::Jpg => "jpg",
            TileFormat::Webp => "webp",
            TileFormat::Pbf => "pbf",
        }
    }
}

impl std::fmt::Display for TileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `metadata` table record describing the whole tile set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilesetMetadata {
    /// Human-readable tile set name.
    pub name: String,
    /// Tile payload format.
    pub format: TileFormat,
    /// `[west, south, east, north]`.
    pub bounds: Option<[f64; 4]>,
    /// `[longitude, latitude, zoom]` of the default view.
    pub center: Option<[f64; 3]>,
    pub minzoom: Option<u8>,
    pub maxzoom: Option<u8>,
    pub description: Option<String>,
    /// Either `overlay` or `baselayer`.
    #[serde(rename = "type")]
    pub layer_type: Option<String>,
    pub version: Option<String>,
    /// Any other keys, written verbatim.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl TilesetMetadata {
    /// Metadata with only the required `name` and `format` keys.
    pub fn new(name: impl Into<String>, format: TileFormat) -> Self {
        Self {
            name: name.into(),
            format,
            bounds: None,
            center: None,
            minzoom: None,
            maxzoom: None,
            description: None,
            layer_type: None,
            version: None,
            extra: BTreeMap::new(),
        }
    }

    /// Set the bounds from a geographic box.
    pub fn with_bounds(mut self, bbox: &GeoBBox) -> Self {
        self.bounds = Some(bbox.to_array());
        self
    }

    /// Set the default view.
    pub fn with_center(mut self, lon: f64, lat: f64, zoom: u8) -> Self {
        self.center = Some([lon, lat, zoom as f64]);
        self
    }

    /// Set the zoom range.
    pub fn with_zoom_range(mut self, minzoom: u8, maxzoom: u8) -> Self {
        self.minzoom = Some(minzoom);
        self.maxzoom = Some(maxzoom);
        self
    }

    /// Add a free-form key.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Flatten into the `(name, value)` rows stored in the `metadata` table.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("name".to_string(), self.name.clone()),
            ("format".to_string(), self.format.to_string()),
        ];
        if let Some(bounds) = self.bounds {
            pairs.push(("bounds".to_string(), join(&bounds)));
        }
        if let Some(center) = self.center {
            pairs.push(("center".to_string(), join(&center)));
        }
        if let Some(minzoom) = self.minzoom {
            pairs.push(("minzoom".to_string(), minzoom.to_string()));
        }
        if let Some(maxzoom) = self.maxzoom {
            pairs.push(("maxzoom".to_string(), maxzoom.to_string()));
        }
        let optional = [
            ("description", &self.description),
            ("type", &self.layer_type),
            ("version", &self.version),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                pairs.push((key.to_string(), value.clone()));
            }
        }
        pairs.extend(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        pairs
    }
}

fn join(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
