//! Slippy-map tile math: addressing, bounds and viewport coverage

use std::fmt;
use std::str::FromStr;

use crate::PipelineError;

/// A quad-tree tile address in the standard slippy-map scheme
/// (Web Mercator, `2^z` tiles per axis).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

/// Geographic bounding box in WGS84 degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatLngBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl LatLngBounds {
    pub fn intersects(&self, other: &LatLngBounds) -> bool {
        !(self.south > other.north
            || self.north < other.south
            || self.west > other.east
            || self.east < other.west)
    }
}

/// The geographic box plus zoom currently visible on screen, as produced by
/// the map widget on every pan/zoom settle event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    pub zoom: f64,
}

impl Viewport {
    pub fn bounds(&self) -> LatLngBounds {
        LatLngBounds {
            north: self.north,
            south: self.south,
            east: self.east,
            west: self.west,
        }
    }

    /// Latitude of the viewport center, used for pixel-resolution conversions.
    pub fn center_lat(&self) -> f64 {
        (self.north + self.south) / 2.0
    }
}

/// Tile containing the given coordinate at the given zoom.
///
/// Indices are clamped to `[0, 2^z - 1]` so that poles and the antimeridian
/// still map to a valid tile.
pub fn tile_at(lat: f64, lon: f64, zoom: u8) -> TileKey {
    let n = 2f64.powi(zoom as i32);
    let lat_rad = lat.to_radians();

    let x = ((lon + 180.0) / 360.0 * n).floor();
    let y = ((1.0 - lat_rad.tan().asinh() / std::f64::consts::PI) / 2.0 * n).floor();

    let max = n - 1.0;
    TileKey {
        x: x.clamp(0.0, max) as u32,
        y: y.clamp(0.0, max) as u32,
        z: zoom,
    }
}

impl TileKey {
    /// Geographic bounds of this tile (inverse of the tile projection).
    pub fn bounds(&self) -> LatLngBounds {
        let n = 2f64.powi(self.z as i32);
        let west = self.x as f64 / n * 360.0 - 180.0;
        let east = (self.x as f64 + 1.0) / n * 360.0 - 180.0;
        let north = (std::f64::consts::PI * (1.0 - 2.0 * self.y as f64 / n))
            .sinh()
            .atan()
            .to_degrees();
        let south = (std::f64::consts::PI * (1.0 - 2.0 * (self.y as f64 + 1.0) / n))
            .sinh()
            .atan()
            .to_degrees();

        LatLngBounds {
            north,
            south,
            east,
            west,
        }
    }
}

/// Tiles covering the viewport at its integer zoom, expanded by
/// `buffer_tiles` on each side so that small pans do not immediately reveal
/// unindexed tiles. Indices are clamped to the valid range.
pub fn tiles_in_bounds(viewport: &Viewport, buffer_tiles: u32) -> Vec<TileKey> {
    let zoom = viewport.zoom.floor().clamp(0.0, 30.0) as u8;

    let top_left = tile_at(viewport.north, viewport.west, zoom);
    let bottom_right = tile_at(viewport.south, viewport.east, zoom);

    let max = (2u64.pow(zoom as u32) - 1) as u32;
    let min_x = top_left.x.saturating_sub(buffer_tiles);
    let max_x = bottom_right.x.saturating_add(buffer_tiles).min(max);
    let min_y = top_left.y.saturating_sub(buffer_tiles);
    let max_y = bottom_right.y.saturating_add(buffer_tiles).min(max);

    // An inverted box (west past east across the antimeridian) covers no
    // contiguous tile range; degrade to empty rather than wrap
    if min_x > max_x || min_y > max_y {
        return Vec::new();
    }

    let mut tiles = Vec::with_capacity(
        ((max_x - min_x + 1) as usize) * ((max_y - min_y + 1) as usize),
    );
    for x in min_x..=max_x {
        for y in min_y..=max_y {
            tiles.push(TileKey { x, y, z: zoom });
        }
    }
    tiles
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.z, self.x, self.y)
    }
}

impl FromStr for TileKey {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('-');
        let parse = |part: Option<&str>| {
            part.and_then(|p| p.parse::<u32>().ok())
                .ok_or_else(|| PipelineError::InvalidTileKey(s.to_string()))
        };
        let z = parse(parts.next())?;
        let x = parse(parts.next())?;
        let y = parse(parts.next())?;
        if parts.next().is_some() || z > u8::MAX as u32 {
            return Err(PipelineError::InvalidTileKey(s.to_string()));
        }
        Ok(TileKey { x, y, z: z as u8 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_at_origin() {
        // (0, 0) sits at the junction of the four center tiles
        let tile = tile_at(0.0, 0.0, 1);
        assert_eq!(tile, TileKey { x: 1, y: 1, z: 1 });
    }

    #[test]
    fn test_tile_at_known_location() {
        // London at zoom 10 lands on the well-known OSM tile 511/340
        let tile = tile_at(51.5074, -0.1278, 10);
        assert_eq!(tile.x, 511);
        assert_eq!(tile.y, 340);
    }

    #[test]
    fn test_tile_at_clamps_poles() {
        let tile = tile_at(89.9, 180.0, 4);
        assert!(tile.x <= 15);
        assert!(tile.y <= 15);
    }

    #[test]
    fn test_bounds_roundtrip() {
        let tile = tile_at(51.5074, -0.1278, 12);
        let bounds = tile.bounds();
        assert!(bounds.south < 51.5074 && 51.5074 < bounds.north);
        assert!(bounds.west < -0.1278 && -0.1278 < bounds.east);
    }

    #[test]
    fn test_key_roundtrip() {
        for z in [1u8, 5, 12, 18] {
            let n = 2u32.pow(z as u32);
            for (x, y) in [(0, 0), (n / 2, n / 3), (n - 1, n - 1)] {
                let key = TileKey { x, y, z };
                let parsed: TileKey = key.to_string().parse().unwrap();
                assert_eq!(parsed, key);
            }
        }
    }

    #[test]
    fn test_key_parse_rejects_garbage() {
        assert!("".parse::<TileKey>().is_err());
        assert!("1-2".parse::<TileKey>().is_err());
        assert!("a-b-c".parse::<TileKey>().is_err());
        assert!("1-2-3-4".parse::<TileKey>().is_err());
    }

    #[test]
    fn test_tiles_in_bounds_covers_viewport() {
        // All tiles whose bounds intersect the box must be returned
        let viewport = Viewport {
            north: 1.0,
            south: -1.0,
            east: 1.0,
            west: -1.0,
            zoom: 1.0,
        };
        let tiles = tiles_in_bounds(&viewport, 0);
        // At zoom 1 the box around (0,0) straddles all four tiles
        assert_eq!(tiles.len(), 4);
        for tile in &tiles {
            assert!(tile.bounds().intersects(&viewport.bounds()));
        }
    }

    #[test]
    fn test_tiles_in_bounds_buffer() {
        let viewport = Viewport {
            north: 51.6,
            south: 51.4,
            east: 0.1,
            west: -0.3,
            zoom: 12.0,
        };
        let without = tiles_in_bounds(&viewport, 0);
        let with = tiles_in_bounds(&viewport, 1);
        assert!(with.len() > without.len());
        for tile in &without {
            assert!(with.contains(tile));
        }
    }

    #[test]
    fn test_tiles_in_bounds_antimeridian_viewport() {
        // A viewport straddling the antimeridian (west > east, e.g. around
        // Fiji) has no contiguous tile range; it must yield nothing, not panic
        let viewport = Viewport {
            north: -16.0,
            south: -19.0,
            east: -179.0,
            west: 178.0,
            zoom: 8.0,
        };
        assert!(tiles_in_bounds(&viewport, 1).is_empty());
    }

    #[test]
    fn test_tiles_in_bounds_clamps_at_edge() {
        let viewport = Viewport {
            north: 85.0,
            south: 80.0,
            east: 179.9,
            west: 170.0,
            zoom: 3.0,
        };
        for tile in tiles_in_bounds(&viewport, 2) {
            assert!(tile.x < 8);
            assert!(tile.y < 8);
        }
    }
}
