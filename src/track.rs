//! Track storage: immutable point sequences with stable indices

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use geo::BoundingRect;

use crate::geometry;

/// A single recorded position in WGS84 degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    /// Elevation in meters, if the recording device provided it.
    pub elevation: Option<f64>,
    /// Unix timestamp in seconds, if the recording device provided it.
    pub time: Option<f64>,
}

impl TrackPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            elevation: None,
            time: None,
        }
    }

    /// A point is usable only with finite, in-range coordinates.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// One continuous recorded path as an ordered point sequence.
///
/// Tracks are immutable by convention: simplification, deduplication and
/// filtering all produce new `Track` values so that `(track, point)` index
/// pairs stay valid against the array they were computed from.
#[derive(Clone, Debug)]
pub struct Track {
    /// Short stable identifier, independent of array position.
    pub id: String,
    pub filename: String,
    pub name: Option<String>,
    pub points: Vec<TrackPoint>,
}

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a short identifier for a freshly parsed track.
pub(crate) fn light_id(seed: &str) -> String {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    ID_COUNTER.fetch_add(1, Ordering::Relaxed).hash(&mut hasher);
    format!("{:08x}", hasher.finish() as u32)
}

impl Track {
    /// Create a track from raw points, dropping malformed coordinates.
    ///
    /// Offending points are excluded with a warning rather than propagated
    /// as an error; a track may end up empty and will then simply not render.
    pub fn new(filename: impl Into<String>, points: Vec<TrackPoint>) -> Self {
        let filename = filename.into();
        let total = points.len();
        let points: Vec<TrackPoint> = points.into_iter().filter(TrackPoint::is_valid).collect();
        if points.len() < total {
            tracing::warn!(
                file = %filename,
                dropped = total - points.len(),
                "dropped points with invalid coordinates"
            );
        }
        Self {
            id: light_id(&filename),
            filename,
            name: None,
            points,
        }
    }

    /// Convert parsed GPX into tracks, one per `<trk>`.
    ///
    /// Segments are concatenated in order: the data model is a single flat
    /// point sequence per track, and segment splitting only ever happens in
    /// deduplication.
    pub fn from_gpx(gpx: &gpx::Gpx, filename: &str) -> Vec<Track> {
        gpx.tracks
            .iter()
            .map(|gpx_track| {
                let points = gpx_track
                    .segments
                    .iter()
                    .flat_map(|segment| segment.points.iter())
                    .map(|wp| TrackPoint {
                        lat: wp.point().y(),
                        lon: wp.point().x(),
                        elevation: wp.elevation,
                        time: wp
                            .time
                            .map(|t| time::OffsetDateTime::from(t).unix_timestamp() as f64),
                    })
                    .collect();
                let mut track = Track::new(filename, points);
                track.name = gpx_track.name.clone();
                track
            })
            .collect()
    }

    /// New track sharing this track's identity but holding a point subset.
    /// Used by deduplication when a track is split at an ownership change.
    pub fn fragment(&self, points: Vec<TrackPoint>) -> Track {
        Track {
            id: self.id.clone(),
            filename: self.filename.clone(),
            name: self.name.clone(),
            points,
        }
    }

    /// Fewer than 2 points cannot form a polyline and contribute nothing.
    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 2
    }

    /// Total length in meters (haversine sum over consecutive points).
    pub fn total_distance(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| geometry::haversine_distance(&w[0], &w[1]))
            .sum()
    }

    /// Geographic bounding box, or `None` for an empty track.
    pub fn bounds(&self) -> Option<crate::LatLngBounds> {
        let line: geo::LineString = self
            .points
            .iter()
            .map(|p| geo::coord! { x: p.lon, y: p.lat })
            .collect();
        let rect = line.bounding_rect()?;
        Some(crate::LatLngBounds {
            north: rect.max().y,
            south: rect.min().y,
            east: rect.max().x,
            west: rect.min().x,
        })
    }
}
