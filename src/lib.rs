//! Fog of Walk - Viewport-Adaptive GPS Track Rendering Core
//!
//! This library renders GPS activity tracks on an interactive map with a
//! "fog of war" overlay that reveals only areas previously visited. It takes
//! potentially huge polylines (tens of thousands of points per track, many
//! tracks) and, on every pan/zoom settle event, produces a reduced point set
//! that can be rendered and fog-masked in real time.
//!
//! # Architecture
//!
//! - **[`Track`]**: Immutable storage for parsed activity data
//! - **[`TileIndex`]**: Per-zoom tile buckets built once per track set,
//!   queried cheaply on every viewport change
//! - **[`simplify`]**: Douglas-Peucker reduction and zoom-proportional
//!   distance decimation
//! - **[`dedup`]**: Cross-track overlap collapse via a spatial hash grid
//! - **[`RenderPipeline`]**: Orchestrator composing deduplication,
//!   simplification and visibility lookup per frame
//! - **[`fog`]**: Mask geometry (paths + circles) for the fog overlay
//!
//! # Performance Characteristics
//!
//! - **Index build**: O(tracks x points x zoom levels), parallelized over
//!   tracks; rebuilt only when the track set changes
//! - **Per-frame query**: O(tiles in view), independent of total point count

pub mod dedup;
pub mod fog;
pub mod geometry;
pub mod import;
mod index;
mod pipeline;
pub mod simplify;
mod tiles;
mod track;
mod viewport;

// Public API exports
pub use index::{TileIndex, VisiblePoints};
pub use pipeline::{FrameOutput, PipelineConfig, RenderPipeline, RenderTrack};
pub use tiles::{LatLngBounds, TileKey, Viewport, tile_at, tiles_in_bounds};
pub use track::{Track, TrackPoint};
pub use viewport::{Subscription, ViewportTracker};

/// Error types for the rendering core
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("GPX parsing error: {0}")]
    GpxParse(#[from] gpx::errors::GpxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid tile key: {0}")]
    InvalidTileKey(String),

    #[error("No tracks in file: {0}")]
    EmptyTrack(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
