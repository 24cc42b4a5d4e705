//! Headless demo driver: load GPX files, simulate one viewport settle event
//! and report what would be rendered. Useful for smoke-testing an activity
//! archive and for profiling the pipeline without a map widget.

use std::path::PathBuf;

use clap::Parser;

use fog_of_walk::fog::{FogConfig, WebMercatorProjection, build_fog_frame};
use fog_of_walk::import::parse_activity_files;
use fog_of_walk::{LatLngBounds, PipelineConfig, RenderPipeline, Viewport};

#[derive(Parser, Debug)]
#[command(name = "fog-of-walk", version, about = "Viewport-adaptive GPS track renderer with a fog-of-war overlay")]
struct Args {
    /// GPX activity files to load
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Zoom level of the simulated viewport
    #[arg(long, default_value_t = 13.0)]
    zoom: f64,

    /// Reveal radius around visited points, in meters
    #[arg(long, default_value_t = 250.0)]
    radius: f64,
}

fn combined_bounds(tracks: &[fog_of_walk::Track]) -> Option<LatLngBounds> {
    tracks
        .iter()
        .filter_map(|t| t.bounds())
        .reduce(|a, b| LatLngBounds {
            north: a.north.max(b.north),
            south: a.south.min(b.south),
            east: a.east.max(b.east),
            west: a.west.min(b.west),
        })
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let tracks = parse_activity_files(&args.files);
    if tracks.is_empty() {
        tracing::error!("no usable tracks in the given files");
        std::process::exit(1);
    }
    tracing::info!(tracks = tracks.len(), "loaded activity files");

    let Some(bounds) = combined_bounds(&tracks) else {
        tracing::error!("tracks contain no usable points");
        std::process::exit(1);
    };

    let mut pipeline = RenderPipeline::new(PipelineConfig::default());
    pipeline.set_tracks(tracks);

    let viewport = Viewport {
        north: bounds.north,
        south: bounds.south,
        east: bounds.east,
        west: bounds.west,
        zoom: args.zoom,
    };

    let frame = pipeline.prepare_frame(&viewport);
    let rendered_points: usize = frame.tracks.iter().map(|t| t.points.len()).sum();
    tracing::info!(
        frame = frame.frame,
        zoom = viewport.zoom,
        polylines = frame.tracks.len(),
        points = rendered_points,
        "prepared render frame"
    );

    let fog_config = FogConfig {
        discovery_radius_meters: args.radius,
        ..FogConfig::default()
    };
    let projection = WebMercatorProjection { zoom: args.zoom };
    let fog = build_fog_frame(
        pipeline.tracks(),
        &frame.visible,
        &viewport,
        &projection,
        &fog_config,
    );
    tracing::info!(
        paths = fog.paths.len(),
        circles = fog.circles.len(),
        "prepared fog mask"
    );
}
