//! GPX activity file loading
//!
//! One GPX file can carry several `<trk>` elements; each becomes its own
//! [`Track`]. Batch loading is forgiving: a file that fails to parse is
//! logged and skipped so one corrupt export cannot block a whole archive.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::track::Track;
use crate::{PipelineError, Result};

/// Parse a single GPX file into its tracks.
pub fn load_gpx(path: &Path) -> Result<Vec<Track>> {
    let file = File::open(path)?;
    let gpx = gpx::read(BufReader::new(file))?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let tracks = Track::from_gpx(&gpx, &filename);
    if tracks.is_empty() {
        return Err(PipelineError::EmptyTrack(filename));
    }
    Ok(tracks)
}

/// Parse a batch of GPX files, skipping any that fail.
pub fn parse_activity_files<P: AsRef<Path>>(paths: &[P]) -> Vec<Track> {
    let mut tracks = Vec::new();
    for path in paths {
        let path = path.as_ref();
        match load_gpx(path) {
            Ok(parsed) => {
                tracing::debug!(path = %path.display(), tracks = parsed.len(), "loaded GPX file");
                tracks.extend(parsed);
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping unreadable GPX file");
            }
        }
    }
    tracks
}
