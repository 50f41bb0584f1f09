//! Input discovery and output naming

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::probe::is_supported_video;

/// Marker placed between a video's file name and its report extension
pub const REPORT_MARKER: &str = ".forensic";

/// Supported video files under `root`, sorted by path.
///
/// Unreadable directory entries are logged and skipped.
pub fn collect_videos(root: &Path) -> Vec<PathBuf> {
    let mut videos: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_supported_video(path))
        .collect();

    videos.sort();
    debug!(count = videos.len(), "Collected videos under {}", root.display());
    videos
}

/// Report path for `video` inside `output_dir`: `<file name>.forensic.<extension>`
pub fn report_path_for(video: &Path, output_dir: &Path, extension: &str) -> PathBuf {
    let name = video
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    output_dir.join(format!("{}{}.{}", name, REPORT_MARKER, extension))
}

/// Report path for `video` discovered under `input_root`.
///
/// The video's subdirectory below `input_root` is recreated below
/// `output_dir`, so equal file names in different folders get distinct reports.
pub fn mirrored_report_path(
    video: &Path,
    input_root: &Path,
    output_dir: &Path,
    extension: &str,
) -> PathBuf {
    let dir = video
        .parent()
        .and_then(|parent| parent.strip_prefix(input_root).ok())
        .map(|relative| output_dir.join(relative))
        .unwrap_or_else(|| output_dir.to_path_buf());
    report_path_for(video, &dir, extension)
}

/// File name component of `path` as reported in forensic reports
pub fn display_file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
