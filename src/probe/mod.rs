//! Media file inspection module

pub mod inspector;

pub use inspector::MetadataReader;

/// File extensions accepted for analysis
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv"];

/// Whether a path carries one of the accepted video extensions
pub fn is_supported_video(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}
