//! Common utilities and helpers

pub mod logging;
pub mod path;
pub mod time;

/// Bytes per megabyte in human-readable sizes
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Format file size for display
pub fn format_file_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Size in megabytes with two decimals
pub fn format_megabytes(size: u64) -> String {
    format!("{:.2} MB", size as f64 / BYTES_PER_MB)
}

/// Calculate progress percentage
pub fn calculate_progress(current: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (current as f64 / total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.50 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_format_megabytes() {
        assert_eq!(format_megabytes(0), "0.00 MB");
        assert_eq!(format_megabytes(3 * 1024 * 1024 / 2), "1.50 MB");
    }

    #[test]
    fn test_calculate_progress() {
        assert_eq!(calculate_progress(5, 0), 0.0);
        assert_eq!(calculate_progress(25, 100), 25.0);
    }
}
