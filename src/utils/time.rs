//! Timestamp and duration formatting

use chrono::{DateTime, Local, TimeZone};

/// Layout of the report's `analysis_timestamp`
pub const ANALYSIS_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local wall-clock time as an analysis timestamp
pub fn analysis_timestamp() -> String {
    format_timestamp(&Local::now())
}

/// Format any zoned time as an analysis timestamp
pub fn format_timestamp<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format(ANALYSIS_TIMESTAMP_FORMAT).to_string()
}

/// Seconds rendered as `HH:MM:SS.mmm`, or `MM:SS.mmm` under an hour
pub fn format_seconds(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "--:--.---".to_string();
    }
    let total_millis = (seconds * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
    } else {
        format!("{:02}:{:02}.{:03}", minutes, secs, millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_timestamp_layout() {
        let time = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(format_timestamp(&time), "2024-03-07 09:05:02");
    }

    #[test]
    fn test_current_timestamp_shape() {
        let stamp = analysis_timestamp();
        assert_eq!(stamp.len(), 19);
        assert!(chrono::NaiveDateTime::parse_from_str(&stamp, ANALYSIS_TIMESTAMP_FORMAT).is_ok());
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0.0), "00:00.000");
        assert_eq!(format_seconds(10.0), "00:10.000");
        assert_eq!(format_seconds(75.5), "01:15.500");
        assert_eq!(format_seconds(3725.25), "01:02:05.250");
        assert_eq!(format_seconds(f64::NAN), "--:--.---");
    }
}
