use chrono::{DateTime, Local, NaiveDateTime};
use humansize::{format_size, BINARY};
use std::time::SystemTime;

/// Format a byte count with binary units (KiB, MiB, GiB)
pub fn format_bytes(size: u64) -> String {
    format_size(size, BINARY)
}

/// Format timestamp in human-readable format (YYYY-MM-DD HH:MM)
pub fn format_time(time: SystemTime) -> String {
    let datetime: DateTime<Local> = time.into();
    datetime.format("%Y-%m-%d %H:%M").to_string()
}

pub fn format_naive(time: &NaiveDateTime) -> String {
    time.format("%Y-%m-%d %H:%M").to_string()
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Format duration in seconds as `2d 3h`, `3h 12m` or `12m`
pub fn format_duration(secs: u64) -> String {
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024 * 1024), "1 MiB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(59), "0m");
        assert_eq!(format_duration(3 * 3600 + 12 * 60), "3h 12m");
        assert_eq!(format_duration(2 * 86400 + 3 * 3600), "2d 3h");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(12.345), "12.3%");
    }
}
