use chrono::{Local, TimeZone, Utc};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 将毫秒时间戳格式化为本地时间 HH:MM:SS.mmm
pub fn format_timestamp(timestamp_ms: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms).single() {
        Some(time) => time.format("%H:%M:%S%.3f").to_string(),
        None => format!("Invalid timestamp: {}", timestamp_ms),
    }
}

/// Seconds relative to `reference_ms`, for plot x axes.
pub fn relative_seconds(timestamp_ms: i64, reference_ms: i64) -> f64 {
    (timestamp_ms - reference_ms) as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_millisecond_precision() {
        let formatted = format_timestamp(1_700_000_000_123);
        assert!(formatted.ends_with(".123"), "{formatted}");
        assert_eq!(formatted.len(), "00:00:00.000".len());
    }

    #[test]
    fn out_of_range_timestamp_is_reported() {
        assert!(format_timestamp(i64::MAX).starts_with("Invalid timestamp"));
    }

    #[test]
    fn relative_seconds_is_signed() {
        assert_eq!(relative_seconds(1_500, 2_000), -0.5);
        assert_eq!(relative_seconds(4_000, 2_000), 2.0);
    }
}
