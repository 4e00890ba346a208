use std::path::Path;

use chrono::{DateTime, Local};
use humansize::DECIMAL;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Path for log lines, shell-quoted when it holds spaces or control characters.
pub fn format_path(path: &Path) -> String {
    snailquote::escape(&path.to_string_lossy()).into_owned()
}

pub fn format_bytes(bytes: u64) -> String {
    humansize::format_size(bytes, DECIMAL)
}

pub fn format_timestamp(time: &DateTime<Local>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_progress(done: u64, total: u64) -> String {
    if total == 0 {
        return format!("{done}/{total}");
    }

    #[allow(clippy::cast_precision_loss)]
    let percent = done as f64 * 100.0 / total as f64;
    format!("{done}/{total} ({percent:.1}%)")
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::{Local, TimeZone};

    use super::{format_bytes, format_path, format_progress, format_timestamp};

    #[test]
    fn plain_paths_are_left_alone() {
        assert_eq!(format_path(Path::new("/data/a.jpg")), "/data/a.jpg");

        let quoted = format_path(Path::new("/data/my photo.jpg"));
        assert_ne!(quoted, "/data/my photo.jpg");
        assert!(quoted.contains("my photo.jpg"));
    }

    #[test]
    fn progress_shows_share_done() {
        assert_eq!(format_progress(0, 0), "0/0");
        assert_eq!(format_progress(1, 8), "1/8 (12.5%)");
        assert_eq!(format_progress(5, 5), "5/5 (100.0%)");
    }

    #[test]
    fn bytes_use_decimal_units() {
        assert_eq!(format_bytes(999), "999 B");
        assert!(format_bytes(1_500_000).ends_with("MB"));
    }

    #[test]
    fn timestamp_is_second_precise() {
        let time = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(format_timestamp(&time), "2024-03-09 07:05:01");
    }
}
