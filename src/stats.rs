use std::time::Duration;

use chrono::{DateTime, Utc};

/// Counters for one `start` run.
#[derive(Debug, Clone)]
pub struct RunStats {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub files_scanned: u64,
    pub jobs_selected: u64,
    pub attempts: u64,
    pub failed_attempts: u64,
    pub stale_attempts: u64,
    pub files_uploaded: u64,
    pub files_skipped: u64,
    pub bytes_uploaded: u64,
}

impl RunStats {
    pub fn new() -> Self {
        RunStats {
            start_time: Utc::now(),
            end_time: None,
            files_scanned: 0,
            jobs_selected: 0,
            attempts: 0,
            failed_attempts: 0,
            stale_attempts: 0,
            files_uploaded: 0,
            files_skipped: 0,
            bytes_uploaded: 0,
        }
    }

    pub fn end(&mut self) -> Duration {
        let end_time = Utc::now();
        self.end_time = Some(end_time);
        self.elapsed_time()
    }

    pub fn elapsed_time(&self) -> Duration {
        let end_time = self.end_time.unwrap_or_else(Utc::now);
        (end_time - self.start_time).to_std().unwrap_or_default()
    }
}

impl Default for RunStats {
    fn default() -> Self {
        RunStats::new()
    }
}
