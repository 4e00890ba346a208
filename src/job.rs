use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Number of jobs stored in one group file.
pub const GROUP_CAPACITY: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobItem {
    pub index: u64,
    pub path: PathBuf,
    #[serde(rename = "isUploaded")]
    pub uploaded: bool,
}

impl JobItem {
    pub fn new(index: u64, path: PathBuf) -> Self {
        JobItem {
            index,
            path,
            uploaded: false,
        }
    }

    /// Flips `uploaded` to true. Returns false if the item was already uploaded.
    pub fn mark_uploaded(&mut self) -> bool {
        if self.uploaded {
            return false;
        }

        self.uploaded = true;
        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Status {
    #[default]
    NotStarted,
    /// Never persisted; a crash mid-scan leaves the stored status at `NotStarted`.
    Scanning,
    Uploading,
    Completed,
}

impl TryFrom<u8> for Status {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Status::NotStarted),
            1 => Ok(Status::Uploading),
            2 => Ok(Status::Completed),
            _ => Err(Error::InvalidStatus(code)),
        }
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> Self {
        match status {
            Status::NotStarted | Status::Scanning => 0,
            Status::Uploading => 1,
            Status::Completed => 2,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::NotStarted => write!(f, "not started"),
            Status::Scanning => write!(f, "scanning"),
            Status::Uploading => write!(f, "uploading"),
            Status::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainDescriptor {
    pub status: Status,
    /// Number of fully uploaded groups.
    pub uploaded_group_index: u64,
    /// Files selected for upload.
    pub jobs_total: u64,
    /// Every file visited by the scan, selected or not.
    #[serde(default)]
    pub files_total: u64,
}

impl MainDescriptor {
    pub fn group_count(&self, capacity: usize) -> u64 {
        group_count(self.jobs_total, capacity)
    }

    /// Group that holds the next pending job (1-based).
    pub fn next_group_index(&self) -> u64 {
        self.uploaded_group_index + 1
    }
}

pub fn group_count(jobs_total: u64, capacity: usize) -> u64 {
    jobs_total.div_ceil(capacity as u64)
}
