mod http;

use std::{io, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use crate::{config::UploadFields, job::JobItem};

pub use self::http::{response_accepted, HttpUploader, FILE_FIELD};

/// Bytes sent on success.
pub type Outcome = std::result::Result<u64, UploadError>;

pub type SharedUploader = Arc<dyn Uploader>;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("failed to read file: {0}")]
    Read(#[from] io::Error),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded with status {0}")]
    Status(u16),

    #[error("server did not report success")]
    Rejected,
}

/// One upload attempt for one file.
///
/// An attempt resolves exactly once, or never; the scheduler recovers attempts
/// that never resolve.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, item: &JobItem, fields: &UploadFields) -> Outcome;
}
