mod from;

use std::{fmt::Display, path::PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

pub const OK: Result<()> = Ok(());

#[derive(Error, Debug)]
pub enum Error {
    #[error("`{0}` is required")]
    MissingConfigField(&'static str),

    #[error("folder `{0}` does not exist")]
    FolderNotFound(PathBuf),

    #[error("not initialized, run `upmany init` first")]
    NotInitialized,

    #[error("upload param `{0}` is invalid (expected `key=value`)")]
    InvalidUploadParam(String),

    #[error("status code {0} is invalid")]
    InvalidStatus(u8),

    #[error("failed to scan `{path}`: {source}")]
    Scan {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write `{path}`: {source}")]
    Persistence {
        path: PathBuf,
        source: AnyError,
    },

    #[error("failed to read `{path}`: {source}")]
    JobFile {
        path: PathBuf,
        source: AnyError,
    },

    #[error("{0} job(s) failed permanently")]
    PermanentFailures(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(AnyError),
}

#[derive(Error, Debug)]
pub struct AnyError(anyhow::Error);

impl Display for AnyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AnyError {
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        AnyError(error.into())
    }
}

impl Error {
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Other(AnyError::new(error))
    }

    pub fn persistence<P, E>(path: P, error: E) -> Self
    where
        P: Into<PathBuf>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Persistence {
            path: path.into(),
            source: AnyError::new(error),
        }
    }

    pub fn job_file<P, E>(path: P, error: E) -> Self
    where
        P: Into<PathBuf>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::JobFile {
            path: path.into(),
            source: AnyError::new(error),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(error: anyhow::Error) -> Self {
        Error::Other(AnyError(error))
    }
}
