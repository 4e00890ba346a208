use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;

use crate::error::{Error, Result};

pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)
        .await
        .map_err(|err| Error::job_file(path, err))?;
    serde_json::from_slice(&bytes).map_err(|err| Error::job_file(path, err))
}

/// Like [`read_json`], but a missing file yields `None`.
pub async fn try_read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::try_exists(path).await {
        Ok(false) => Ok(None),
        Ok(true) => read_json(path).await.map(Some),
        Err(err) => Err(Error::job_file(path, err)),
    }
}

/// Writes pretty-printed JSON through a temporary file, so a crash never
/// leaves a truncated file behind.
pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|err| Error::persistence(path, err))?;
    let tmp_path = path.with_extension("json.tmp");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|err| Error::persistence(path, err))?;
    }

    fs::write(&tmp_path, bytes)
        .await
        .map_err(|err| Error::persistence(path, err))?;
    fs::rename(&tmp_path, path)
        .await
        .map_err(|err| Error::persistence(path, err))?;
    Ok(())
}
