use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{Error, Result};

/// Settings written by `init`, stored as `config.json` in the data directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extname: Option<String>,

    #[serde(default)]
    pub is_inited: bool,
}

/// Validated view of an initialized [`Config`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub server_url: String,
    pub folder_path: PathBuf,
    pub extensions: ExtensionSet,
}

impl Config {
    /// Merges the required `init` fields into this config. Nothing is changed
    /// unless every field is present and the folder exists.
    pub async fn init(
        mut self,
        server_url: Option<String>,
        folder_path: Option<PathBuf>,
        extname: Option<String>,
    ) -> Result<Config> {
        let server_url = required("serverUrl", server_url)?;
        let folder_path = required("folderPath", folder_path)?;
        let extname = required("extname", extname)?;

        ensure_folder(&folder_path).await?;

        self.server_url = Some(server_url);
        self.folder_path = Some(folder_path);
        self.extname = Some(extname);
        self.is_inited = true;
        Ok(self)
    }

    pub fn settings(&self) -> Result<Settings> {
        if !self.is_inited {
            return Err(Error::NotInitialized);
        }

        let server_url = required("serverUrl", self.server_url.clone())?;
        let folder_path = required("folderPath", self.folder_path.clone())?;
        let extname = required("extname", self.extname.as_deref())?;

        Ok(Settings {
            server_url,
            folder_path,
            extensions: ExtensionSet::parse(extname),
        })
    }
}

fn required<T>(name: &'static str, value: Option<T>) -> Result<T> {
    value.ok_or(Error::MissingConfigField(name))
}

async fn ensure_folder(path: &Path) -> Result<()> {
    match fs::metadata(path).await {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        _ => Err(Error::FolderNotFound(path.to_owned())),
    }
}

/// Lower-cased extensions, each with a leading dot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet(BTreeSet<String>);

impl ExtensionSet {
    /// Parses a comma-separated list such as `jpg, .PNG`.
    pub fn parse(list: &str) -> Self {
        let extensions = list
            .split(',')
            .map(str::trim)
            .filter(|ext| !ext.is_empty() && *ext != ".")
            .map(|ext| {
                let ext = ext.to_lowercase();
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{ext}")
                }
            })
            .collect();
        ExtensionSet(extensions)
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.0.contains(extension)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Lower-cased extension of `path` with a leading dot, or an empty string.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Extra form fields sent with every upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadFields(BTreeMap<String, String>);

impl UploadFields {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for UploadFields {
    type Err = Error;

    /// Parses `key=value` pairs separated by commas.
    fn from_str(s: &str) -> Result<Self> {
        let mut fields = BTreeMap::new();
        for pair in s.split(',').filter(|pair| !pair.trim().is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| Error::InvalidUploadParam(pair.to_owned()))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(Error::InvalidUploadParam(pair.to_owned()));
            }

            fields.insert(key.to_owned(), value.to_owned());
        }

        Ok(UploadFields(fields))
    }
}
