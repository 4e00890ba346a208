use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tokio::fs;

use crate::{
    config::Config,
    error::Result,
    format::format_path,
    job::{JobItem, MainDescriptor},
};

use super::{read_json, try_read_json, write_json, JobStore};

const CONFIG_FILE: &str = "config.json";
const MAIN_FILE: &str = "jobs-main.json";

static GROUP_FILE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^jobs-\d+").unwrap());

/// On-disk shape of the main descriptor. Group contents live only in the
/// group files, so the job list is always written empty.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MainFile<'a> {
    #[serde(flatten)]
    main: &'a MainDescriptor,
    current_jobs_list: [JobItem; 0],
}

/// Stores every file of a job as JSON in one data directory.
#[derive(Debug, Clone)]
pub struct LocalJobStore {
    dir: PathBuf,
}

impl LocalJobStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        LocalJobStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn main_path(&self) -> PathBuf {
        self.dir.join(MAIN_FILE)
    }

    pub fn group_path(&self, index: u64) -> PathBuf {
        self.dir.join(group_file_name(index))
    }

    /// Missing config is the same as a reset one.
    pub async fn load_config(&self) -> Result<Config> {
        let config = try_read_json(&self.config_path()).await?;
        Ok(config.unwrap_or_default())
    }

    pub async fn save_config(&self, config: &Config) -> Result<()> {
        write_json(&self.config_path(), config).await
    }

    /// Puts the data directory back to its freshly installed state and
    /// returns the number of group files removed.
    pub async fn reset(&self) -> Result<usize> {
        self.save_config(&Config::default()).await?;
        self.save_main(&MainDescriptor::default()).await?;

        let mut removed = 0;
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if is_group_file(&name.to_string_lossy()) {
                let path = entry.path();
                fs::remove_file(&path).await?;
                debug!("removed {}", format_path(&path));
                removed += 1;
            }
        }

        Ok(removed)
    }
}

#[async_trait]
impl JobStore for LocalJobStore {
    async fn load_main(&self) -> Result<MainDescriptor> {
        let main = try_read_json(&self.main_path()).await?;
        Ok(main.unwrap_or_default())
    }

    async fn save_main(&self, main: &MainDescriptor) -> Result<()> {
        let file = MainFile {
            main,
            current_jobs_list: [],
        };
        write_json(&self.main_path(), &file).await
    }

    async fn load_group(&self, index: u64) -> Result<Vec<JobItem>> {
        read_json(&self.group_path(index)).await
    }

    async fn save_group(&self, index: u64, items: &[JobItem]) -> Result<()> {
        write_json(&self.group_path(index), &items).await
    }
}

pub fn group_file_name(index: u64) -> String {
    format!("jobs-{index:03}.json")
}

fn is_group_file(name: &str) -> bool {
    GROUP_FILE_REGEX.is_match(name)
}
