mod json;
mod local;


use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;

use crate::{
    error::Result,
    job::{JobItem, MainDescriptor},
};

pub use self::{
    json::{read_json, try_read_json, write_json},
    local::LocalJobStore,
};

pub type SharedJobStore = Arc<dyn JobStore>;

/// Persistence for the main descriptor and the group files.
///
/// Writes report failures as [`Error::Persistence`](crate::error::Error::Persistence);
/// callers decide whether that is fatal.
#[async_trait]
pub trait JobStore: Debug + Send + Sync {
    async fn load_main(&self) -> Result<MainDescriptor>;
    async fn save_main(&self, main: &MainDescriptor) -> Result<()>;

    /// Loads group `index` (1-based).
    async fn load_group(&self, index: u64) -> Result<Vec<JobItem>>;
    async fn save_group(&self, index: u64, items: &[JobItem]) -> Result<()>;
}
