mod select;

#[cfg(test)]
mod tests;

use std::{
    io,
    path::{Path, PathBuf},
};

use async_walkdir::{DirEntry, WalkDir};
use clap::builder::styling::AnsiColor;
use log::{debug, info, trace};
use tokio::fs;
use tokio_stream::StreamExt;

use crate::{
    error::{Error, Result, OK},
    format::format_path,
    job::{JobItem, MainDescriptor, Status, GROUP_CAPACITY},
    store::JobStore,
};

pub use self::select::{is_thumbnail, ExcludeFn, Selector};

/// Walks the upload folder once and writes the job as group files.
///
/// Linked files are followed, linked folders are not descended into.
#[derive(Debug)]
pub struct Scanner {
    selector: Selector,
    capacity: usize,
}

impl Scanner {
    pub fn new(selector: Selector) -> Self {
        Scanner {
            selector,
            capacity: GROUP_CAPACITY,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Scans `root` depth-first, persisting every full group as soon as it
    /// fills up and the main descriptor (status `Uploading`) last.
    ///
    /// Any read or stat failure aborts the scan. Groups already written stay
    /// valid, but the job has to be reset before it can be scanned again.
    pub async fn run(&self, store: &dyn JobStore, root: &Path) -> Result<MainDescriptor> {
        let metadata = fs::metadata(root).await.map_err(|source| Error::Scan {
            path: root.to_owned(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(Error::Scan {
                path: root.to_owned(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a folder"),
            });
        }

        let mut groups = GroupWriter::new(store, self.capacity);
        let mut walker = WalkDir::new(root);

        while let Some(entry) = walker.next().await {
            let entry = entry.map_err(|err| Error::Scan {
                path: root.to_owned(),
                source: io::Error::other(err.to_string()),
            })?;

            let path = entry.path();
            if is_file(&entry, &path).await? {
                groups.visit(path, &self.selector).await?;
            }
        }

        let main = groups.finish().await?;
        let style = AnsiColor::Green.on_default();
        info!(
            "{style}scan finished{style:#} {} of {} files selected",
            main.jobs_total, main.files_total
        );
        Ok(main)
    }
}

async fn is_file(entry: &DirEntry, path: &Path) -> Result<bool> {
    let file_type = entry.file_type().await.map_err(|source| Error::Scan {
        path: path.to_owned(),
        source,
    })?;

    if file_type.is_symlink() {
        let metadata = fs::metadata(path).await.map_err(|source| Error::Scan {
            path: path.to_owned(),
            source,
        })?;
        if metadata.is_dir() {
            debug!("not following linked folder {}", format_path(path));
        }
        return Ok(metadata.is_file());
    }

    Ok(file_type.is_file())
}

/// Buffers selected jobs and flushes them to the store one group at a time.
struct GroupWriter<'a> {
    store: &'a dyn JobStore,
    capacity: usize,
    main: MainDescriptor,
    buffer: Vec<JobItem>,
    groups_written: u64,
}

impl<'a> GroupWriter<'a> {
    fn new(store: &'a dyn JobStore, capacity: usize) -> Self {
        GroupWriter {
            store,
            capacity,
            main: MainDescriptor {
                status: Status::Scanning,
                ..MainDescriptor::default()
            },
            buffer: Vec::with_capacity(capacity),
            groups_written: 0,
        }
    }

    async fn visit(&mut self, path: PathBuf, selector: &Selector) -> Result<()> {
        self.main.files_total += 1;
        if !selector.selects(&path) {
            trace!("skipped {}", format_path(&path));
            return OK;
        }

        let item = JobItem::new(self.main.jobs_total, path);
        self.main.jobs_total += 1;
        self.buffer.push(item);

        if self.buffer.len() >= self.capacity {
            self.flush().await?;
        }

        OK
    }

    async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return OK;
        }

        let index = self.groups_written + 1;
        self.store.save_group(index, &self.buffer).await?;
        self.groups_written = index;
        self.buffer.clear();

        debug!(
            "wrote group {index} ({} jobs selected, {} files scanned)",
            self.main.jobs_total, self.main.files_total
        );
        OK
    }

    async fn finish(mut self) -> Result<MainDescriptor> {
        self.flush().await?;
        self.main.status = Status::Uploading;
        self.store.save_main(&self.main).await?;
        Ok(self.main)
    }
}
