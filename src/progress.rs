use log::{debug, warn};

use crate::{
    job::{JobItem, MainDescriptor},
    store::SharedJobStore,
};

/// Default number of uploads between two checkpoints.
pub const DEFAULT_CHECKPOINT_EVERY: u64 = 100;

/// Upload flags of the group being worked on.
#[derive(Debug, Clone, Copy)]
pub struct GroupSnapshot<'a> {
    pub index: u64,
    pub items: &'a [JobItem],
}

/// Writes throttled checkpoints of the scheduler state.
///
/// A failed write is logged and swallowed: the run carries on in memory and
/// only the uploads since the last good checkpoint are at risk.
#[derive(Debug, Clone)]
pub struct ProgressPersister {
    store: SharedJobStore,
    every: u64,
}

impl ProgressPersister {
    pub fn new(store: SharedJobStore, every: u64) -> Self {
        ProgressPersister {
            store,
            every: every.max(1),
        }
    }

    pub fn is_due(&self, uploaded_total: u64) -> bool {
        uploaded_total % self.every == 0
    }

    /// Persists `main` and, if given, the group's flags. Returns whether
    /// everything was written.
    pub async fn checkpoint(
        &self,
        main: &MainDescriptor,
        group: Option<GroupSnapshot<'_>>,
    ) -> bool {
        let mut saved = true;

        if let Err(err) = self.store.save_main(main).await {
            warn!("checkpoint not saved: {err}");
            saved = false;
        }

        if let Some(GroupSnapshot { index, items }) = group {
            if let Err(err) = self.store.save_group(index, items).await {
                warn!("checkpoint of group {index} not saved: {err}");
                saved = false;
            }
        }

        if saved {
            debug!(
                "checkpoint: {} groups done, status {}",
                main.uploaded_group_index, main.status
            );
        }

        saved
    }
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, sync::Arc};

    use crate::{
        job::{JobItem, MainDescriptor, Status},
        store::{JobStore, LocalJobStore},
    };

    use super::{GroupSnapshot, ProgressPersister};

    #[test]
    fn due_on_multiples_only() {
        let dir = tempfile::tempdir().unwrap();
        let persister = ProgressPersister::new(Arc::new(LocalJobStore::new(dir.path())), 100);
        assert!(persister.is_due(100));
        assert!(persister.is_due(300));
        assert!(!persister.is_due(99));
        assert!(!persister.is_due(101));
    }

    #[test]
    fn zero_interval_checkpoints_every_upload() {
        let dir = tempfile::tempdir().unwrap();
        let persister = ProgressPersister::new(Arc::new(LocalJobStore::new(dir.path())), 0);
        assert!(persister.is_due(1));
        assert!(persister.is_due(7));
    }

    #[tokio::test]
    async fn checkpoint_writes_main_and_group() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalJobStore::new(dir.path()));
        let persister = ProgressPersister::new(store.clone(), 100);

        let mut items = vec![
            JobItem::new(0, PathBuf::from("/data/a.jpg")),
            JobItem::new(1, PathBuf::from("/data/b.jpg")),
        ];
        items[0].uploaded = true;
        let main = MainDescriptor {
            status: Status::Uploading,
            uploaded_group_index: 0,
            jobs_total: 2,
            files_total: 2,
        };

        let snapshot = GroupSnapshot {
            index: 1,
            items: &items,
        };
        assert!(persister.checkpoint(&main, Some(snapshot)).await);
        assert_eq!(store.load_main().await.unwrap(), main);
        assert_eq!(store.load_group(1).await.unwrap(), items);
    }

    #[tokio::test]
    async fn failed_checkpoint_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let store = Arc::new(LocalJobStore::new(blocker.join("data")));
        let persister = ProgressPersister::new(store, 100);

        assert!(!persister.checkpoint(&MainDescriptor::default(), None).await);
    }
}
