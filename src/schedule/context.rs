use std::collections::BTreeMap;

use log::warn;
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::{AbortHandle, JoinSet},
    time::Instant,
};

use crate::{
    job::{JobItem, MainDescriptor},
    progress::GroupSnapshot,
    stats::RunStats,
};

use super::event::{AttemptId, Event};

/// The group currently being uploaded.
#[derive(Debug)]
pub struct ActiveGroup {
    pub index: u64,
    pub items: Vec<JobItem>,
    /// Next position to dispatch.
    pub cursor: usize,
    /// Uploaded items the cursor has passed.
    pub completed: usize,
}

impl ActiveGroup {
    pub fn new(index: u64, items: Vec<JobItem>) -> Self {
        ActiveGroup {
            index,
            items,
            cursor: 0,
            completed: 0,
        }
    }

    pub fn is_dispatched(&self) -> bool {
        self.cursor >= self.items.len()
    }

    pub fn is_done(&self) -> bool {
        self.is_dispatched() && self.completed == self.items.len()
    }
}

/// An item holding one of the outstanding slots.
///
/// The slot is kept across retries and stale re-dispatches, so the number of
/// entries is the number of outstanding attempts.
#[derive(Debug)]
pub(super) struct InFlight {
    pub attempt: AttemptId,
    pub attempts: u32,
    pub failures: u32,
    pub deadline: Instant,
    pub handle: AbortHandle,
}

/// Mutable state of one scheduler run.
#[derive(Debug)]
pub struct SchedulerContext {
    pub(super) main: MainDescriptor,
    pub(super) group_count: u64,
    pub(super) group: Option<ActiveGroup>,
    pub(super) uploaded_total: u64,
    pub(super) in_flight: BTreeMap<usize, InFlight>,
    pub(super) failed: Vec<JobItem>,
    pub(super) stats: RunStats,
    pub(super) events_tx: UnboundedSender<Event>,
    pub(super) events_rx: UnboundedReceiver<Event>,
    pub(super) tasks: JoinSet<()>,
    next_attempt: AttemptId,
}

impl SchedulerContext {
    pub fn new(main: MainDescriptor, capacity: usize, stats: RunStats) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        SchedulerContext {
            group_count: main.group_count(capacity),
            uploaded_total: main.uploaded_group_index * capacity as u64,
            main,
            group: None,
            in_flight: BTreeMap::new(),
            failed: vec![],
            stats,
            events_tx,
            events_rx,
            tasks: JoinSet::new(),
            next_attempt: 0,
        }
    }

    pub fn uploaded_total(&self) -> u64 {
        self.uploaded_total
    }

    pub(super) fn next_attempt_id(&mut self) -> AttemptId {
        self.next_attempt += 1;
        self.next_attempt
    }

    pub(super) fn is_active(&self, group: u64) -> bool {
        self.group.as_ref().is_some_and(|active| active.index == group)
    }

    pub(super) fn item(&self, position: usize) -> Option<&JobItem> {
        self.group.as_ref()?.items.get(position)
    }

    /// Flips the item's flag and moves the counters, unless it was already
    /// uploaded. The flag is the only thing deciding whether to count.
    pub fn mark_uploaded(&mut self, position: usize) -> bool {
        let Some(group) = self.group.as_mut() else {
            return false;
        };
        let Some(item) = group.items.get_mut(position) else {
            return false;
        };
        if !item.mark_uploaded() {
            return false;
        }

        let index = item.index;
        group.completed += 1;
        self.uploaded_total += 1;
        self.stats.files_uploaded += 1;
        self.failed.retain(|failed| failed.index != index);
        true
    }

    pub(super) fn snapshot(&self) -> Option<GroupSnapshot<'_>> {
        self.group.as_ref().map(|group| GroupSnapshot {
            index: group.index,
            items: &group.items,
        })
    }

    /// Drops finished and aborted attempt tasks. A panicked attempt sends no
    /// event; its deadline brings the item back.
    pub(super) fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(err) = result {
                if err.is_panic() {
                    warn!("upload task panicked: {err}");
                }
            }
        }
    }
}
