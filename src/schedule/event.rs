use crate::upload::UploadError;

/// Identifies one dispatch of one item.
pub type AttemptId = u64;

/// Everything that wakes the pump loop besides the clock.
///
/// `group` and `position` locate the item; results for a group that is no
/// longer active, or for an attempt that has been superseded, are dropped.
#[derive(Debug)]
pub enum Event {
    Success {
        group: u64,
        position: usize,
        attempt: AttemptId,
        bytes: u64,
    },
    Failure {
        group: u64,
        position: usize,
        attempt: AttemptId,
        error: UploadError,
    },
    StaleTimeout {
        group: u64,
        position: usize,
        attempt: AttemptId,
    },
}

impl Event {
    pub fn group(&self) -> u64 {
        match self {
            Event::Success { group, .. }
            | Event::Failure { group, .. }
            | Event::StaleTimeout { group, .. } => *group,
        }
    }
}
