use serde::{Deserialize, Serialize};

use crate::job::Status;

/// Per-status counters. Always rebuilt from the underlying statuses, so
/// `pending + processing + completed + failed + skipped == total` holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl StatusCounts {
    pub fn tally<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = Status>,
    {
        let mut counts = Self::default();
        for status in statuses {
            counts.total += 1;
            match status {
                Status::Pending => counts.pending += 1,
                Status::Processing => counts.processing += 1,
                Status::Completed => counts.completed += 1,
                Status::Failed => counts.failed += 1,
                Status::Skipped => counts.skipped += 1,
            }
        }
        counts
    }

    pub fn is_consistent(&self) -> bool {
        self.pending + self.processing + self.completed + self.failed + self.skipped == self.total
    }

    /// Overall status of the collection these counters describe.
    pub fn aggregate_status(&self) -> Status {
        if self.total == 0 || self.pending == self.total {
            Status::Pending
        } else if self.pending > 0 || self.processing > 0 {
            Status::Processing
        } else if self.failed > 0 {
            Status::Failed
        } else if self.skipped == self.total {
            Status::Skipped
        } else {
            Status::Completed
        }
    }
}

/// Records whose counters are derived from what they reference.
pub trait Aggregate {
    /// Re-derives counters and overall status from the current references.
    fn recompute_aggregates(&mut self);

    fn stats(&self) -> &StatusCounts;
}
