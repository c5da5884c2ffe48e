use crate::store::{CommentStore, StoreError};
use chrono::{Duration, NaiveDateTime};
use std::sync::atomic::{AtomicU64, Ordering};

/// Fires once every `every` invocations. The deterministic replacement
/// for a random maintenance draw: same cadence, testable without chance.
pub struct CompactionTrigger {
    every: u64,
    invocations: AtomicU64,
}

impl CompactionTrigger {
    pub fn new(every: u64) -> Self {
        CompactionTrigger {
            every,
            invocations: AtomicU64::new(0),
        }
    }

    pub fn fire(&self) -> bool {
        if self.every == 0 {
            return false;
        }
        let count = self.invocations.fetch_add(1, Ordering::Relaxed) + 1;
        count % self.every == 0
    }
}

/// Age-based purge of confirmed spam, piggybacked on normal request
/// traffic rather than scheduled.
pub struct RetentionSweeper {
    retention_days: i64,
    trigger: CompactionTrigger,
}

impl RetentionSweeper {
    pub fn new(retention_days: i64, trigger: CompactionTrigger) -> Self {
        RetentionSweeper {
            retention_days,
            trigger,
        }
    }

    /// Delete confirmed spam older than the retention window, then
    /// compact if the trigger says so. Returns the number of records
    /// removed.
    pub fn sweep(&self, store: &dyn CommentStore, now: NaiveDateTime) -> Result<usize, StoreError> {
        let cutoff = now - Duration::days(self.retention_days);
        let removed = store.delete_spam_before(cutoff)?;
        if removed > 0 {
            log::debug!("purged {removed} spam records older than {} days", self.retention_days);
        }
        if self.trigger.fire() {
            log::debug!("compaction trigger fired");
            store.compact()?;
        }
        Ok(removed)
    }
}
