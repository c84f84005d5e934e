//! Channel counters

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by submitters and the dispatch path
#[derive(Debug, Default)]
pub struct ChannelStats {
    submitted: AtomicU64,
    completed: AtomicU64,
    timed_out: AtomicU64,
    dropped_unmatched: AtomicU64,
    dropped_malformed: AtomicU64,
    transient_statuses: AtomicU64,
    rearm_failures: AtomicU64,
}

impl ChannelStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_timed_out(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unmatched(&self) {
        self.dropped_unmatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_malformed(&self) {
        self.dropped_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transient(&self) {
        self.transient_statuses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rearm_failure(&self) {
        self.rearm_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Plain copy of the counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            dropped_unmatched: self.dropped_unmatched.load(Ordering::Relaxed),
            dropped_malformed: self.dropped_malformed.load(Ordering::Relaxed),
            transient_statuses: self.transient_statuses.load(Ordering::Relaxed),
            rearm_failures: self.rearm_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub submitted: u64,
    pub completed: u64,
    pub timed_out: u64,
    pub dropped_unmatched: u64,
    pub dropped_malformed: u64,
    pub transient_statuses: u64,
    pub rearm_failures: u64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "submitted:          {}", self.submitted)?;
        writeln!(f, "completed:          {}", self.completed)?;
        writeln!(f, "timed out:          {}", self.timed_out)?;
        writeln!(f, "dropped unmatched:  {}", self.dropped_unmatched)?;
        writeln!(f, "dropped malformed:  {}", self.dropped_malformed)?;
        writeln!(f, "transient statuses: {}", self.transient_statuses)?;
        write!(f, "re-arm failures:    {}", self.rearm_failures)
    }
}
