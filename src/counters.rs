//! Lock-free accumulation of run-wide statistics.
//!
//! Every field is a plain atomic; any worker may increment any counter, and
//! the main thread only reads after the pool has drained.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::error::ErrorClass;

/// Monotonic, process-wide counters. Cheap to share as `&Counters` behind an
/// `Arc` — every field is independently atomic, so there is no shared lock.
#[derive(Debug, Default)]
pub struct Counters {
    /// Entries seen during traversal (files, dirs, symlinks, ...).
    entries_seen: AtomicU64,
    /// Successful `lchown` calls.
    entries_chowned: AtomicU64,
    /// `lstat` calls.
    statcount: AtomicU64,
    /// `lstat` calls specifically triggered by a `DT_UNKNOWN`/missing type hint.
    statcount_unexp: AtomicU64,
    /// Directories handed off to the shared queue rather than inlined.
    queued_dirs: AtomicU64,
    /// Elements bypassed during inode-sorted insertion (diagnostic only).
    inolist_bypass: AtomicU64,
    file_no_access: AtomicU64,
    file_not_found: AtomicU64,
    file_any_other_error: AtomicU64,
    open_dir_failed: AtomicU64,
    stat_failed: AtomicU64,
}

impl Counters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_seen(&self) {
        self.entries_seen.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_chowned(&self) {
        self.entries_chowned.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_stat(&self) {
        self.statcount.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_stat_unexpected(&self) {
        self.statcount_unexp.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_queued_dir(&self) {
        self.queued_dirs.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_inolist_bypass(&self, count: u64) {
        self.inolist_bypass.fetch_add(count, Ordering::Relaxed);
    }

    /// Records a per-entry failure under its class.
    #[inline]
    pub fn record_error(&self, class: ErrorClass) {
        let counter = match class {
            ErrorClass::NoAccess => &self.file_no_access,
            ErrorClass::NotFound => &self.file_not_found,
            ErrorClass::Other => &self.file_any_other_error,
            ErrorClass::OpenDirFailed => &self.open_dir_failed,
            ErrorClass::StatFailed => &self.stat_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            entries_seen: self.entries_seen.load(Ordering::Relaxed),
            entries_chowned: self.entries_chowned.load(Ordering::Relaxed),
            statcount: self.statcount.load(Ordering::Relaxed),
            statcount_unexp: self.statcount_unexp.load(Ordering::Relaxed),
            queued_dirs: self.queued_dirs.load(Ordering::Relaxed),
            inolist_bypass: self.inolist_bypass.load(Ordering::Relaxed),
            file_no_access: self.file_no_access.load(Ordering::Relaxed),
            file_not_found: self.file_not_found.load(Ordering::Relaxed),
            file_any_other_error: self.file_any_other_error.load(Ordering::Relaxed),
            open_dir_failed: self.open_dir_failed.load(Ordering::Relaxed),
            stat_failed: self.stat_failed.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time read of [`Counters`], taken after the pool has drained.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountersSnapshot {
    pub entries_seen: u64,
    pub entries_chowned: u64,
    pub statcount: u64,
    pub statcount_unexp: u64,
    pub queued_dirs: u64,
    pub inolist_bypass: u64,
    pub file_no_access: u64,
    pub file_not_found: u64,
    pub file_any_other_error: u64,
    pub open_dir_failed: u64,
    pub stat_failed: u64,
}

impl CountersSnapshot {
    /// Every attempted mutation landed in exactly one bucket: a successful
    /// chown or one of the three error classes.
    #[must_use]
    pub const fn mutation_attempts(&self) -> u64 {
        self.entries_chowned + self.file_no_access + self.file_not_found + self.file_any_other_error
    }
}
