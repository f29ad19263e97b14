//! The directory walker. Given one [`DirectoryTask`], enumerates its
//! entries, classifies each, and decides per-subdirectory whether to recurse
//! on the current stack or hand the work back to the pool.

use std::cell::RefCell;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thread_local::ThreadLocal;

use crate::config::Config;
use crate::counters::Counters;
use crate::diagnostics::Diagnostics;
use crate::dirread::{self, platform_has_type_hints, RawEntry};
use crate::error::ErrorClass;
use crate::exclude;
use crate::extreme_readdir;
use crate::filetype::FileType;
use crate::mutator;
use crate::pool::Enqueue;
use crate::task::{self, DirectoryTask};
use crate::trace;

/// State shared by every worker's [`Walker`]: immutable configuration plus
/// the run-wide counters, diagnostics stream, and the one-shot
/// non-POSIX-compliance flag. The flag only ever flips false -> true; a
/// relaxed, racy write is fine since every reader treats a stale `false` as
/// merely "haven't noticed yet", never as a correctness requirement.
pub struct WalkerEnv {
    pub config: Arc<Config>,
    pub counters: Arc<Counters>,
    pub diag: Arc<Diagnostics>,
    pub simulate_posix_compliance: AtomicBool,
    /// Per-worker bulk-read buffer for the extreme-readdir path, lazily
    /// allocated the first time a given worker thread uses it.
    readdir_buffers: ThreadLocal<RefCell<Vec<u8>>>,
}

impl WalkerEnv {
    #[must_use]
    pub fn new(config: Arc<Config>, counters: Arc<Counters>, diag: Arc<Diagnostics>) -> Self {
        Self {
            config,
            counters,
            diag,
            simulate_posix_compliance: AtomicBool::new(false),
            readdir_buffers: ThreadLocal::new(),
        }
    }
}

pub struct Walker<'a> {
    env: &'a WalkerEnv,
    pool: &'a dyn Enqueue,
}

impl<'a> Walker<'a> {
    #[must_use]
    pub const fn new(env: &'a WalkerEnv, pool: &'a dyn Enqueue) -> Self {
        Self { env, pool }
    }

    /// Processes one directory to completion: mutates its non-directory
    /// children (or recurses/enqueues its subdirectories), then the
    /// directory itself.
    pub fn walk(&self, task: DirectoryTask) {
        let counters = &self.env.counters;
        let diag = &self.env.diag;
        counters.record_seen();

        if task.st_nlink < 2 && !self.env.simulate_posix_compliance.load(Ordering::Relaxed) {
            self.env.simulate_posix_compliance.store(true, Ordering::Relaxed);
            trace!(diag, "POSIX non-compliance detected on {}", task.path);
        }

        let entries = match self.read_entries(&task.path) {
            Ok(entries) => entries,
            Err(e) => {
                let errno = e.raw_os_error().unwrap_or(libc::EIO);
                counters.record_error(ErrorClass::OpenDirFailed);
                diag.report(&task.path, ErrorClass::OpenDirFailed, errno);
                return;
            }
        };

        let non_posix = self.env.simulate_posix_compliance.load(Ordering::Relaxed);
        let threshold = self.env.config.effective_inline_threshold();
        let trust_hints = platform_has_type_hints();
        let mut inlined = task.inlined;
        let mut filecnt = 0_u32;

        for entry in entries {
            counters.record_seen();
            filecnt += 1;
            let child_path = task::join_child(&task.path, &entry.name);

            // Skip the lstat only when the platform's hint is trustworthy,
            // the filesystem is (so far) believed POSIX-compliant, this
            // directory has no further subdirectories to expect, and the
            // hint already rules out "directory".
            let skip_lstat = trust_hints
                && !non_posix
                && task.st_nlink == 2
                && matches!(entry.type_hint, Some(t) if !t.is_directory());

            let (resolved_type, stat) = if skip_lstat {
                (entry.type_hint.unwrap_or(FileType::Unknown), None)
            } else {
                counters.record_stat();
                if entry.type_hint.is_none() {
                    counters.record_stat_unexpected();
                }
                match dirread::lstat(&child_path) {
                    Ok(st) => (FileType::from_mode(st.st_mode), Some(st)),
                    Err(e) => {
                        let errno = e.raw_os_error().unwrap_or(libc::EIO);
                        counters.record_error(ErrorClass::StatFailed);
                        diag.report(&child_path, ErrorClass::StatFailed, errno);
                        continue;
                    }
                }
            };

            if resolved_type.is_directory() {
                // Directories always carry a full stat record by this point:
                // the skip_lstat branch above only fires for known
                // non-directories.
                let Some(st) = stat else { continue };
                let child_dev = st.st_dev as u64;

                if self.env.config.cross_device_prune && child_dev != task.st_dev {
                    continue; // cross a device boundary: leaf, not mutated.
                }
                let child_depth = task.depth + 1;
                if let Some(max_depth) = self.env.config.max_depth {
                    if child_depth > max_depth {
                        continue; // beyond the depth bound: not considered at all.
                    }
                }
                if exclude::any_matches(&self.env.config.excludes, &entry.name) {
                    continue; // excluded: neither descended into nor mutated.
                }

                let child_task = DirectoryTask::new(child_path, child_depth, &st);

                // On a filesystem that still looks POSIX-compliant, a
                // directory's link count is a fixed, known-in-advance upper
                // bound on its subdirectory count: `st_nlink < threshold + 2`
                // means there can be no more than `threshold` subdirectories
                // at all, so every one of them is inlined, or none are.
                // Once non-compliance is detected, link count can no longer
                // be trusted this way, so inlining instead counts down
                // per-subdirectory as they're actually discovered.
                let inline_now = threshold > 0
                    && if non_posix {
                        inlined < threshold
                    } else {
                        task.st_nlink < u64::from(threshold) + 2
                    };

                if inline_now {
                    inlined += 1;
                    self.walk(child_task);
                } else {
                    self.pool.enqueue(child_task, counters);
                }
            } else if self.env.config.type_filter.admits_non_directories() {
                let known = stat.map(|st| (st.st_uid, st.st_gid));
                self.maybe_mutate(&child_path, known);
            }
        }

        trace!(diag, "{}: filecnt={filecnt}", task.path);

        if self.env.config.type_filter.admits_directories() {
            self.maybe_mutate(&task.path, Some((task.st_uid, task.st_gid)));
        }
    }

    /// Reads one directory's entries, via the bulk `getdents64` path when
    /// `-X` is enabled and supported, otherwise the portable one-entry-at-a-
    /// time path.
    ///
    /// # Errors
    /// Returns the underlying `open`/`opendir` failure.
    fn read_entries(&self, path: &str) -> io::Result<Vec<RawEntry>> {
        if self.env.config.extreme_readdir && extreme_readdir::is_supported() {
            let cell = self
                .env
                .readdir_buffers
                .get_or(|| RefCell::new(Vec::new()));
            let mut buf = cell.borrow_mut();
            let count = extreme_readdir::chunk_entry_count();
            extreme_readdir::read_dir_bulk(path, count, &mut buf).map(|(entries, _syscalls)| entries)
        } else {
            dirread::read_dir_raw(path)
        }
    }

    /// Applies (or, under `-n`, prints) the configured ownership change,
    /// skipping entries whose current ids are already known to match.
    fn maybe_mutate(&self, path: &str, known: Option<(u32, u32)>) {
        let cfg = &self.env.config;
        if let Some((uid, gid)) = known {
            if cfg.uid.matches(uid) && cfg.gid.matches(gid) {
                return;
            }
        }
        if cfg.dry_run {
            println!("{path}");
        } else {
            mutator::apply(Path::new(path), cfg.uid, cfg.gid, &self.env.counters, &self.env.diag);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::TargetId;
    use std::os::unix::fs::MetadataExt as _;
    use std::sync::Mutex;

    struct RecordingPool {
        enqueued: Mutex<Vec<DirectoryTask>>,
    }

    impl RecordingPool {
        fn new() -> Self {
            Self { enqueued: Mutex::new(Vec::new()) }
        }
    }

    impl Enqueue for RecordingPool {
        fn enqueue(&self, task: DirectoryTask, counters: &Counters) {
            counters.record_queued_dir();
            self.enqueued.lock().unwrap().push(task);
        }
    }

    fn stat_of(path: &std::path::Path) -> libc::stat {
        let meta = std::fs::symlink_metadata(path).unwrap();
        let mut stat: libc::stat = unsafe { core::mem::zeroed() };
        stat.st_dev = meta.dev();
        stat.st_ino = meta.ino();
        #[allow(clippy::unnecessary_cast)]
        {
            stat.st_nlink = meta.nlink() as _;
        }
        stat.st_uid = meta.uid();
        stat.st_gid = meta.gid();
        stat
    }

    fn env_with(config: Config) -> (WalkerEnv, Arc<Counters>) {
        let counters = Arc::new(Counters::new());
        let diag = Arc::new(Diagnostics::new());
        let env = WalkerEnv::new(Arc::new(config), Arc::clone(&counters), diag);
        (env, counters)
    }

    #[test]
    fn empty_directory_chowns_only_itself() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::for_test();
        config.uid = TargetId::Set(12345);
        config.gid = TargetId::Set(12345);
        let (env, counters) = env_with(config);
        let pool = RecordingPool::new();
        let walker = Walker::new(&env, &pool);

        let root_stat = stat_of(dir.path());
        walker.walk(DirectoryTask::new(dir.path().to_str().unwrap(), 0, &root_stat));

        assert_eq!(counters.snapshot().mutation_attempts(), 1);
    }

    #[test]
    fn single_worker_inlines_every_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["a", "b"] {
            std::fs::create_dir(dir.path().join(sub)).unwrap();
            std::fs::write(dir.path().join(sub).join("f"), b"").unwrap();
        }
        let mut config = Config::for_test();
        config.worker_count = 1;
        let (env, counters) = env_with(config);
        let pool = RecordingPool::new();
        let walker = Walker::new(&env, &pool);

        let root_stat = stat_of(dir.path());
        walker.walk(DirectoryTask::new(dir.path().to_str().unwrap(), 0, &root_stat));

        assert!(pool.enqueued.lock().unwrap().is_empty());
        // root + 2 dirs + 2 files = 5 mutation attempts.
        assert_eq!(counters.snapshot().mutation_attempts(), 5);
    }

    #[test]
    fn wide_posix_compliant_directory_inlines_none() {
        // threshold=2 (Config::for_test default), three subdirectories: the
        // root's st_nlink (2 + 3 = 5) is not below threshold+2 (4), so the
        // POSIX branch is all-or-nothing against the *parent's* link count
        // and every subdirectory is enqueued rather than the first two.
        let dir = tempfile::tempdir().unwrap();
        for sub in ["a", "b", "c"] {
            std::fs::create_dir(dir.path().join(sub)).unwrap();
        }
        let config = Config::for_test();
        let (env, counters) = env_with(config);
        let pool = RecordingPool::new();
        let walker = Walker::new(&env, &pool);

        let root_stat = stat_of(dir.path());
        assert!(root_stat.st_nlink >= 4, "test assumes a real nlink-tracking filesystem");
        walker.walk(DirectoryTask::new(dir.path().to_str().unwrap(), 0, &root_stat));

        assert_eq!(pool.enqueued.lock().unwrap().len(), 3);
        assert_eq!(counters.snapshot().mutation_attempts(), 1);
    }

    #[test]
    fn narrow_posix_compliant_directory_inlines_all() {
        // threshold=2, a single subdirectory: root st_nlink (2 + 1 = 3) is
        // below threshold+2 (4), so the POSIX branch inlines it directly
        // instead of handing it to the pool.
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        let config = Config::for_test();
        let (env, counters) = env_with(config);
        let pool = RecordingPool::new();
        let walker = Walker::new(&env, &pool);

        let root_stat = stat_of(dir.path());
        assert!(root_stat.st_nlink < 4, "test assumes a real nlink-tracking filesystem");
        walker.walk(DirectoryTask::new(dir.path().to_str().unwrap(), 0, &root_stat));

        assert!(pool.enqueued.lock().unwrap().is_empty());
        // root + inlined "a" = 2 mutation attempts.
        assert_eq!(counters.snapshot().mutation_attempts(), 2);
    }

    #[test]
    fn non_posix_filesystem_falls_back_to_per_subdirectory_counting() {
        // Forcing simulate_posix_compliance (via a fake st_nlink < 2 on the
        // root) switches the gate to the per-subdirectory counter: with
        // threshold=2 and three subdirectories, exactly the first two are
        // inlined and the third is enqueued, regardless of the real
        // (now-distrusted) link count.
        let dir = tempfile::tempdir().unwrap();
        for sub in ["a", "b", "c"] {
            std::fs::create_dir(dir.path().join(sub)).unwrap();
        }
        let config = Config::for_test();
        let (env, counters) = env_with(config);
        let pool = RecordingPool::new();
        let walker = Walker::new(&env, &pool);

        let mut root_stat = stat_of(dir.path());
        root_stat.st_nlink = 1;
        walker.walk(DirectoryTask::new(dir.path().to_str().unwrap(), 0, &root_stat));

        assert_eq!(pool.enqueued.lock().unwrap().len(), 1);
        // root + 2 inlined subdirectories = 3 mutation attempts; the
        // enqueued third subdirectory hasn't been processed yet.
        assert_eq!(counters.snapshot().mutation_attempts(), 3);
    }

    #[test]
    fn zero_threshold_enqueues_every_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        std::fs::create_dir(dir.path().join("b")).unwrap();
        let mut config = Config::for_test();
        config.inline_threshold = 0;
        config.worker_count = 4;
        let (env, counters) = env_with(config);
        let pool = RecordingPool::new();
        let walker = Walker::new(&env, &pool);

        let root_stat = stat_of(dir.path());
        walker.walk(DirectoryTask::new(dir.path().to_str().unwrap(), 0, &root_stat));

        assert_eq!(pool.enqueued.lock().unwrap().len(), 2);
        assert_eq!(counters.snapshot().queued_dirs, 2);
        // Only the root itself was mutated so far; the two children are
        // still sitting in the (fake) queue.
        assert_eq!(counters.snapshot().mutation_attempts(), 1);
    }

    #[test]
    fn max_depth_excludes_entries_beyond_the_bound() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = a.join("b");
        std::fs::create_dir_all(&b).unwrap();
        std::fs::write(b.join("deep"), b"").unwrap();

        let mut config = Config::for_test();
        config.max_depth = Some(1);
        config.worker_count = 1;
        let (env, counters) = env_with(config);
        let pool = RecordingPool::new();
        let walker = Walker::new(&env, &pool);

        let root_stat = stat_of(dir.path());
        walker.walk(DirectoryTask::new(dir.path().to_str().unwrap(), 0, &root_stat));

        // /root (depth 0) and /root/a (depth 1) only; /root/a/b is depth 2.
        assert_eq!(counters.snapshot().mutation_attempts(), 2);
    }

    #[test]
    fn excluded_basename_is_neither_descended_nor_mutated() {
        let dir = tempfile::tempdir().unwrap();
        let snap = dir.path().join(".snapshot");
        std::fs::create_dir(&snap).unwrap();
        std::fs::write(snap.join("f"), b"").unwrap();

        let mut config = Config::for_test();
        config.excludes = exclude::literals(&[".snapshot".to_string()]);
        config.worker_count = 1;
        let (env, counters) = env_with(config);
        let pool = RecordingPool::new();
        let walker = Walker::new(&env, &pool);

        let root_stat = stat_of(dir.path());
        walker.walk(DirectoryTask::new(dir.path().to_str().unwrap(), 0, &root_stat));

        // Only the root itself; `.snapshot` and its contents are untouched.
        assert_eq!(counters.snapshot().mutation_attempts(), 1);
    }

    #[test]
    fn dirs_only_filter_mutates_directories_not_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("f"), b"").unwrap();

        let mut config = Config::for_test();
        config.type_filter = crate::config::TypeFilter::DirsOnly;
        config.worker_count = 1;
        let (env, counters) = env_with(config);
        let pool = RecordingPool::new();
        let walker = Walker::new(&env, &pool);

        let root_stat = stat_of(dir.path());
        walker.walk(DirectoryTask::new(dir.path().to_str().unwrap(), 0, &root_stat));

        // root + "sub" are mutated; "f" (a file) is skipped entirely.
        assert_eq!(counters.snapshot().mutation_attempts(), 2);
    }

    #[test]
    fn cross_device_boundary_prunes_without_descending() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("other_fs")).unwrap();
        std::fs::write(dir.path().join("other_fs").join("f"), b"").unwrap();

        let mut config = Config::for_test();
        config.cross_device_prune = true;
        config.worker_count = 1;
        let (env, counters) = env_with(config);
        let pool = RecordingPool::new();
        let walker = Walker::new(&env, &pool);

        // Claim the root lives on a device distinct from anything a real
        // lstat will ever return, so every child looks like it crossed a
        // filesystem boundary without needing an actual second filesystem.
        let mut root_stat = stat_of(dir.path());
        root_stat.st_dev = u64::MAX as _;
        walker.walk(DirectoryTask::new(dir.path().to_str().unwrap(), 0, &root_stat));

        // Only the root itself; "other_fs" and its contents are pruned.
        assert_eq!(counters.snapshot().mutation_attempts(), 1);
    }

    #[test]
    fn dry_run_prints_instead_of_mutating() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f"), b"").unwrap();

        let mut config = Config::for_test();
        config.dry_run = true;
        config.uid = TargetId::Set(54321);
        config.gid = TargetId::Set(54321);
        config.worker_count = 1;
        let (env, counters) = env_with(config);
        let pool = RecordingPool::new();
        let walker = Walker::new(&env, &pool);

        let root_stat = stat_of(dir.path());
        walker.walk(DirectoryTask::new(dir.path().to_str().unwrap(), 0, &root_stat));

        assert_eq!(counters.snapshot().entries_chowned, 0);
    }
}
