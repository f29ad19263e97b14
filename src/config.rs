//! Immutable run configuration, built once from parsed arguments and shared
//! read-only across every worker thread.

use std::sync::Arc;

use crate::error::ChownError;
use crate::exclude::ExcludePattern;
use crate::ids::TargetId;
use crate::queue::DisciplineKind;

/// Which entry types the mutator is allowed to touch (`-f`/`-d`): either
/// flag alone narrows the set; both or neither admit everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFilter {
    All,
    FilesOnly,
    DirsOnly,
}

impl TypeFilter {
    #[must_use]
    pub const fn from_flags(files_only: bool, dirs_only: bool) -> Self {
        match (files_only, dirs_only) {
            (true, false) => Self::FilesOnly,
            (false, true) => Self::DirsOnly,
            _ => Self::All,
        }
    }

    #[must_use]
    pub const fn admits_directories(self) -> bool {
        !matches!(self, Self::FilesOnly)
    }

    #[must_use]
    pub const fn admits_non_directories(self) -> bool {
        !matches!(self, Self::DirsOnly)
    }
}

#[derive(Debug)]
pub struct Config {
    pub uid: TargetId,
    pub gid: TargetId,
    pub worker_count: usize,
    pub inline_threshold: u32,
    pub excludes: Vec<ExcludePattern>,
    pub cross_device_prune: bool,
    pub max_depth: Option<u32>,
    pub type_filter: TypeFilter,
    pub dry_run: bool,
    pub discipline: DisciplineKind,
    pub extreme_readdir: bool,
    pub print_stats: bool,
    pub print_elapsed: bool,
    pub verbosity: u8,
}

/// Upper bound on `-t N`.
pub const MAX_WORKERS: usize = 512;

impl Config {
    /// Validates and assembles final configuration. `worker_count` must
    /// already be within `1..=MAX_WORKERS`; the CLI layer enforces this
    /// before calling here so the error message can name the flag.
    ///
    /// # Errors
    /// Returns [`ChownError::UsageError`] if `worker_count` is out of range
    /// or both `-e` and `-E`/`-Z` were supplied.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        uid: TargetId,
        gid: TargetId,
        worker_count: usize,
        inline_threshold: u32,
        excludes: Vec<ExcludePattern>,
        cross_device_prune: bool,
        max_depth: Option<u32>,
        type_filter: TypeFilter,
        dry_run: bool,
        discipline: DisciplineKind,
        extreme_readdir: bool,
        print_stats: bool,
        print_elapsed: bool,
        verbosity: u8,
    ) -> Result<Arc<Self>, ChownError> {
        if worker_count == 0 || worker_count > MAX_WORKERS {
            return Err(ChownError::UsageError(format!(
                "-t must be between 1 and {MAX_WORKERS}, got {worker_count}"
            )));
        }

        if extreme_readdir && !crate::extreme_readdir::is_supported() {
            return Err(ChownError::UsageError(
                "-X (extreme readdir) is not supported on this platform".to_string(),
            ));
        }

        Ok(Arc::new(Self {
            uid,
            gid,
            worker_count,
            inline_threshold,
            excludes,
            cross_device_prune,
            max_depth,
            type_filter,
            dry_run,
            discipline,
            extreme_readdir,
            print_stats,
            print_elapsed,
            verbosity,
        }))
    }

    /// Treats the inline threshold as effectively infinite for a
    /// single-worker pool: with only one thread, every subdirectory is
    /// processed inline regardless of `-I`.
    #[must_use]
    pub fn effective_inline_threshold(&self) -> u32 {
        if self.worker_count == 1 {
            u32::MAX
        } else {
            self.inline_threshold
        }
    }

    /// A permissive configuration for tests that only care about traversal,
    /// not argument parsing.
    #[cfg(test)]
    #[must_use]
    pub fn for_test() -> Self {
        Self {
            uid: TargetId::Unchanged,
            gid: TargetId::Unchanged,
            worker_count: 4,
            inline_threshold: 2,
            excludes: Vec::new(),
            cross_device_prune: false,
            max_depth: None,
            type_filter: TypeFilter::All,
            dry_run: false,
            discipline: DisciplineKind::Lifo,
            extreme_readdir: false,
            print_stats: false,
            print_elapsed: false,
            verbosity: 0,
        }
    }
}
