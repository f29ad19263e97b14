//! Argument parsing. This module only builds a [`Config`] and a list of
//! starting directories, or returns a [`ChownError`]; the traversal engine
//! never sees a raw flag.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::config::{Config, TypeFilter};
use crate::error::ChownError;
use crate::exclude::{self, ExcludePattern};
use crate::ownerspec;
use crate::queue::DisciplineKind;

const DEFAULT_INLINE_THRESHOLD: u32 = 2;
const SNAPSHOT_EXCLUDE: &str = ".snapshot";

fn default_worker_count() -> usize {
    std::thread::available_parallelism().map_or(8, |n| n.get().min(8))
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ShellKind {
    Bash,
    Zsh,
    Fish,
    Elvish,
    PowerShell,
}

impl From<ShellKind> for clap_complete::aot::Shell {
    fn from(kind: ShellKind) -> Self {
        match kind {
            ShellKind::Bash => Self::Bash,
            ShellKind::Zsh => Self::Zsh,
            ShellKind::Fish => Self::Fish,
            ShellKind::Elvish => Self::Elvish,
            ShellKind::PowerShell => Self::PowerShell,
        }
    }
}

/// Compatible filesystems this tool has been exercised against, surfaced in
/// `--help`.
const FS_COMPAT_NOTE: &str = "Exercised on ext4, xfs, zfs, btrfs, nfs, apfs, jfs and vxfs; \
link-count assumptions fall back to a runtime heuristic where POSIX directory \
semantics don't hold.";

#[derive(Parser, Debug)]
#[command(version = env!("CARGO_PKG_VERSION"), after_help = FS_COMPAT_NOTE)]
#[allow(clippy::struct_excessive_bools)]
pub struct Args {
    /// `[user][:[group]]`; absent group leaves the group unchanged.
    #[arg(value_name = "OWNER")]
    owner: Option<String>,

    /// One or more starting directories.
    #[arg(value_name = "DIR")]
    dirs: Vec<PathBuf>,

    #[arg(short = 't', default_value_t = default_worker_count(), help = "Worker count, 1-512")]
    threads: usize,

    #[arg(short = 'I', default_value_t = DEFAULT_INLINE_THRESHOLD, help = "Inline threshold, 0 disables inlining")]
    inline_threshold: u32,

    #[arg(short = 'e', action = ArgAction::Append, help = "Exclude directories matching REGEX (repeatable)")]
    exclude_regex: Vec<String>,

    #[arg(short = 'E', action = ArgAction::Append, help = "Exclude directories named NAME (repeatable)")]
    exclude_name: Vec<String>,

    #[arg(short = 'Z', help = "Shorthand for -E .snapshot")]
    exclude_snapshot: bool,

    #[arg(short = 'x', help = "Do not cross filesystem boundaries")]
    one_filesystem: bool,

    #[arg(short = 'm', value_name = "D", help = "Maximum depth")]
    max_depth: Option<u32>,

    #[arg(short = 'f', help = "Mutate only non-directory entries")]
    files_only: bool,

    #[arg(short = 'd', help = "Mutate only directories")]
    dirs_only: bool,

    #[arg(short = 'n', help = "Dry run: print paths instead of mutating")]
    dry_run: bool,

    #[arg(short = 'q', help = "FIFO queue discipline")]
    fifo: bool,

    #[arg(short = 'Q', help = "Inode-sorted queue discipline")]
    inode_sorted: bool,

    #[arg(short = 'X', help = "Extreme readdir (bulk getdents64)")]
    extreme_readdir: bool,

    #[arg(short = 'S', help = "Print statistics at exit")]
    print_stats: bool,

    #[arg(short = 'T', help = "Print elapsed wall time at exit")]
    print_elapsed: bool,

    #[arg(short = 'v', action = ArgAction::Count, help = "Increase progress verbosity")]
    verbose: u8,

    #[arg(long = "generate", value_enum, help = "Generate shell completions and exit")]
    generate: Option<ShellKind>,
}

pub struct Parsed {
    pub config: std::sync::Arc<Config>,
    pub dirs: Vec<PathBuf>,
}

impl Args {
    /// Resolves parsed arguments into an immutable [`Config`] plus the
    /// starting directories, or a fatal [`ChownError`].
    ///
    /// # Errors
    /// See [`Config::new`] and [`ownerspec::parse`] for the conditions.
    pub fn resolve(self) -> Result<Parsed, ChownError> {
        if !self.exclude_regex.is_empty() && (!self.exclude_name.is_empty() || self.exclude_snapshot) {
            return Err(ChownError::UsageError(
                "-e is mutually exclusive with -E/-Z".to_string(),
            ));
        }

        let owner = self
            .owner
            .as_deref()
            .ok_or_else(|| ChownError::UsageError("missing owner specification".to_string()))?;
        let (uid, gid) = ownerspec::parse(owner)?;

        if self.dirs.is_empty() {
            return Err(ChownError::UsageError("at least one directory is required".to_string()));
        }

        let mut excludes: Vec<ExcludePattern> = Vec::new();
        if !self.exclude_regex.is_empty() {
            excludes.extend(exclude::compile_regexes(&self.exclude_regex)?);
        } else {
            let mut names = self.exclude_name.clone();
            if self.exclude_snapshot {
                names.push(SNAPSHOT_EXCLUDE.to_string());
            }
            excludes.extend(exclude::literals(&names));
        }

        let discipline = match (self.fifo, self.inode_sorted) {
            (true, true) => {
                return Err(ChownError::UsageError("-q and -Q are mutually exclusive".to_string()));
            }
            (true, false) => DisciplineKind::Fifo,
            (false, true) => DisciplineKind::InodeSorted,
            (false, false) => DisciplineKind::Lifo,
        };

        let type_filter = TypeFilter::from_flags(self.files_only, self.dirs_only);

        let config = Config::new(
            uid,
            gid,
            self.threads,
            self.inline_threshold,
            excludes,
            self.one_filesystem,
            self.max_depth,
            type_filter,
            self.dry_run,
            discipline,
            self.extreme_readdir,
            self.print_stats,
            self.print_elapsed,
            self.verbose,
        )?;

        Ok(Parsed { config, dirs: self.dirs })
    }

    #[must_use]
    pub const fn generate_shell(&self) -> Option<ShellKind> {
        self.generate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::TargetId;

    #[test]
    fn rejects_mixing_regex_and_literal_excludes() {
        let args = Args::parse_from([
            "chowntree", "-e", "^tmp", "-E", "cache", "1000:1000", "/tmp",
        ]);
        assert!(args.resolve().is_err());
    }

    #[test]
    fn accepts_a_minimal_invocation() {
        let args = Args::parse_from(["chowntree", "1000:1000", "/tmp"]);
        let parsed = args.resolve().unwrap();
        assert_eq!(parsed.dirs, vec![PathBuf::from("/tmp")]);
        assert_eq!(parsed.config.uid, TargetId::Set(1000));
    }

    #[test]
    fn dash_z_is_shorthand_for_exclude_snapshot() {
        let args = Args::parse_from(["chowntree", "-Z", "1000:1000", "/tmp"]);
        let parsed = args.resolve().unwrap();
        assert_eq!(parsed.config.excludes.len(), 1);
    }

    #[test]
    fn q_and_big_q_are_mutually_exclusive() {
        let args = Args::parse_from(["chowntree", "-q", "-Q", "1000:1000", "/tmp"]);
        assert!(args.resolve().is_err());
    }
}
