//! Error types. Two tiers: a closed, per-entry [`ErrorClass`] that only
//! ever gets counted and logged, and a fatal [`ChownError`] that can only
//! occur during startup.

use core::fmt;

/// Classification of a failed syscall against a single entry. Never
/// propagated as a hard error — the walker always continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// `EACCES`/`EPERM` on `lchown` or `open`.
    NoAccess,
    /// The entry disappeared between discovery and mutation.
    NotFound,
    /// Any other `lchown` failure.
    Other,
    /// The directory itself couldn't be opened; its subtree is abandoned.
    OpenDirFailed,
    /// `lstat` failed; the entry is skipped.
    StatFailed,
}

impl ErrorClass {
    /// Classifies an `errno` value returned by `lchown`/`open`/`lstat`.
    #[must_use]
    pub const fn from_errno(errno: i32) -> Self {
        match errno {
            libc::EACCES | libc::EPERM => Self::NoAccess,
            libc::ENOENT => Self::NotFound,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoAccess => "permission denied",
            Self::NotFound => "no such file or directory",
            Self::Other => "chown failed",
            Self::OpenDirFailed => "failed to open directory",
            Self::StatFailed => "failed to stat entry",
        };
        f.write_str(s)
    }
}

/// A fatal error, only ever produced during argument parsing or owner/group
/// resolution, before any worker thread starts.
#[derive(Debug)]
pub enum ChownError {
    /// Bad command-line arguments (bounds, mutually-exclusive flags, etc).
    UsageError(String),
    /// A `user[:group]` spec couldn't be resolved to numeric ids.
    ResolveError(String),
    /// A starting directory couldn't be `lstat`'d or isn't a directory.
    InvalidRoot { path: String, reason: String },
}

impl fmt::Display for ChownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UsageError(msg) => write!(f, "usage error: {msg}"),
            Self::ResolveError(msg) => write!(f, "could not resolve: {msg}"),
            Self::InvalidRoot { path, reason } => write!(f, "{path}: {reason}"),
        }
    }
}

impl core::error::Error for ChownError {}
