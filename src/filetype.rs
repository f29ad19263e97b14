//! Entry type classification shared by the walker, the mutator and the CLI's
//! `-f`/`-d` filters.

use libc::{
    DT_BLK, DT_CHR, DT_DIR, DT_FIFO, DT_LNK, DT_REG, DT_SOCK, S_IFBLK, S_IFCHR, S_IFDIR, S_IFIFO,
    S_IFLNK, S_IFMT, S_IFREG, S_IFSOCK, mode_t,
};

/// The type of a filesystem entry, derived either from a directory-entry type
/// hint or from an `lstat` call when the hint is unavailable or untrustworthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FileType {
    Directory,
    RegularFile,
    Symlink,
    BlockDevice,
    CharDevice,
    Fifo,
    Socket,
    /// Readdir returned `DT_UNKNOWN`, or the platform doesn't supply type
    /// hints at all; the caller must `lstat` to resolve this.
    Unknown,
}

impl FileType {
    /// Maps a `dirent`/`dirent64` `d_type` byte to a [`FileType`].
    #[must_use]
    #[inline]
    pub const fn from_dtype(d_type: u8) -> Self {
        match d_type {
            DT_DIR => Self::Directory,
            DT_REG => Self::RegularFile,
            DT_LNK => Self::Symlink,
            DT_BLK => Self::BlockDevice,
            DT_CHR => Self::CharDevice,
            DT_FIFO => Self::Fifo,
            DT_SOCK => Self::Socket,
            _ => Self::Unknown,
        }
    }

    /// Maps an `st_mode` field (from `lstat`) to a [`FileType`].
    #[must_use]
    #[inline]
    pub const fn from_mode(mode: mode_t) -> Self {
        match mode & S_IFMT {
            S_IFREG => Self::RegularFile,
            S_IFDIR => Self::Directory,
            S_IFLNK => Self::Symlink,
            S_IFBLK => Self::BlockDevice,
            S_IFCHR => Self::CharDevice,
            S_IFIFO => Self::Fifo,
            S_IFSOCK => Self::Socket,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    #[inline]
    pub const fn is_directory(self) -> bool {
        matches!(self, Self::Directory)
    }
}
