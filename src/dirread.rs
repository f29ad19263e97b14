//! The portable "one entry at a time" directory read path. Gives the walker
//! direct access to the directory-entry type hint so it can decide whether
//! an `lstat` is required, rather than hiding that decision inside
//! `std::fs::read_dir`. Platform variance is collapsed behind a capability
//! check done once, not sprinkled through the walker.

use std::ffi::{CStr, CString};
use std::io;

use crate::filetype::FileType;

/// One raw directory entry: its name and, where the platform supplies one,
/// its type hint straight from the directory read (no stat performed yet).
pub struct RawEntry {
    pub name: String,
    /// `None` means either `DT_UNKNOWN` or that this platform doesn't
    /// return type hints at all — both cases the walker treats identically.
    pub type_hint: Option<FileType>,
}

/// Whether the current platform's `readdir` supplies a type hint at all.
/// Kept as a `const fn` so the walker can branch on it without a runtime
/// check — this capability happens to be knowable entirely at compile time.
#[must_use]
pub const fn platform_has_type_hints() -> bool {
    cfg!(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "freebsd"
    ))
}

/// Opens `path` and reads every entry except `.` and `..`.
///
/// # Errors
/// Returns the `opendir` failure; the caller classifies this as
/// `OpenDirFailed` and abandons the subtree.
pub fn read_dir_raw(path: &str) -> io::Result<Vec<RawEntry>> {
    let cpath = CString::new(path).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;

    // SAFETY: `cpath` is a valid NUL-terminated C string.
    let dirp = unsafe { libc::opendir(cpath.as_ptr()) };
    if dirp.is_null() {
        return Err(io::Error::last_os_error());
    }

    let mut out = Vec::new();
    loop {
        // SAFETY: `dirp` was just opened successfully and isn't closed
        // until after this loop. A NULL return means end-of-directory; we
        // don't distinguish that from a read error, matching how this tool
        // has always behaved — by the time we're reading entries, opendir
        // already proved the directory was accessible.
        let dent = unsafe { libc::readdir(dirp) };
        if dent.is_null() {
            break;
        }

        // SAFETY: `dent` is non-null and was just returned by `readdir`.
        let name_ptr = unsafe { (*dent).d_name.as_ptr() };
        // SAFETY: `d_name` is NUL-terminated by the kernel.
        let name_cstr = unsafe { CStr::from_ptr(name_ptr.cast()) };
        let name = name_cstr.to_string_lossy().into_owned();

        if name == "." || name == ".." {
            continue;
        }

        let type_hint = dirent_type_hint(dent);
        out.push(RawEntry { name, type_hint });
    }

    // SAFETY: `dirp` is still open and was opened by us.
    unsafe { libc::closedir(dirp) };

    Ok(out)
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "freebsd"
))]
fn dirent_type_hint(dent: *mut libc::dirent) -> Option<FileType> {
    // SAFETY: `dent` is a valid, just-returned `readdir` entry.
    let d_type = unsafe { (*dent).d_type };
    match FileType::from_dtype(d_type) {
        FileType::Unknown => None,
        known => Some(known),
    }
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "freebsd"
)))]
fn dirent_type_hint(_dent: *mut libc::dirent) -> Option<FileType> {
    None
}

/// `lstat(2)`: never follows a final symlink component.
///
/// # Errors
/// Returns the underlying `lstat` failure.
pub fn lstat(path: &str) -> io::Result<libc::stat> {
    let cpath = CString::new(path).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
    let mut stat: libc::stat = unsafe { core::mem::zeroed() };
    // SAFETY: `cpath` is NUL-terminated and `stat` is a valid out-pointer.
    let rc = unsafe { libc::lstat(cpath.as_ptr(), &raw mut stat) };
    if rc == 0 {
        Ok(stat)
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_back_created_entries_excluding_dot_and_dotdot() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let entries = read_dir_raw(dir.path().to_str().unwrap()).unwrap();
        let mut names: Vec<_> = entries.iter().map(|e| e.name.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["a.txt".to_string(), "sub".to_string()]);
    }

    #[test]
    fn nonexistent_directory_is_an_error() {
        assert!(read_dir_raw("/does/not/exist/chowntree").is_err());
    }
}
