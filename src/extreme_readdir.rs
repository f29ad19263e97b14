//! The optional bulk directory-read path.
//!
//! Instead of one `readdir(3)` call per entry, the directory is opened
//! read-only and its raw `dirent64` buffer is read straight from the kernel
//! in large chunks (100,000 entries by default), then parsed in place. Only
//! implemented where the kernel exposes a stable `getdents64`; rejected at
//! startup everywhere else.

use std::ffi::{CStr, CString};
use std::io;
use std::mem::offset_of;

use crate::dirread::RawEntry;
use crate::filetype::FileType;

/// Default entry count for the bulk read buffer used by `-X`.
/// Overridable via the `DIRENTS` environment variable.
pub const DEFAULT_DIRENT_COUNT: usize = 100_000;

/// Rough per-entry size used to size the raw read buffer: the fixed header
/// plus a generous `d_name` allowance.
const ASSUMED_ENTRY_SIZE: usize = offset_of!(libc::dirent64, d_name) + 256;

#[must_use]
pub const fn is_supported() -> bool {
    cfg!(target_os = "linux")
}

/// Number of entries to request per `getdents64` call, from `DIRENTS` or the
/// default.
#[must_use]
pub fn chunk_entry_count() -> usize {
    std::env::var("DIRENTS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_DIRENT_COUNT)
}

/// Reads `path` in bulk into `buf`, a worker-owned buffer reused across
/// calls so repeated directories in the same worker don't reallocate it.
/// The buffer is private to a worker's current directory and never shared.
#[cfg(target_os = "linux")]
pub fn read_dir_bulk(path: &str, entry_count: usize, buf: &mut Vec<u8>) -> io::Result<(Vec<RawEntry>, u32)> {
    let cpath = CString::new(path).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;

    // SAFETY: O_DIRECTORY makes `open` fail cleanly if `path` isn't a directory.
    let fd = unsafe { libc::open(cpath.as_ptr(), libc::O_RDONLY | libc::O_DIRECTORY) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }

    let buf_size = entry_count.saturating_mul(ASSUMED_ENTRY_SIZE).max(ASSUMED_ENTRY_SIZE);
    if buf.len() < buf_size {
        buf.resize(buf_size, 0);
    }
    let mut out = Vec::new();
    let mut syscalls = 0_u32;

    loop {
        // SAFETY: `fd` is open and owned by us; `buf` is valid for
        // `buf.len()` writable bytes.
        let nread = unsafe {
            libc::syscall(
                libc::SYS_getdents64,
                fd,
                buf.as_mut_ptr().cast::<libc::c_void>(),
                buf.len(),
            )
        };
        syscalls += 1;

        if nread < 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(err);
        }
        if nread == 0 {
            break;
        }

        let mut pos = 0_usize;
        #[allow(clippy::cast_sign_loss)]
        let nread = nread as usize;
        while pos < nread {
            // SAFETY: `pos` is within the bytes the kernel just filled in,
            // and `dirent64` records are laid out back-to-back with no gaps
            // other than `d_reclen`-implied padding.
            let entry_ptr = unsafe { buf.as_ptr().add(pos) }.cast::<libc::dirent64>();
            // SAFETY: the kernel guarantees a full record fits within
            // `[pos, pos + d_reclen)`.
            let d_reclen = unsafe { (*entry_ptr).d_reclen } as usize;
            let d_type = unsafe { (*entry_ptr).d_type };
            let d_ino = unsafe { (*entry_ptr).d_ino };

            let name_ptr = unsafe { entry_ptr.byte_add(offset_of!(libc::dirent64, d_name)) }
                .cast::<libc::c_char>();
            // SAFETY: the kernel NUL-terminates `d_name` within the record.
            let name_cstr = unsafe { CStr::from_ptr(name_ptr) };
            let name = name_cstr.to_string_lossy().into_owned();

            if d_ino != 0 && name != "." && name != ".." {
                let type_hint = match FileType::from_dtype(d_type) {
                    FileType::Unknown => None,
                    known => Some(known),
                };
                out.push(RawEntry { name, type_hint });
            }

            if d_reclen == 0 {
                break; // malformed record; bail rather than spin.
            }
            pos += d_reclen;
        }
    }

    // SAFETY: `fd` was opened by us and hasn't been closed yet.
    unsafe { libc::close(fd) };

    Ok((out, syscalls))
}

#[cfg(not(target_os = "linux"))]
pub fn read_dir_bulk(_path: &str, _entry_count: usize, _buf: &mut Vec<u8>) -> io::Result<(Vec<RawEntry>, u32)> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "extreme readdir is not implemented on this platform",
    ))
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[test]
    fn bulk_read_matches_portable_read() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f1"), b"").unwrap();
        std::fs::write(dir.path().join("f2"), b"").unwrap();
        std::fs::create_dir(dir.path().join("d1")).unwrap();

        let mut buf = Vec::new();
        let (mut entries, syscalls) =
            read_dir_bulk(dir.path().to_str().unwrap(), 1024, &mut buf).unwrap();
        assert!(syscalls >= 1);
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["d1", "f1", "f2"]);
    }

    #[test]
    fn reused_buffer_does_not_shrink_between_calls() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f1"), b"").unwrap();

        let mut buf = Vec::new();
        let (_, _) = read_dir_bulk(dir.path().to_str().unwrap(), 100_000, &mut buf).unwrap();
        let grown = buf.len();
        let (_, _) = read_dir_bulk(dir.path().to_str().unwrap(), 1, &mut buf).unwrap();
        assert_eq!(buf.len(), grown);
    }
}
