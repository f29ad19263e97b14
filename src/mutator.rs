//! The per-entry ownership mutation. Deliberately trivial: one syscall, one
//! error classification. Never returns an error to the caller; failures are
//! counted and logged, and the walker always continues.

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt as _;
use std::path::Path;

use crate::counters::Counters;
use crate::diagnostics::Diagnostics;
use crate::error::ErrorClass;
use crate::ids::TargetId;

/// Applies a symlink-safe ownership change to `path`.
///
/// `uid`/`gid` of [`TargetId::Unchanged`] leave the corresponding id alone
/// (translated to `lchown`'s `-1` sentinel at the FFI boundary only).
pub fn apply(path: &Path, uid: TargetId, gid: TargetId, counters: &Counters, diag: &Diagnostics) {
    let Ok(cpath) = CString::new(path.as_os_str().as_bytes()) else {
        // Paths can never legitimately contain an embedded NUL; this would
        // mean the tree was corrupt in some exotic way. Count and move on.
        counters.record_error(ErrorClass::Other);
        diag.report(&path.to_string_lossy(), ErrorClass::Other, libc::EINVAL);
        return;
    };

    // SAFETY: `cpath` is a valid NUL-terminated C string for the lifetime of
    // this call; `lchown` never follows the final symlink component.
    let rc = unsafe { libc::lchown(cpath.as_ptr(), uid.as_raw(), gid.as_raw()) };

    if rc == 0 {
        counters.record_chowned();
    } else {
        let errno = std::io::Error::last_os_error()
            .raw_os_error()
            .unwrap_or(libc::EIO);
        let class = ErrorClass::from_errno(errno);
        counters.record_error(class);
        diag.report(&path.to_string_lossy(), class, errno);
    }
}
