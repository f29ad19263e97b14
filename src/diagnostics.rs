//! Serialised diagnostic output: concurrent failures must not interleave
//! partial lines on stderr.

use std::io::{self, Write as _};
use std::sync::Mutex;

use crate::error::ErrorClass;

/// A mutex held across an entire write, so two workers' error lines can
/// never interleave.
pub struct Diagnostics {
    lock: Mutex<()>,
    debug: bool,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lock: Mutex::new(()),
            debug: std::env::var_os("DEBUG").is_some(),
        }
    }

    #[must_use]
    pub const fn debug_enabled(&self) -> bool {
        self.debug
    }

    /// Reports a failed syscall against `path`, classified as `class`.
    pub fn report(&self, path: &str, class: ErrorClass, errno: i32) {
        let _guard = self.lock.lock().unwrap_or_else(|poison| poison.into_inner());
        let mut stderr = io::stderr().lock();
        let _ = writeln!(
            stderr,
            "chowntree: {path}: {class} ({})",
            io::Error::from_raw_os_error(errno)
        );
    }

    /// A free-form debug trace line, only emitted when `DEBUG` is set.
    pub fn trace(&self, message: &core::fmt::Arguments<'_>) {
        if !self.debug {
            return;
        }
        let _guard = self.lock.lock().unwrap_or_else(|poison| poison.into_inner());
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "[debug] {message}");
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

/// Emits a [`Diagnostics::trace`] line, building the `format_args!` only
/// when the caller already holds a `&Diagnostics`.
#[macro_export]
macro_rules! trace {
    ($diag:expr, $($arg:tt)*) => {
        $diag.trace(&format_args!($($arg)*))
    };
}
