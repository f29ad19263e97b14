//! `-S`/`-T` exit-time reporting. Kept separate from [`crate::counters`] so
//! the counters stay a pure data type; this module only knows how to
//! format one.

use std::time::Duration;

use crate::counters::CountersSnapshot;

/// Prints the full statistics block to stderr under `-S`: one labelled
/// count per line.
pub fn print_stats(snapshot: &CountersSnapshot) {
    eprintln!("Entries seen:             {}", snapshot.entries_seen);
    eprintln!("Entries chowned:          {}", snapshot.entries_chowned);
    eprintln!("lstat calls:              {}", snapshot.statcount);
    eprintln!("  of which unexpected:    {}", snapshot.statcount_unexp);
    eprintln!("Directories queued:       {}", snapshot.queued_dirs);
    eprintln!("Inode-sort bypasses:      {}", snapshot.inolist_bypass);
    eprintln!("Errors - no access:       {}", snapshot.file_no_access);
    eprintln!("Errors - not found:       {}", snapshot.file_not_found);
    eprintln!("Errors - other:           {}", snapshot.file_any_other_error);
    eprintln!("Directories unopenable:   {}", snapshot.open_dir_failed);
    eprintln!("Stat failures:            {}", snapshot.stat_failed);
}

/// Prints elapsed wall time with two decimal places, under `-T`.
pub fn print_elapsed(elapsed: Duration) {
    eprintln!("Elapsed time: {:.2}s", elapsed.as_secs_f64());
}
