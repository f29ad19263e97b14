//! The unit of deferred work passed between the walker and the pool.

/// A directory discovered during traversal but not yet (or not further)
/// processed. Owns its path exclusively; released when its walker returns.
#[derive(Debug, Clone)]
pub struct DirectoryTask {
    pub path: Box<str>,
    pub depth: u32,
    pub st_dev: u64,
    pub st_nlink: u64,
    pub st_uid: u32,
    pub st_gid: u32,
    pub st_ino: u64,
    /// Subdirectories of this task already processed inline, before this
    /// particular instance was itself queued. Always `0` for a freshly
    /// enqueued task; only ephemeral, stack-resident tasks accumulate this
    /// during a single `walk` call, and never beyond the inline threshold.
    pub inlined: u32,
    /// Entries seen within this directory. Informational only.
    pub filecnt: u32,
}

impl DirectoryTask {
    #[must_use]
    pub fn new(path: impl Into<Box<str>>, depth: u32, stat: &libc::stat) -> Self {
        Self {
            path: path.into(),
            depth,
            st_dev: stat.st_dev as u64,
            #[allow(clippy::unnecessary_cast)]
            st_nlink: stat.st_nlink as u64,
            st_uid: stat.st_uid,
            st_gid: stat.st_gid,
            st_ino: stat.st_ino,
            inlined: 0,
            filecnt: 0,
        }
    }
}

/// Joins `parent` and `name` into a child path. No extra separator is
/// inserted when `parent` is exactly `/`.
#[must_use]
pub fn join_child(parent: &str, name: &str) -> String {
    if parent == "/" {
        let mut out = String::with_capacity(1 + name.len());
        out.push('/');
        out.push_str(name);
        out
    } else {
        let mut out = String::with_capacity(parent.len() + 1 + name.len());
        out.push_str(parent);
        out.push('/');
        out.push_str(name);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_join_does_not_double_slash() {
        assert_eq!(join_child("/", "etc"), "/etc");
    }

    #[test]
    fn nested_join_inserts_one_slash() {
        assert_eq!(join_child("/etc", "passwd"), "/etc/passwd");
    }
}
