//! Parses the `[user][:[group]]` positional argument into a pair of
//! [`TargetId`]s. Numeric ids are taken literally; names are resolved via
//! `getpwnam_r`/`getgrnam_r`. Its internals aren't part of the traversal
//! engine's test surface, but a usage bug here is still a fatal startup
//! error.

use std::ffi::CString;

use crate::error::ChownError;
use crate::ids::TargetId;

/// Parses `spec` into `(uid, gid)`. A leading `:` means "group only"; an
/// absent group segment leaves the group unchanged.
///
/// # Errors
/// Returns [`ChownError::ResolveError`] if a named user/group can't be found.
pub fn parse(spec: &str) -> Result<(TargetId, TargetId), ChownError> {
    if let Some(group_part) = spec.strip_prefix(':') {
        let gid = resolve_group(group_part)?;
        return Ok((TargetId::Unchanged, gid));
    }

    if let Some((user_part, group_part)) = spec.split_once(':') {
        let uid = resolve_user(user_part)?;
        let gid = resolve_group(group_part)?;
        Ok((uid, gid))
    } else {
        Ok((resolve_user(spec)?, TargetId::Unchanged))
    }
}

fn resolve_user(text: &str) -> Result<TargetId, ChownError> {
    if starts_with_digit(text) {
        return parse_numeric(text);
    }
    lookup_user_by_name(text)
}

fn resolve_group(text: &str) -> Result<TargetId, ChownError> {
    if starts_with_digit(text) {
        return parse_numeric(text);
    }
    lookup_group_by_name(text)
}

fn starts_with_digit(text: &str) -> bool {
    text.chars().next().is_some_and(|c| c.is_ascii_digit())
}

fn parse_numeric(text: &str) -> Result<TargetId, ChownError> {
    text.parse::<u32>()
        .map(TargetId::Set)
        .map_err(|_| ChownError::ResolveError(format!("not a valid numeric id: {text:?}")))
}

/// Growable buffer retry loop shared by `getpwnam_r`/`getgrnam_r`: both
/// signal "buffer too small" with `ERANGE`.
const INITIAL_BUF_SIZE: usize = 1024;
const MAX_BUF_SIZE: usize = 1 << 20;

fn lookup_user_by_name(name: &str) -> Result<TargetId, ChownError> {
    let cname = CString::new(name)
        .map_err(|_| ChownError::ResolveError(format!("invalid user name: {name:?}")))?;

    let mut buf_size = INITIAL_BUF_SIZE;
    loop {
        let mut buf = vec![0_i8; buf_size];
        let mut pwd: libc::passwd = unsafe { core::mem::zeroed() };
        let mut result: *mut libc::passwd = std::ptr::null_mut();

        // SAFETY: `cname` is NUL-terminated; `buf` and `pwd` are valid
        // out-buffers of the sizes passed.
        let rc = unsafe {
            libc::getpwnam_r(
                cname.as_ptr(),
                &raw mut pwd,
                buf.as_mut_ptr(),
                buf.len(),
                &raw mut result,
            )
        };

        if rc == 0 && !result.is_null() {
            return Ok(TargetId::Set(pwd.pw_uid));
        }
        if rc == libc::ERANGE && buf_size < MAX_BUF_SIZE {
            buf_size *= 2;
            continue;
        }
        return Err(ChownError::ResolveError(format!("unknown user: {name:?}")));
    }
}

fn lookup_group_by_name(name: &str) -> Result<TargetId, ChownError> {
    let cname = CString::new(name)
        .map_err(|_| ChownError::ResolveError(format!("invalid group name: {name:?}")))?;

    let mut buf_size = INITIAL_BUF_SIZE;
    loop {
        let mut buf = vec![0_i8; buf_size];
        let mut grp: libc::group = unsafe { core::mem::zeroed() };
        let mut result: *mut libc::group = std::ptr::null_mut();

        // SAFETY: as above, for `getgrnam_r`.
        let rc = unsafe {
            libc::getgrnam_r(
                cname.as_ptr(),
                &raw mut grp,
                buf.as_mut_ptr(),
                buf.len(),
                &raw mut result,
            )
        };

        if rc == 0 && !result.is_null() {
            return Ok(TargetId::Set(grp.gr_gid));
        }
        if rc == libc::ERANGE && buf_size < MAX_BUF_SIZE {
            buf_size *= 2;
            continue;
        }
        return Err(ChownError::ResolveError(format!("unknown group: {name:?}")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_uid_and_gid() {
        assert_eq!(parse("1000:1000").unwrap(), (TargetId::Set(1000), TargetId::Set(1000)));
    }

    #[test]
    fn numeric_uid_only_leaves_gid_unchanged() {
        assert_eq!(parse("1000").unwrap(), (TargetId::Set(1000), TargetId::Unchanged));
    }

    #[test]
    fn leading_colon_means_group_only() {
        assert_eq!(parse(":1000").unwrap(), (TargetId::Unchanged, TargetId::Set(1000)));
    }

    #[test]
    fn name_resolves_via_getpwnam() {
        let (uid, _gid) = parse("root").unwrap();
        assert_eq!(uid, TargetId::Set(0));
    }

    #[test]
    fn unknown_user_name_is_a_resolve_error() {
        assert!(parse("no-such-user-chowntree-xyz").is_err());
    }
}
