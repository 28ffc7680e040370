/*
 *  vfs/mod.rs
 *
 *  dylib-binder - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Filesystem services used by library staging
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

//! Filesystem services
//!
//! Staging only needs a handful of operations: existence, size and
//! modification time, copy, and translation of `special://` tokens into real
//! directories. They sit behind [`Filesystem`] so staging decisions can be
//! tested against [`mock::MockFs`].

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod local;
pub mod mock;

pub use local::LocalFs;
pub use mock::{MockFs, MockFsState};

/// Prefix of a translatable special path token
pub const SPECIAL_SCHEME: &str = "special://";

/// Size and modification time of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// Size in bytes
    pub size: u64,

    /// Modification time, seconds since the unix epoch
    pub modified: i64,
}

impl FileStat {
    pub fn new(size: u64, modified: i64) -> Self {
        Self { size, modified }
    }
}

/// Filesystem operations needed by library staging
pub trait Filesystem: Send {
    fn exists(&self, path: &Path) -> bool;

    /// Size and mtime of `path`, or `None` if it cannot be stat'ed
    fn stat(&self, path: &Path) -> Option<FileStat>;

    fn copy(&self, src: &Path, dst: &Path) -> io::Result<()>;

    /// Resolve a `special://name/rest` token to a real path
    fn translate_special_path(&self, token: &str) -> Option<PathBuf>;

    fn file_name_of(&self, path: &Path) -> Option<OsString> {
        path.file_name().map(|name| name.to_os_string())
    }
}

/// Seconds since the unix epoch, negative for earlier times
///
/// Comparable across source and cached copies regardless of platform
/// clock APIs.
pub fn epoch_secs(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_secs() as i64,
        Err(before) => -(before.duration().as_secs() as i64),
    }
}

/// Split `special://name/rest` into `("name", "rest")`
pub fn split_special(token: &str) -> Option<(&str, &str)> {
    let rest = token.strip_prefix(SPECIAL_SCHEME)?;
    let (name, remainder) = match rest.split_once('/') {
        Some((name, remainder)) => (name, remainder),
        None => (rest, ""),
    };
    if name.is_empty() {
        return None;
    }
    Some((name, remainder))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_epoch_secs() {
        assert_eq!(epoch_secs(UNIX_EPOCH), 0);
        assert_eq!(epoch_secs(UNIX_EPOCH + Duration::from_secs(1_700_000_000)), 1_700_000_000);
        assert_eq!(epoch_secs(UNIX_EPOCH - Duration::from_secs(60)), -60);
    }

    #[test]
    fn test_split_special() {
        assert_eq!(split_special("special://altbinaddons/"), Some(("altbinaddons", "")));
        assert_eq!(split_special("special://altbinaddons/lib/x.so"), Some(("altbinaddons", "lib/x.so")));
        assert_eq!(split_special("special://home"), Some(("home", "")));
        assert_eq!(split_special("special:///x"), None);
        assert_eq!(split_special("/usr/lib"), None);
    }
}
