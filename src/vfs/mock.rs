/*
 *  vfs/mock.rs
 *
 *  dylib-binder - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  In-memory filesystem for staging tests
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

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{split_special, FileStat, Filesystem};

/// Mock filesystem
///
/// Files exist only as [`FileStat`] entries. A copy writes the source size
/// to the destination, stamped with the mock clock ([`MockFsState::now`]).
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    state: Arc<Mutex<MockFsState>>,
}

/// Shared state for the mock filesystem
#[derive(Debug, Default)]
pub struct MockFsState {
    /// Files currently present
    pub files: HashMap<PathBuf, FileStat>,

    /// Special roots by token name
    pub special_paths: HashMap<String, PathBuf>,

    /// (src, dst) of every copy() call
    pub copies: Vec<(PathBuf, PathBuf)>,

    /// Mtime given to copied files
    pub now: i64,

    /// Simulate a copy() failure
    pub simulate_copy_failure: bool,
}

impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file<P: AsRef<Path>>(self, path: P, size: u64, modified: i64) -> Self {
        self.lock().files.insert(path.as_ref().to_path_buf(), FileStat::new(size, modified));
        self
    }

    pub fn with_special_path<P: Into<PathBuf>>(self, name: &str, root: P) -> Self {
        self.lock().special_paths.insert(name.to_string(), root.into());
        self
    }

    pub fn with_clock(self, now: i64) -> Self {
        self.lock().now = now;
        self
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MockFsState>> {
        Arc::clone(&self.state)
    }

    pub fn copy_count(&self) -> usize {
        self.lock().copies.len()
    }

    fn lock(&self) -> MutexGuard<'_, MockFsState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Filesystem for MockFs {
    fn exists(&self, path: &Path) -> bool {
        self.lock().files.contains_key(path)
    }

    fn stat(&self, path: &Path) -> Option<FileStat> {
        self.lock().files.get(path).copied()
    }

    fn copy(&self, src: &Path, dst: &Path) -> io::Result<()> {
        let mut state = self.lock();
        state.copies.push((src.to_path_buf(), dst.to_path_buf()));

        if state.simulate_copy_failure {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "simulated copy failure"));
        }

        let source = state.files.get(src).copied().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} not found", src.display()))
        })?;
        let now = state.now;
        state.files.insert(dst.to_path_buf(), FileStat::new(source.size, now));
        Ok(())
    }

    fn translate_special_path(&self, token: &str) -> Option<PathBuf> {
        let (name, rest) = split_special(token)?;
        let root = self.lock().special_paths.get(name)?.clone();
        if rest.is_empty() { Some(root) } else { Some(root.join(rest)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_stamps_clock() {
        let fs = MockFs::new().with_file("/addons/mylib.so", 100, 10).with_clock(50);
        fs.copy(Path::new("/addons/mylib.so"), Path::new("/cache/mylib.so")).unwrap();

        assert_eq!(fs.stat(Path::new("/cache/mylib.so")), Some(FileStat::new(100, 50)));
        assert_eq!(fs.copy_count(), 1);
    }

    #[test]
    fn test_copy_missing_source() {
        let fs = MockFs::new();
        assert!(fs.copy(Path::new("/nope.so"), Path::new("/cache/nope.so")).is_err());
        assert!(!fs.exists(Path::new("/cache/nope.so")));
    }
}
