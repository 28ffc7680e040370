/*
 *  loader/mock.rs
 *
 *  dylib-binder - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock dynamic loader for testing without real shared libraries
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
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{LoaderError, NativeLoader};

/// Mock loader for testing
///
/// Libraries are registered by path together with their exported symbols.
/// Every call is recorded in a shared [`MockLoaderState`] so tests can
/// check, for example, that a handle was closed exactly once after the
/// binder that owned it went out of scope.
#[derive(Debug, Clone, Default)]
pub struct MockLoader {
    libraries: HashMap<PathBuf, HashMap<String, usize>>,
    state: Arc<Mutex<MockLoaderState>>,
}

/// Handle issued by [`MockLoader::open`]
#[derive(Debug, PartialEq, Eq)]
pub struct MockHandle {
    id: usize,
    path: PathBuf,
}

impl MockHandle {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Call log shared between a [`MockLoader`] and its clones
#[derive(Debug, Default)]
pub struct MockLoaderState {
    /// Paths passed to open(), in call order
    pub opened: Vec<PathBuf>,

    /// Lazy flag passed with each open()
    pub lazy_flags: Vec<bool>,

    /// Symbol names passed to resolve(), in call order
    pub resolved: Vec<String>,

    /// Handle ids passed to close(), in call order
    pub closed: Vec<usize>,

    /// Number of handles issued so far
    pub next_id: usize,

    /// Simulate a close() failure
    pub simulate_close_failure: bool,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a library at `path` with no exports
    pub fn with_library<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.libraries.entry(path.as_ref().to_path_buf()).or_default();
        self
    }

    /// Register an exported symbol; registers the library too if needed
    pub fn with_symbol<P: AsRef<Path>>(mut self, path: P, name: &str, address: *const c_void) -> Self {
        self.libraries
            .entry(path.as_ref().to_path_buf())
            .or_default()
            .insert(name.to_string(), address as usize);
        self
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MockLoaderState>> {
        Arc::clone(&self.state)
    }

    pub fn open_count(&self) -> usize {
        self.lock().opened.len()
    }

    pub fn close_count(&self) -> usize {
        self.lock().closed.len()
    }

    fn lock(&self) -> MutexGuard<'_, MockLoaderState> {
        // a panicking test may poison the lock; the counters are still valid
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl NativeLoader for MockLoader {
    type Handle = MockHandle;

    fn open(&self, path: &Path, lazy: bool) -> Result<MockHandle, LoaderError> {
        let mut state = self.lock();
        state.opened.push(path.to_path_buf());
        state.lazy_flags.push(lazy);

        if !self.libraries.contains_key(path) {
            return Err(LoaderError::new(format!(
                "{}: cannot open shared object file: No such file or directory",
                path.display()
            )));
        }

        state.next_id += 1;
        Ok(MockHandle { id: state.next_id, path: path.to_path_buf() })
    }

    fn resolve(&self, handle: &MockHandle, name: &str) -> Result<*mut c_void, LoaderError> {
        self.lock().resolved.push(name.to_string());

        self.libraries
            .get(&handle.path)
            .and_then(|symbols| symbols.get(name))
            .filter(|&&address| address != 0)
            .map(|&address| address as *mut c_void)
            .ok_or_else(|| LoaderError::new(format!(
                "{}: undefined symbol: {}",
                handle.path.display(),
                name
            )))
    }

    fn close(&self, handle: MockHandle) -> Result<(), LoaderError> {
        let mut state = self.lock();
        state.closed.push(handle.id);
        if state.simulate_close_failure {
            return Err(LoaderError::new("simulated close failure"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_unknown_path_fails() {
        let loader = MockLoader::new();
        assert!(loader.open(Path::new("/addons/missing.so"), true).is_err());
        assert_eq!(loader.open_count(), 1);
    }

    #[test]
    fn test_resolve_registered_symbol() {
        let marker = 0u8;
        let address = &marker as *const u8 as *const c_void;
        let loader = MockLoader::new().with_symbol("/addons/mylib.so", "Init", address);

        let handle = loader.open(Path::new("/addons/mylib.so"), true).unwrap();
        assert_eq!(loader.resolve(&handle, "Init").unwrap() as usize, address as usize);
        assert!(loader.resolve(&handle, "Cleanup").is_err());

        loader.close(handle).unwrap();
        assert_eq!(loader.close_count(), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let loader = MockLoader::new().with_library("/addons/mylib.so");
        let clone = loader.clone();

        let handle = clone.open(Path::new("/addons/mylib.so"), false).unwrap();
        clone.close(handle).unwrap();

        assert_eq!(loader.open_count(), 1);
        assert_eq!(loader.close_count(), 1);
        assert_eq!(loader.state().lock().unwrap().lazy_flags, vec![false]);
    }
}
