/*
 *  probe.rs
 *
 *  dylib-binder - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  LibraryProbe - a plugin object that embeds a binder
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

use std::ffi::c_int;
use std::path::Path;
use log::{debug, info};

use crate::binder::DynamicLibraryBinder;
use crate::error::BinderError;
use crate::loader::{DefaultLoader, NativeLoader};

/// Signature assumed for callable entry points: `int fn(void)`
pub type EntryPoint = extern "C" fn() -> c_int;

/// Plugin object holding a binder and the entry points bound through it
///
/// Start-up binds a list of symbols in order and stops at the first one
/// that is missing. Dropping the probe drops the binder, which closes the
/// library.
pub struct LibraryProbe<L: NativeLoader = DefaultLoader> {
    binder: DynamicLibraryBinder<L>,
    entries: Vec<(String, EntryPoint)>,
}

impl<L: NativeLoader> LibraryProbe<L> {
    pub fn new(binder: DynamicLibraryBinder<L>) -> Self {
        Self { binder, entries: Vec::new() }
    }

    pub fn binder(&self) -> &DynamicLibraryBinder<L> {
        &self.binder
    }

    /// Names of the bound entry points, in bind order
    pub fn bound(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Load `path` and bind every name in `symbols`
    ///
    /// Returns the number of symbols bound. The first failure aborts
    /// start-up; entries bound before it stay available.
    ///
    /// # Safety
    /// Every symbol in `symbols` must be a function with the
    /// [`EntryPoint`] signature if it is later passed to [`call`](Self::call).
    pub unsafe fn start<P: AsRef<Path>, S: AsRef<str>>(&mut self, path: P, symbols: &[S]) -> Result<usize, BinderError> {
        self.binder.load(path)?;

        for name in symbols {
            let name = name.as_ref();
            let mut slot: Option<EntryPoint> = None;
            unsafe { self.binder.bind_symbol(name, &mut slot)? };
            if let Some(entry) = slot {
                self.entries.push((name.to_string(), entry));
            }
        }

        info!("Bound {} of {} symbols", self.entries.len(), symbols.len());
        Ok(self.entries.len())
    }

    /// Call a bound entry point
    pub fn call(&self, name: &str) -> Result<c_int, BinderError> {
        let (_, entry) = self.entries
            .iter()
            .find(|(bound, _)| bound == name)
            .ok_or_else(|| BinderError::symbol_not_found(name, "not bound"))?;

        let rc = entry();
        debug!("{}() returned {}", name, rc);
        Ok(rc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::c_void;
    use crate::loader::MockLoader;

    const LIB: &str = "/addons/mylib.so";

    extern "C" fn fake_init() -> c_int {
        1
    }

    extern "C" fn fake_cleanup() -> c_int {
        0
    }

    fn probe(loader: &MockLoader) -> LibraryProbe<MockLoader> {
        LibraryProbe::new(DynamicLibraryBinder::with_loader(loader.clone()))
    }

    #[test]
    fn test_start_binds_all() {
        let loader = MockLoader::new()
            .with_symbol(LIB, "Init", fake_init as *const c_void)
            .with_symbol(LIB, "Cleanup", fake_cleanup as *const c_void);
        let mut probe = probe(&loader);

        let bound = unsafe { probe.start(LIB, &["Init", "Cleanup"]) }.unwrap();
        assert_eq!(bound, 2);
        assert_eq!(probe.bound().collect::<Vec<_>>(), vec!["Init", "Cleanup"]);
        assert_eq!(probe.call("Init").unwrap(), 1);
        assert_eq!(probe.call("Cleanup").unwrap(), 0);
    }

    #[test]
    fn test_start_stops_at_first_missing_symbol() {
        let loader = MockLoader::new()
            .with_symbol(LIB, "Init", fake_init as *const c_void)
            .with_symbol(LIB, "Cleanup", fake_cleanup as *const c_void);
        let mut probe = probe(&loader);

        let err = unsafe { probe.start(LIB, &["Init", "GetLength", "Cleanup"]) }.unwrap_err();
        assert!(matches!(err, BinderError::SymbolNotFound { .. }));
        assert_eq!(probe.bound().collect::<Vec<_>>(), vec!["Init"]);
        assert!(probe.call("Cleanup").is_err());
        assert_eq!(loader.state().lock().unwrap().resolved, vec!["Init", "GetLength"]);
    }

    #[test]
    fn test_drop_probe_closes_library() {
        let loader = MockLoader::new().with_symbol(LIB, "Init", fake_init as *const c_void);
        {
            let mut probe = probe(&loader);
            unsafe { probe.start(LIB, &["Init"]) }.unwrap();
        }
        assert_eq!(loader.close_count(), 1);
    }
}
