/*
 *  loader/system.rs
 *
 *  dylib-binder - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  OS dynamic loader backed by libloading
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

use std::ffi::c_void;
use std::path::Path;
use libloading::{Library, Symbol};

use super::{LoaderError, NativeLoader};

/// The platform loader: `dlopen` on unix, `LoadLibraryExW` on Windows
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLoader;

impl SystemLoader {
    pub fn new() -> Self {
        SystemLoader
    }

    #[cfg(unix)]
    fn open_library(path: &Path, lazy: bool) -> Result<Library, libloading::Error> {
        use libloading::os::unix::{RTLD_LAZY, RTLD_LOCAL, RTLD_NOW};

        let binding = if lazy { RTLD_LAZY } else { RTLD_NOW };
        let library = unsafe { libloading::os::unix::Library::open(Some(path), binding | RTLD_LOCAL)? };
        Ok(library.into())
    }

    // Windows resolves imports at load time, there is no lazy mode to ask for
    #[cfg(not(unix))]
    fn open_library(path: &Path, _lazy: bool) -> Result<Library, libloading::Error> {
        unsafe { Library::new(path) }
    }
}

impl NativeLoader for SystemLoader {
    type Handle = Library;

    fn open(&self, path: &Path, lazy: bool) -> Result<Library, LoaderError> {
        Self::open_library(path, lazy).map_err(|e| LoaderError::new(e.to_string()))
    }

    fn resolve(&self, handle: &Library, name: &str) -> Result<*mut c_void, LoaderError> {
        let symbol: Symbol<*mut c_void> = unsafe {
            handle.get(name.as_bytes())
                .map_err(|e| LoaderError::new(e.to_string()))?
        };

        let address = *symbol;
        if address.is_null() {
            return Err(LoaderError::new(format!("{}: symbol resolved to null", name)));
        }
        Ok(address)
    }

    fn close(&self, handle: Library) -> Result<(), LoaderError> {
        handle.close().map_err(|e| LoaderError::new(e.to_string()))
    }
}
