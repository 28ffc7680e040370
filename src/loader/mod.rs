/*
 *  loader/mod.rs
 *
 *  dylib-binder - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Native dynamic loader abstraction
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

//! Native dynamic loader
//!
//! The OS loader table is process-wide state. The binder never touches it
//! directly; it goes through a [`NativeLoader`] so tests can swap in
//! [`mock::MockLoader`] instead of opening real shared libraries.
//!
//! ## Implementations
//!
//! - [`system::SystemLoader`] - `dlopen`/`dlsym`/`dlclose` (or the Windows
//!   equivalents) via `libloading`, behind the `system-loader` feature
//! - [`mock::MockLoader`] - in-memory symbol table with call counters

use std::ffi::c_void;
use std::path::Path;
use thiserror::Error;

pub mod mock;
#[cfg(feature = "system-loader")]
pub mod system;

pub use mock::{MockLoader, MockLoaderState};
#[cfg(feature = "system-loader")]
pub use system::SystemLoader;

/// Loader used when a binder names none: the OS loader, or the mock when
/// built without `system-loader`
#[cfg(feature = "system-loader")]
pub type DefaultLoader = SystemLoader;
#[cfg(not(feature = "system-loader"))]
pub type DefaultLoader = MockLoader;

/// Error text reported by the native loader (the `dlerror()` string)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct LoaderError(pub String);

impl LoaderError {
    pub fn new(msg: impl Into<String>) -> Self {
        LoaderError(msg.into())
    }
}

/// Open, resolve and close operations of a native dynamic loader
///
/// Handles are owned values: `close` consumes the handle, so a handle can
/// only be released once.
pub trait NativeLoader {
    /// Opaque handle to one opened library
    type Handle;

    /// Open the library at `path`
    ///
    /// With `lazy` set, symbol relocation is deferred until first use
    /// (`RTLD_LAZY`).
    fn open(&self, path: &Path, lazy: bool) -> Result<Self::Handle, LoaderError>;

    /// Resolve `name` to the address of an exported symbol
    ///
    /// Implementations must return an error rather than a null address.
    fn resolve(&self, handle: &Self::Handle, name: &str) -> Result<*mut c_void, LoaderError>;

    /// Release the handle
    fn close(&self, handle: Self::Handle) -> Result<(), LoaderError>;
}
