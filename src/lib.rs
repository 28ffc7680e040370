/*
 *  lib.rs
 *
 *  dylib-binder - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Runtime shared library loading and symbol binding
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

//! Load a shared library at runtime and bind its exported functions into
//! typed function-pointer slots.
//!
//! ## Architecture
//!
//! 1. **Binder** (`binder.rs`) - owns one library handle, binds symbols,
//!    closes the handle on drop
//! 2. **Loader** (`loader/`) - the native dynamic loader behind a trait
//! 3. **Staging** (`staging.rs`) - copies libraries into a loadable
//!    directory on platforms that need it
//! 4. **VFS** (`vfs/`) - filesystem services used by staging
//!
//! ## Usage
//!
//! Embed a [`DynamicLibraryBinder`] in the plugin object, load once, then
//! bind each entry point and bail out on the first one missing:
//!
//! ```no_run
//! use std::ffi::c_int;
//! use dylib_binder::DynamicLibraryBinder;
//!
//! let mut binder = DynamicLibraryBinder::new();
//! binder.load("/addons/mylib.so")?;
//!
//! let mut init: Option<extern "C" fn() -> c_int> = None;
//! unsafe { binder.bind_symbol("Init", &mut init)? };
//! # Ok::<(), dylib_binder::BinderError>(())
//! ```

pub mod binder;
pub mod config;
pub mod error;
pub mod loader;
pub mod probe;
pub mod staging;
pub mod vfs;

// Re-exports for convenience
pub use binder::DynamicLibraryBinder;
pub use error::BinderError;
pub use loader::{LoaderError, MockLoader, NativeLoader};
#[cfg(feature = "system-loader")]
pub use loader::SystemLoader;
pub use probe::{EntryPoint, LibraryProbe};
pub use staging::{CopyIfStale, DirectLoad, StagingMode, StagingPolicy};
pub use vfs::{FileStat, Filesystem, LocalFs, MockFs};
