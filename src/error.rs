/*
 *  error.rs
 *
 *  dylib-binder - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Error types for library loading and symbol binding
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

use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by [`DynamicLibraryBinder`](crate::DynamicLibraryBinder)
#[derive(Debug, Error)]
pub enum BinderError {
    /// The library could not be staged or opened
    #[error("Unable to load {}: {reason}", .path.display())]
    LoadFailed { path: PathBuf, reason: String },

    /// The symbol could not be resolved, or no library is loaded
    #[error("Unable to assign function {name}: {reason}")]
    SymbolNotFound { name: String, reason: String },

    /// A library is already held by this binder
    #[error("Library already loaded from {}", .path.display())]
    AlreadyLoaded { path: PathBuf },

    /// The slot type cannot hold a symbol address
    #[error("Slot for {name} is {size} bytes, expected a pointer-sized type")]
    IncompatibleSlot { name: String, size: usize },
}

impl BinderError {
    pub(crate) fn load_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        BinderError::LoadFailed { path: path.into(), reason: reason.into() }
    }

    pub(crate) fn symbol_not_found(name: &str, reason: impl Into<String>) -> Self {
        BinderError::SymbolNotFound { name: name.to_string(), reason: reason.into() }
    }
}
