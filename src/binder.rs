/*
 *  binder.rs
 *
 *  dylib-binder - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  DynamicLibraryBinder - owns one library handle and binds its symbols
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
use std::mem;
use std::path::{Path, PathBuf};
use log::{debug, error, info, warn};

use crate::error::BinderError;
use crate::loader::{DefaultLoader, NativeLoader};
use crate::staging::{DirectLoad, StagingPolicy};

#[cfg(feature = "system-loader")]
use crate::loader::SystemLoader;

/// Bind an exported symbol into a slot named after it
///
/// `register_symbol!(binder, self.Init)` binds the symbol `Init` into the
/// field `self.Init`; `register_symbol!(binder, Init)` binds into a local.
/// Expands to an `unsafe` call to
/// [`bind_symbol`](crate::DynamicLibraryBinder::bind_symbol), so it must be
/// used inside an `unsafe` block.
#[macro_export]
macro_rules! register_symbol {
    ($binder:expr, $owner:ident . $field:ident) => {
        $binder.bind_symbol(stringify!($field), &mut $owner.$field)
    };
    ($binder:expr, $slot:ident) => {
        $binder.bind_symbol(stringify!($slot), &mut $slot)
    };
}

/// Loads one shared library and binds its exported functions
///
/// The binder is in one of two states: unloaded (initial) or loaded after
/// a successful [`load`](Self::load). There is no unload; the handle is
/// closed exactly once when the binder is dropped, so owners embed a binder
/// and get teardown on every exit path for free.
///
/// ```no_run
/// use std::ffi::c_int;
/// use dylib_binder::{register_symbol, BinderError, DynamicLibraryBinder};
///
/// #[allow(non_snake_case)]
/// struct Decoder {
///     binder: DynamicLibraryBinder,
///     Init: Option<extern "C" fn() -> c_int>,
/// }
///
/// impl Decoder {
///     fn start(&mut self) -> Result<c_int, BinderError> {
///         self.binder.load("/addons/mylib.so")?;
///         unsafe { register_symbol!(self.binder, self.Init)? };
///         Ok(self.Init.map(|init| init()).unwrap_or(-1))
///     }
/// }
/// ```
pub struct DynamicLibraryBinder<L: NativeLoader = DefaultLoader> {
    loader: L,
    staging: Box<dyn StagingPolicy>,
    handle: Option<L::Handle>,
    path: Option<PathBuf>,
}

#[cfg(feature = "system-loader")]
impl DynamicLibraryBinder<SystemLoader> {
    /// Binder over the OS loader with the platform's default staging
    pub fn new() -> Self {
        Self::with_loader(SystemLoader::new())
            .with_staging(crate::staging::policy_from_config(None))
    }
}

#[cfg(feature = "system-loader")]
impl Default for DynamicLibraryBinder<SystemLoader> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: NativeLoader> DynamicLibraryBinder<L> {
    /// Binder over `loader`, loading paths unchanged
    pub fn with_loader(loader: L) -> Self {
        Self {
            loader,
            staging: Box::new(DirectLoad),
            handle: None,
            path: None,
        }
    }

    /// Replace the staging policy
    pub fn with_staging(mut self, staging: Box<dyn StagingPolicy>) -> Self {
        self.staging = staging;
        self
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    /// Path actually opened, after staging
    pub fn library_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Stage and open the library at `path` with lazy binding
    ///
    /// Fails with [`BinderError::AlreadyLoaded`] if a library is already
    /// held; the held handle is left as it is.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), BinderError> {
        let path = path.as_ref();

        if self.handle.is_some() {
            let current = self.path.clone().unwrap_or_default();
            error!("Unable to load {}: {} already loaded", path.display(), current.display());
            return Err(BinderError::AlreadyLoaded { path: current });
        }

        let staged = self.staging.stage(path)?;
        if staged != path {
            debug!("Staged {} as {} ({})", path.display(), staged.display(), self.staging.name());
        }

        match self.loader.open(&staged, true) {
            Ok(handle) => {
                info!("Loaded library {}", staged.display());
                self.handle = Some(handle);
                self.path = Some(staged);
                Ok(())
            }
            Err(e) => {
                error!("Unable to load {}", e);
                Err(BinderError::load_failed(staged, e.0))
            }
        }
    }

    /// Resolve `name` and store it in `slot`
    ///
    /// The slot is written only on success; on failure it keeps whatever
    /// it held before. Repeated calls re-resolve each time.
    ///
    /// # Safety
    /// `T` must be a pointer-sized type (normally an `extern "C" fn`) whose
    /// signature matches the exported symbol. Nothing checks this beyond
    /// the size.
    pub unsafe fn bind_symbol<T: Copy>(&self, name: &str, slot: &mut Option<T>) -> Result<(), BinderError> {
        let symbol = unsafe { self.symbol::<T>(name)? };
        *slot = Some(symbol);
        Ok(())
    }

    /// Resolve `name` as a `T`
    ///
    /// # Safety
    /// Same contract as [`bind_symbol`](Self::bind_symbol).
    pub unsafe fn symbol<T: Copy>(&self, name: &str) -> Result<T, BinderError> {
        let Some(handle) = self.handle.as_ref() else {
            error!("Unable to assign function {}: no library loaded", name);
            return Err(BinderError::symbol_not_found(name, "no library loaded"));
        };

        if mem::size_of::<T>() != mem::size_of::<*mut c_void>() {
            error!("Unable to assign function {}: slot is not pointer-sized", name);
            return Err(BinderError::IncompatibleSlot { name: name.to_string(), size: mem::size_of::<T>() });
        }

        let address = self.loader.resolve(handle, name).map_err(|e| {
            error!("Unable to assign function {}", e);
            BinderError::symbol_not_found(name, e.0)
        })?;

        debug!("Bound {} at {:p}", name, address);

        // size checked above
        Ok(unsafe { mem::transmute_copy::<*mut c_void, T>(&address) })
    }
}

impl<L: NativeLoader> Drop for DynamicLibraryBinder<L> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let path = self.path.take().unwrap_or_default();
            match self.loader.close(handle) {
                Ok(()) => debug!("Closed library {}", path.display()),
                Err(e) => warn!("Failed to close library {}: {}", path.display(), e),
            }
        }
    }
}
