/*
 *  tests/binder_integration.rs
 *
 *  Integration tests for loading and symbol binding
 *
 *  dylib-binder - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 */

use std::ffi::{c_int, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use dylib_binder::{register_symbol, BinderError, DynamicLibraryBinder, MockLoader};

extern "C" fn init() -> c_int {
    0
}

/// Plugin object embedding a binder, bound the way addons do it
#[allow(non_snake_case)]
struct AudioDecoder {
    binder: DynamicLibraryBinder<MockLoader>,
    Init: Option<extern "C" fn() -> c_int>,
    NoSuchFn: Option<extern "C" fn()>,
}

impl AudioDecoder {
    fn new(loader: MockLoader) -> Self {
        Self {
            binder: DynamicLibraryBinder::with_loader(loader),
            Init: None,
            NoSuchFn: None,
        }
    }

    fn start(&mut self) -> Result<(), BinderError> {
        self.binder.load("/addons/mylib.so")?;
        unsafe {
            register_symbol!(self.binder, self.Init)?;
            register_symbol!(self.binder, self.NoSuchFn)?;
        }
        Ok(())
    }
}

#[test]
fn test_end_to_end_scenario() {
    let loader = MockLoader::new().with_symbol("/addons/mylib.so", "Init", init as *const c_void);

    {
        let mut decoder = AudioDecoder::new(loader.clone());
        let err = decoder.start().unwrap_err();

        assert!(matches!(err, BinderError::SymbolNotFound { ref name, .. } if name == "NoSuchFn"));
        assert_eq!(decoder.Init.map(|f| f()), Some(0));
        assert!(decoder.NoSuchFn.is_none());
        assert_eq!(loader.close_count(), 0);
    }

    // early return from start() still released the handle, once
    assert_eq!(loader.open_count(), 1);
    assert_eq!(loader.close_count(), 1);
}

#[test]
fn test_handle_released_on_panic() {
    let loader = MockLoader::new().with_library("/addons/mylib.so");
    let inner = loader.clone();

    let result = panic::catch_unwind(AssertUnwindSafe(move || {
        let mut binder = DynamicLibraryBinder::with_loader(inner);
        binder.load("/addons/mylib.so").unwrap();
        if binder.is_loaded() {
            panic!("owner failed during start-up");
        }
    }));

    assert!(result.is_err());
    assert_eq!(loader.close_count(), 1);
}

#[test]
fn test_bound_address_matches_loader() {
    let loader = MockLoader::new().with_symbol("/addons/mylib.so", "Init", init as *const c_void);
    let mut binder = DynamicLibraryBinder::with_loader(loader.clone());
    binder.load("/addons/mylib.so").unwrap();

    let mut slot: Option<extern "C" fn() -> c_int> = None;
    unsafe { binder.bind_symbol("Init", &mut slot).unwrap() };

    let handle_path = Path::new("/addons/mylib.so");
    assert_eq!(binder.library_path(), Some(handle_path));
    assert_eq!(slot.map(|f| f as usize), Some(init as usize));
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
mod system {
    use super::*;
    use std::ffi::{c_char, CStr};
    use dylib_binder::SystemLoader;

    #[test]
    fn test_bind_libc_strlen() {
        let mut binder = DynamicLibraryBinder::with_loader(SystemLoader::new());
        binder.load("libc.so.6").unwrap();

        let mut strlen: Option<unsafe extern "C" fn(*const c_char) -> usize> = None;
        unsafe { binder.bind_symbol("strlen", &mut strlen).unwrap() };

        let text = CStr::from_bytes_with_nul(b"squeeze\0").unwrap();
        let len = unsafe { strlen.unwrap()(text.as_ptr()) };
        assert_eq!(len, 7);
    }

    #[test]
    fn test_missing_libc_symbol() {
        let mut binder = DynamicLibraryBinder::with_loader(SystemLoader::new());
        binder.load("libc.so.6").unwrap();

        let mut missing: Option<extern "C" fn()> = None;
        assert!(unsafe { binder.bind_symbol("dylib_binder_no_such_fn", &mut missing) }.is_err());
        assert!(missing.is_none());
    }

    #[test]
    fn test_load_nonexistent_path() {
        let mut binder = DynamicLibraryBinder::with_loader(SystemLoader::new());
        let err = binder.load("/nonexistent/libmissing.so").unwrap_err();
        assert!(matches!(err, BinderError::LoadFailed { .. }));
        assert!(!binder.is_loaded());
    }
}
