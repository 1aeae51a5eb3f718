//! Runtime binding to the Oracle client shared library.

use libc::{c_char, c_void};
use std::{ffi::CString, ptr};

#[cfg(target_os = "linux")]
#[link(name = "dl")]
extern "C" {}

/// Environment variable that names the client library explicitly.
pub(crate) const OCI_LIB_VAR : &str = "OCI_LIB";

#[cfg(target_os = "macos")]
const LIB_NAMES : [&str; 2] = ["libclntsh.dylib", "libclntsh.so"];
#[cfg(not(target_os = "macos"))]
const LIB_NAMES : [&str; 1] = ["libclntsh.so"];

pub(crate) struct LibHandle {
    handle: *mut c_void,
}

unsafe impl Send for LibHandle {}
unsafe impl Sync for LibHandle {}

impl LibHandle {
    fn candidates() -> Vec<CString> {
        let mut names = Vec::with_capacity(LIB_NAMES.len() + 1);
        if let Some(path) = std::env::var_os(OCI_LIB_VAR) {
            if let Some(path) = path.to_str() {
                if let Ok(path) = CString::new(path) {
                    names.push(path);
                }
            }
        }
        for name in LIB_NAMES.iter() {
            if let Ok(name) = CString::new(*name) {
                names.push(name);
            }
        }
        names
    }

    #[cfg(unix)]
    pub(crate) fn open() -> Option<Self> {
        let mut handle = ptr::null_mut();
        for name in Self::candidates() {
            handle = unsafe { libc::dlopen(name.as_ptr(), libc::RTLD_NOW | libc::RTLD_GLOBAL) };
            if !handle.is_null() {
                tracing::debug!(library = ?name, "loaded Oracle client library");
                break;
            }
            tracing::trace!(library = ?name, "Oracle client library is not available");
        }
        if handle.is_null() {
            None
        } else {
            Some(Self { handle })
        }
    }

    #[cfg(not(unix))]
    pub(crate) fn open() -> Option<Self> {
        let _ = Self::candidates();
        None
    }

    #[cfg(unix)]
    pub(crate) unsafe fn symbol<T: Copy>(&self, name: &'static [u8]) -> Option<T> {
        let sym = libc::dlsym(self.handle, name.as_ptr() as *const c_char);
        if sym.is_null() {
            None
        } else {
            debug_assert_eq!(std::mem::size_of::<T>(), std::mem::size_of::<*mut c_void>());
            Some(std::mem::transmute_copy(&sym))
        }
    }

    #[cfg(not(unix))]
    pub(crate) unsafe fn symbol<T: Copy>(&self, _name: &'static [u8]) -> Option<T> {
        None
    }
}

/// Declares the OCI entry points that are resolved from the client library.
///
/// Every entry generates a field of the function table and a same-named `unsafe fn`
/// that forwards to it. When the library has not been loaded the wrapper returns
/// the fallback value (`OCI_INVALID_HANDLE` for status returning functions).
macro_rules! oci_api {
    ( $( fn $name:ident ( $( $arg:ident : $t:ty ),* $(,)? ) -> $ret:ty = $fallback:expr ; )+ ) => {
        #[allow(non_snake_case)]
        pub(crate) struct Api {
            $( $name: unsafe extern "C" fn( $( $t ),* ) -> $ret, )+
            _lib: LibHandle,
        }

        impl Api {
            unsafe fn load(lib: LibHandle) -> std::result::Result<Self, &'static str> {
                Ok(Self {
                    $( $name: lib.symbol(concat!(stringify!($name), "\0").as_bytes()).ok_or(stringify!($name))?, )+
                    _lib: lib,
                })
            }
        }

        $(
            #[allow(non_snake_case, clippy::too_many_arguments)]
            pub(crate) unsafe fn $name( $( $arg: $t ),* ) -> $ret {
                match API.get() {
                    Some(Ok(api)) => (api.$name)( $( $arg ),* ),
                    _ => $fallback,
                }
            }
        )+
    };
}
