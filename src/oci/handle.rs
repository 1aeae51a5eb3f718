//! OCI handles.

use crate::{Result, Error};
use super::*;
use super::attr::{self, AttrGet, AttrSet};
use libc::c_void;
use std::ptr;

pub(crate) trait HandleType {
    fn get_type() -> u32;
}

macro_rules! impl_handle_type {
    ($($oci_handle:ident => $id:ident),+) => {
        $(
            impl HandleType for $oci_handle {
                fn get_type() -> u32 { $id }
            }
        )+
    };
}

impl_handle_type!{
    OCIEnv      => OCI_HTYPE_ENV,
    OCIError    => OCI_HTYPE_ERROR,
    OCISvcCtx   => OCI_HTYPE_SVCCTX,
    OCIStmt     => OCI_HTYPE_STMT,
    OCIServer   => OCI_HTYPE_SERVER,
    OCISession  => OCI_HTYPE_SESSION
}

/// Owned OCI handle. The handle is freed when this value is dropped.
pub(crate) struct Handle<T: HandleType> (Ptr<T>);

impl<T: HandleType> Drop for Handle<T> {
    fn drop(&mut self) {
        let ptr = self.0.take();
        if !ptr.is_null() {
            unsafe {
                OCIHandleFree(ptr as *mut c_void, T::get_type());
            }
        }
    }
}

impl<T: HandleType> Handle<T> {
    /// Allocates a new handle of type `T` in the specified environment.
    pub(crate) fn new(env: *mut OCIEnv) -> Result<Self> {
        let mut handle = ptr::null_mut::<c_void>();
        let res = unsafe {
            OCIHandleAlloc(env as *const c_void, &mut handle, T::get_type(), 0, ptr::null())
        };
        if res != OCI_SUCCESS {
            return Err( Error::env(env, res) );
        }
        if handle.is_null() {
            Err( Error::msg(format!("OCI returned NULL for handle {}", T::get_type())) )
        } else {
            Ok( Self(Ptr::new(handle as *mut T)) )
        }
    }

    // Some handles (like OCIEnv) are allocated by their respective OCI*Create* APIs.
    // But we need to dispose of them (as handles) when it is time to drop them.
    pub(crate) fn from(handle_ptr: *mut T) -> Self {
        Self(Ptr::new(handle_ptr))
    }

    pub(crate) fn get(&self) -> *mut T {
        self.0.get()
    }

    pub(crate) fn get_attr<V: AttrGet>(&self, attr_type: u32, err: *mut OCIError) -> Result<V> {
        attr::get(attr_type, T::get_type(), self.0.get() as *const c_void, err)
    }

    pub(crate) fn set_attr<V: AttrSet>(&self, attr_type: u32, attr_val: V, err: *mut OCIError) -> Result<()> {
        attr::set(attr_type, attr_val, T::get_type(), self.0.get() as *mut c_void, err)
    }
}

unsafe impl<T: HandleType> Send for Handle<T> {}
unsafe impl<T: HandleType> Sync for Handle<T> {}
