//! Send-able pointers to OCI handles and descriptors

use std::ptr;

/// Send-able cell-like wrapper around a pointer to OCI handle or descriptor.
#[repr(transparent)]
pub(crate) struct Ptr<T> {
    value: *mut T
}

impl<T> Ptr<T> {
    pub(crate) fn new(ptr: *mut T) -> Self {
        Self{ value: ptr }
    }

    pub(crate) fn null() -> Self {
        Self{ value: ptr::null_mut() }
    }

    pub(crate) fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub(crate) fn get(&self) -> *mut T {
        self.value
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut *mut T {
        &mut self.value as *mut *mut T
    }

    /// Returns the current pointer and leaves NULL in its place.
    pub(crate) fn take(&mut self) -> *mut T {
        std::mem::replace(&mut self.value, ptr::null_mut())
    }
}

impl<T> Clone for Ptr<T> {
    fn clone(&self) -> Self {
        Self { value: self.value }
    }
}

impl<T> Copy for Ptr<T> {}

impl<T> std::fmt::Debug for Ptr<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:p}", self.value)
    }
}

unsafe impl<T> Send for Ptr<T> {}
unsafe impl<T> Sync for Ptr<T> {}
