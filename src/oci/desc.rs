//! OCI descriptors

use crate::{Result, Error};
use super::*;
use super::attr::{self, AttrGet, AttrSet};
use libc::c_void;
use std::ptr;

pub(crate) trait DescriptorType {
    fn get_type() -> u32;
}

macro_rules! impl_descr_type {
    ($($oci_desc:ident => $id:ident),+) => {
        $(
            impl DescriptorType for $oci_desc {
                fn get_type() -> u32 { $id }
            }
        )+
    };
}

impl_descr_type!{
    OCIParam            => OCI_DTYPE_PARAM,
    OCIAQEnqOptions     => OCI_DTYPE_AQENQ_OPTIONS,
    OCIAQDeqOptions     => OCI_DTYPE_AQDEQ_OPTIONS,
    OCIAQMsgProperties  => OCI_DTYPE_AQMSG_PROPERTIES
}

/// Owned OCI descriptor. The descriptor is freed when this value is dropped.
pub(crate) struct Descriptor<T: DescriptorType> {
    ptr: Ptr<T>,
}

impl<T: DescriptorType> Drop for Descriptor<T> {
    fn drop(&mut self) {
        let ptr = self.ptr.take();
        if !ptr.is_null() {
            unsafe {
                OCIDescriptorFree(ptr as *mut c_void, T::get_type());
            }
        }
    }
}

impl<T: DescriptorType> Descriptor<T> {
    pub(crate) fn new(env: *mut OCIEnv) -> Result<Self> {
        let mut desc = ptr::null_mut::<c_void>();
        let res = unsafe {
            OCIDescriptorAlloc(env as *const c_void, &mut desc, T::get_type(), 0, ptr::null())
        };
        if res != OCI_SUCCESS {
            return Err( Error::env(env, res) );
        }
        let desc = attr::check_not_null(desc, "descriptor")?;
        Ok( Self { ptr: Ptr::new(desc as *mut T) } )
    }

    /// Takes ownership of a descriptor that OCI allocated, such as a parameter
    /// returned by `OCIParamGet`.
    pub(crate) fn from(desc: *mut T) -> Self {
        Self { ptr: Ptr::new(desc) }
    }

    pub(crate) fn get(&self) -> *mut T {
        self.ptr.get()
    }

    pub(crate) fn get_attr<V: AttrGet>(&self, attr_type: u32, err: *mut OCIError) -> Result<V> {
        attr::get(attr_type, T::get_type(), self.ptr.get() as *const c_void, err)
    }

    pub(crate) fn set_attr<V: AttrSet>(&self, attr_type: u32, attr_val: V, err: *mut OCIError) -> Result<()> {
        attr::set(attr_type, attr_val, T::get_type(), self.ptr.get() as *mut c_void, err)
    }
}

unsafe impl<T: DescriptorType> Send for Descriptor<T> {}
unsafe impl<T: DescriptorType> Sync for Descriptor<T> {}
