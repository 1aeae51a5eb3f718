//! Typed access to OCI handle and descriptor attributes.

use crate::{Result, Error};
use super::*;
use libc::c_void;
use std::mem;

pub(crate) trait AttrGet {
    type ValueType;
    fn new(val: Self::ValueType, len: usize) -> Self;
}

pub(crate) trait AttrSet {
    fn as_ptr(&self) -> *const c_void;
    fn len(&self) -> usize { 0 }
}

pub(crate) fn get<A>(attr_type: u32, obj_type: u32, obj: *const c_void, err: *mut OCIError) -> Result<A>
where A: AttrGet
{
    let mut attr_val  = mem::MaybeUninit::<A::ValueType>::zeroed();
    let mut attr_size = 0u32;
    catch!{err =>
        OCIAttrGet(obj, obj_type, attr_val.as_mut_ptr() as *mut c_void, &mut attr_size, attr_type, err)
    }
    Ok( AttrGet::new( unsafe { attr_val.assume_init() }, attr_size as usize) )
}

pub(crate) fn set<A>(attr_type: u32, attr_val: A, obj_type: u32, obj: *mut c_void, err: *mut OCIError) -> Result<()>
where A: AttrSet
{
    catch!{err =>
        OCIAttrSet(obj, obj_type, attr_val.as_ptr(), attr_val.len() as u32, attr_type, err)
    }
    Ok(())
}

macro_rules! impl_int_attr {
    ($($t:ty),+) => {
        $(
            impl AttrGet for $t {
                type ValueType = $t;
                fn new(val: $t, _len: usize) -> Self {
                    val
                }
            }
            impl AttrSet for $t {
                fn as_ptr(&self) -> *const c_void {
                    self as *const $t as _
                }
            }
        )+
    };
}

impl_int_attr!{ u8, i8, u16, i16, u32, i32, u64 }

macro_rules! impl_oci_handle_attr {
    ($($t:ty),+) => {
        $(
            impl AttrSet for *mut $t {
                fn as_ptr(&self) -> *const c_void {
                    *self as *const $t as _
                }
            }
        )+
    };
}

impl_oci_handle_attr!{ OCIServer, OCISession }

/// Text attributes are returned as a pointer into OCI owned memory.
impl AttrGet for String {
    type ValueType = *const u8;
    fn new(ptr: *const u8, len: usize) -> Self {
        if ptr.is_null() || len == 0 {
            String::new()
        } else {
            let bytes = unsafe { std::slice::from_raw_parts(ptr, len) };
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

impl AttrSet for &str {
    fn as_ptr(&self) -> *const c_void {
        (*self).as_ptr() as _
    }
    fn len(&self) -> usize {
        (*self).len()
    }
}

impl AttrSet for &[u8] {
    fn as_ptr(&self) -> *const c_void {
        (*self).as_ptr() as _
    }
    fn len(&self) -> usize {
        (*self).len()
    }
}

/// Reads the error position that OCI reports for the last failed parse.
pub(crate) fn parse_error_offset(stmt: *mut OCIStmt, err: *mut OCIError) -> u32 {
    get::<u16>(OCI_ATTR_PARSE_ERROR_OFFSET, OCI_HTYPE_STMT, stmt as *const c_void, err)
        .map(|offset| offset as u32)
        .unwrap_or(0)
}

pub(crate) fn check_not_null<T>(ptr: *mut T, what: &str) -> Result<*mut T> {
    if ptr.is_null() {
        Err(Error::msg(format!("OCI returned NULL for {}", what)))
    } else {
        Ok(ptr)
    }
}
