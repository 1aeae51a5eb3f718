//! CLOB, NCLOB, BLOB and BFILE variables. Each element holds a LOB locator.

use super::VariableType;
use crate::{Error, ExternalLobVar, Result, Value, lob, oci::*, var::VarBuffer};
use libc::c_void;
use std::ptr;

fn descriptor_type(vtype: VariableType) -> u32 {
    if vtype == VariableType::BFile { OCI_DTYPE_FILE } else { OCI_DTYPE_LOB }
}

pub(crate) fn initialize(var: &mut VarBuffer) -> Result<()> {
    let env = var.env.env_ptr();
    let dtype = descriptor_type(var.vtype);
    for slot in var.ptrs_mut()?.iter_mut() {
        let res = unsafe {
            OCIDescriptorAlloc(env as *const c_void, slot, dtype, 0, ptr::null())
        };
        if res != OCI_SUCCESS {
            return Err( Error::env(env, res).at("DescriptorAlloc") );
        }
    }
    Ok(())
}

pub(crate) fn finalize(var: &mut VarBuffer) {
    let dtype = descriptor_type(var.vtype);
    if let Ok(slots) = var.ptrs_mut() {
        for slot in slots.iter_mut() {
            let loc = std::mem::replace(slot, ptr::null_mut());
            if !loc.is_null() {
                unsafe {
                    OCIDescriptorFree(loc, dtype);
                }
            }
        }
    }
}

/// Frees the temporary LOBs that the locators hold before they are refilled.
pub(crate) fn pre_fetch(var: &mut VarBuffer) -> Result<()> {
    let locators = var.ptrs()?.to_vec();
    for loc in locators.into_iter().filter(|loc| !loc.is_null()) {
        let loc = loc as *mut OCILobLocator;
        if lob::is_temporary(&var.env, loc)? {
            var.conn.with_session(|svc, env| lob::free_temporary(svc, env, loc))?;
        }
    }
    Ok(())
}

pub(crate) fn set_value(var: &mut VarBuffer, pos: usize, value: &Value) -> Result<()> {
    let loc = var.ptrs()?[pos] as *mut OCILobLocator;
    let written = match value {
        Value::Bytes(data) => lob::write_temporary(var, loc, data)?,
        Value::Str(text) => lob::write_temporary(var, loc, text.as_bytes())?,
        Value::Lob(other) => {
            let data = other.read_all()?;
            lob::write_temporary(var, loc, &data)?
        }
        _ => return Err( value.conversion_error(var.vtype.name()) ),
    };
    tracing::trace!(vtype = var.vtype.name(), pos, written, "wrote temporary LOB");
    Ok(())
}

pub(crate) fn get_value(var: &VarBuffer, pos: usize) -> Result<Value> {
    Ok( Value::Lob(ExternalLobVar::new(var.this.clone(), pos, var.internal_fetch_num, var.vtype)) )
}
