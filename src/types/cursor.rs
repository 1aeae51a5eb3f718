//! REF CURSOR variables. Every element holds a child cursor whose statement
//! handle OCI fills when the variable is bound or fetched into.

use crate::{Cursor, Error, RefCursor, Result, Value, err::msg, var::VarBuffer};
use libc::c_void;

fn new_child(var: &VarBuffer) -> Result<(RefCursor, *mut c_void)> {
    let cursor = RefCursor::from(Cursor::new_owned(&var.conn)?);
    let handle = cursor.lock().handle_ptr() as *mut c_void;
    Ok((cursor, handle))
}

pub(crate) fn initialize(var: &mut VarBuffer) -> Result<()> {
    let mut cursors = Vec::with_capacity(var.allocated_elements as usize);
    let mut handles = Vec::with_capacity(var.allocated_elements as usize);
    for _ in 0..var.allocated_elements {
        let (cursor, handle) = new_child(var)?;
        cursors.push(cursor);
        handles.push(handle);
    }
    var.ptrs_mut()?.copy_from_slice(&handles);
    var.cursors = cursors;
    Ok(())
}

pub(crate) fn finalize(var: &mut VarBuffer) {
    var.cursors.clear();
}

/// Gives every element whose cursor was handed out a fresh child cursor.
pub(crate) fn pre_fetch(var: &mut VarBuffer) -> Result<()> {
    for pos in 0..var.cursors.len() {
        if var.cursors[pos].is_shared() {
            let (cursor, handle) = new_child(var)?;
            var.ptrs_mut()?[pos] = handle;
            var.cursors[pos] = cursor;
        }
    }
    Ok(())
}

pub(crate) fn get_value(var: &VarBuffer, pos: usize) -> Result<Value> {
    let cursor = var.cursors.get(pos).cloned().ok_or_else(|| Error::new(msg::ARRAY_SIZE_EXCEEDED))?;
    cursor.lock().reset_statement_type();
    Ok( Value::Cursor(cursor) )
}

pub(crate) fn set_value(var: &mut VarBuffer, pos: usize, value: &Value) -> Result<()> {
    let cursor = match value {
        Value::Cursor(cursor) => cursor.clone(),
        other => return Err( other.conversion_error("cursor") ),
    };
    if pos >= var.cursors.len() {
        return Err( Error::new(msg::ARRAY_SIZE_EXCEEDED) );
    }
    let handle = {
        let mut child = cursor.lock();
        child.make_owned()?;
        child.reset_statement_type();
        child.handle_ptr() as *mut c_void
    };
    var.ptrs_mut()?[pos] = handle;
    var.cursors[pos] = cursor;
    Ok(())
}
