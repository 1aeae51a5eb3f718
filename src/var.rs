//! Variables: typed buffers that statements bind to or define into

use crate::{
    Connection, Environment, Error, Result, RefCursor, Value, FromSql, ToSql,
    err::msg, oci::{self, *}, types::{StorageKind, VariableType},
};
use libc::c_void;
use parking_lot::{Mutex, MutexGuard};
use std::{fmt, ptr, sync::{Arc, Weak}};

/// Element storage of a variable.
pub(crate) enum Storage {
    Bytes(Vec<u8>),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    Ptrs(Vec<*mut c_void>),
}

impl Storage {
    fn new(kind: StorageKind, elements: usize, buffer_size: usize) -> Self {
        match kind {
            StorageKind::Bytes  => Storage::Bytes(vec![0; elements * buffer_size]),
            StorageKind::Ints   => Storage::Ints(vec![0; elements]),
            StorageKind::Floats => Storage::Floats(vec![0.0; elements]),
            StorageKind::Ptrs   => Storage::Ptrs(vec![ptr::null_mut(); elements]),
        }
    }

    fn as_mut_ptr(&mut self) -> *mut c_void {
        match self {
            Storage::Bytes(data)  => data.as_mut_ptr() as _,
            Storage::Ints(data)   => data.as_mut_ptr() as _,
            Storage::Floats(data) => data.as_mut_ptr() as _,
            Storage::Ptrs(data)   => data.as_mut_ptr() as _,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BindTarget {
    Unbound,
    Pos(u32),
    Name(String),
}

/// Content of one element, detached from its variable.
struct Element {
    indicator: i16,
    actual_length: Option<u16>,
    return_code: Option<u16>,
    data: ElementData,
}

enum ElementData {
    Bytes(Vec<u8>),
    Int(i64),
    Float(f64),
}

/// Buffers of a variable. Shared by the [`Variable`] handles and the LOB views.
pub(crate) struct VarBuffer {
    pub(crate) vtype: VariableType,
    pub(crate) env: Arc<Environment>,
    pub(crate) conn: Connection,
    pub(crate) allocated_elements: u32,
    pub(crate) actual_elements: u32,
    pub(crate) size: u32,
    pub(crate) buffer_size: u32,
    pub(crate) is_array: bool,
    pub(crate) indicator: Vec<i16>,
    pub(crate) actual_length: Vec<u16>,
    pub(crate) return_code: Vec<u16>,
    pub(crate) data: Storage,
    /// child cursors of a REF CURSOR variable, one per element
    pub(crate) cursors: Vec<RefCursor>,
    pub(crate) internal_fetch_num: u64,
    pub(crate) this: Weak<Mutex<VarBuffer>>,
    bind: Ptr<OCIBind>,
    define: Ptr<OCIDefine>,
    bound_stmt: Ptr<OCIStmt>,
    target: BindTarget,
}

// Raw pointers in the buffer are owned by the variable (descriptors) or
// are handles that OCI allows to be used from any thread.
unsafe impl Send for VarBuffer {}

impl Drop for VarBuffer {
    fn drop(&mut self) {
        let vtype = self.vtype;
        vtype.finalize(self);
    }
}

fn round_even(size: u32) -> u32 {
    size.saturating_add(size % 2)
}

impl VarBuffer {
    fn new(conn: &Connection, num_elements: u32, vtype: VariableType, size: u32) -> Result<Self> {
        let env = conn.env().clone();
        let allocated_elements = num_elements.max(1);
        let size = vtype.element_size(size);
        let buffer_size = round_even(vtype.buffer_size(size, env.max_bytes_per_character()));
        let data_length = allocated_elements as u64 * buffer_size as u64;
        if data_length > i32::MAX as u64 {
            return Err( Error::new(msg::ARRAY_TOO_LARGE) );
        }
        let elements = allocated_elements as usize;
        let data = Storage::new(vtype.storage_kind(), elements, buffer_size as usize);
        let actual_length = if vtype.has_lengths() { vec![0; elements] } else { Vec::new() };
        let return_code = if vtype.has_lengths() || vtype.is_variable_length() { vec![0; elements] } else { Vec::new() };

        let mut var = Self {
            vtype, env,
            conn: conn.clone(),
            allocated_elements,
            actual_elements: 0,
            size, buffer_size,
            is_array: false,
            indicator: vec![OCI_IND_NULL; elements],
            actual_length, return_code, data,
            cursors: Vec::new(),
            internal_fetch_num: 0,
            this: Weak::new(),
            bind: Ptr::null(),
            define: Ptr::null(),
            bound_stmt: Ptr::null(),
            target: BindTarget::Unbound,
        };
        vtype.initialize(&mut var)?;
        tracing::trace!(vtype = vtype.name(), allocated_elements, size, buffer_size, "new variable");
        Ok(var)
    }

    fn check_pos(&self, pos: u32) -> Result<usize> {
        if pos >= self.allocated_elements {
            Err( Error::new(msg::ARRAY_SIZE_EXCEEDED) )
        } else {
            Ok( pos as usize )
        }
    }

    fn storage_mismatch(&self) -> Error {
        Error::msg(format!("unexpected storage for a {} variable", self.vtype))
    }

    /// Bytes of the element at `pos`.
    pub(crate) fn element(&self, pos: usize) -> Result<&[u8]> {
        let size = self.buffer_size as usize;
        match &self.data {
            Storage::Bytes(data) => Ok( &data[pos * size .. (pos + 1) * size] ),
            _ => Err( self.storage_mismatch() ),
        }
    }

    pub(crate) fn element_mut(&mut self, pos: usize) -> Result<&mut [u8]> {
        let size = self.buffer_size as usize;
        match &mut self.data {
            Storage::Bytes(data) => Ok( &mut data[pos * size .. (pos + 1) * size] ),
            _ => Err( Error::msg(format!("unexpected storage for a {} variable", self.vtype)) ),
        }
    }

    pub(crate) fn ints_mut(&mut self) -> Result<&mut [i64]> {
        match &mut self.data {
            Storage::Ints(data) => Ok( data ),
            _ => Err( Error::msg(format!("unexpected storage for a {} variable", self.vtype)) ),
        }
    }

    pub(crate) fn floats_mut(&mut self) -> Result<&mut [f64]> {
        match &mut self.data {
            Storage::Floats(data) => Ok( data ),
            _ => Err( Error::msg(format!("unexpected storage for a {} variable", self.vtype)) ),
        }
    }

    pub(crate) fn ptrs(&self) -> Result<&[*mut c_void]> {
        match &self.data {
            Storage::Ptrs(data) => Ok( data ),
            _ => Err( self.storage_mismatch() ),
        }
    }

    pub(crate) fn ptrs_mut(&mut self) -> Result<&mut [*mut c_void]> {
        match &mut self.data {
            Storage::Ptrs(data) => Ok( data ),
            _ => Err( Error::msg(format!("unexpected storage for a {} variable", self.vtype)) ),
        }
    }

    /**
    Grows the element buffers to hold elements of the given size, keeping the
    current content. A bound variable is rebound to the new buffer.
    */
    pub(crate) fn resize(&mut self, size: u32) -> Result<()> {
        let buffer_size = round_even(self.vtype.buffer_size(size, self.env.max_bytes_per_character()));
        if buffer_size <= self.buffer_size {
            return Ok(());
        }
        let elements = self.allocated_elements as usize;
        if elements as u64 * buffer_size as u64 > i32::MAX as u64 {
            return Err( Error::new(msg::ARRAY_TOO_LARGE) );
        }
        if let Storage::Bytes(data) = &mut self.data {
            let old_size = self.buffer_size as usize;
            let new_size = buffer_size as usize;
            let mut resized = vec![0u8; elements * new_size];
            for (src, dst) in data.chunks(old_size).zip(resized.chunks_mut(new_size)) {
                dst[..old_size].copy_from_slice(src);
            }
            *data = resized;
        }
        tracing::trace!(vtype = self.vtype.name(), from = self.buffer_size, to = buffer_size, "resized variable");
        self.size = size;
        self.buffer_size = buffer_size;
        if self.target != BindTarget::Unbound {
            self.internal_bind()?;
        }
        Ok(())
    }

    /**
    Binds the variable to a placeholder of the statement, by name when `name`
    is given and by position otherwise. Binding again the same way is a no-op.
    */
    pub(crate) fn bind(&mut self, stmt: *mut OCIStmt, name: Option<&str>, pos: u32) -> Result<()> {
        let target = match name {
            Some(name) => BindTarget::Name(name.to_string()),
            None => BindTarget::Pos(pos),
        };
        if !self.bind.is_null() && self.bound_stmt.get() == stmt && self.target == target {
            return Ok(());
        }
        self.bound_stmt = Ptr::new(stmt);
        self.target = target;
        self.internal_bind()
    }

    fn internal_bind(&mut self) -> Result<()> {
        let err = self.env.err_ptr();
        let stmt = self.bound_stmt.get();
        let (max_elements, cur_elements) = if self.is_array {
            (self.allocated_elements, &mut self.actual_elements as *mut u32)
        } else {
            (0, ptr::null_mut())
        };
        let alenp = if self.actual_length.is_empty() { ptr::null_mut() } else { self.actual_length.as_mut_ptr() };
        let rcodep = if self.return_code.is_empty() { ptr::null_mut() } else { self.return_code.as_mut_ptr() };
        let indp = self.indicator.as_mut_ptr() as *mut c_void;
        let valuep = self.data.as_mut_ptr();
        let value_sz = self.buffer_size as i32;
        let dty = self.vtype.oracle_type();
        let bindpp = self.bind.as_mut_ptr();

        let res = match &self.target {
            BindTarget::Name(name) => {
                let placeholder = if name.starts_with(':') { name.clone() } else { format!(":{}", name) };
                tracing::trace!(vtype = self.vtype.name(), placeholder = placeholder.as_str(), "OCIBindByName");
                unsafe {
                    OCIBindByName(
                        stmt, bindpp, err, placeholder.as_ptr(), placeholder.len() as i32,
                        valuep, value_sz, dty, indp, alenp, rcodep,
                        max_elements, cur_elements, OCI_DEFAULT
                    )
                }
            }
            BindTarget::Pos(pos) => {
                tracing::trace!(vtype = self.vtype.name(), pos, "OCIBindByPos");
                unsafe {
                    OCIBindByPos(
                        stmt, bindpp, err, *pos,
                        valuep, value_sz, dty, indp, alenp, rcodep,
                        max_elements, cur_elements, OCI_DEFAULT
                    )
                }
            }
            BindTarget::Unbound => return Ok(()),
        };
        self.env.check_status(res, "Bind")?;

        let bind = self.bind.get() as *mut c_void;
        let form = self.vtype.charset_form();
        if form != SQLCS_IMPLICIT {
            oci::attr::set(OCI_ATTR_CHARSET_FORM, form, OCI_HTYPE_BIND, bind, err)?;
        }
        if matches!(self.vtype, VariableType::String | VariableType::FixedChar) && self.size > self.vtype.default_size() {
            let max_size = self.vtype.default_size();
            oci::attr::set(OCI_ATTR_MAXDATA_SIZE, max_size, OCI_HTYPE_BIND, bind, err)?;
        }
        Ok(())
    }

    /// Defines the variable as the receiver of the select-list item at `position`.
    pub(crate) fn define(&mut self, stmt: *mut OCIStmt, position: u32) -> Result<()> {
        let err = self.env.err_ptr();
        let alenp = if self.actual_length.is_empty() { ptr::null_mut() } else { self.actual_length.as_mut_ptr() };
        let rcodep = if self.return_code.is_empty() { ptr::null_mut() } else { self.return_code.as_mut_ptr() };
        let indp = self.indicator.as_mut_ptr() as *mut c_void;
        let valuep = self.data.as_mut_ptr();
        let res = unsafe {
            OCIDefineByPos(
                stmt, self.define.as_mut_ptr(), err, position,
                valuep, self.buffer_size as i32, self.vtype.oracle_type(),
                indp, alenp, rcodep, OCI_DEFAULT
            )
        };
        self.env.check_status(res, "Define")?;
        let vtype = self.vtype;
        let define = self.define.get();
        vtype.post_define(self, define)
    }

    /// Checks that no truncation or other problem happened when the element was fetched.
    pub(crate) fn verify_fetch(&self, pos: usize) -> Result<()> {
        if self.vtype.is_variable_length() {
            let code = self.return_code[pos];
            if code != 0 {
                return Err( Error::Oracle {
                    code: code as i32,
                    message: format!("column at array pos {} fetched with error: {}", pos, code),
                    site: String::from("VerifyFetch"),
                    offset: 0,
                } );
            }
        }
        Ok(())
    }

    pub(crate) fn get_single_value(&self, pos: u32) -> Result<Value> {
        let pos = self.check_pos(pos)?;
        if self.vtype.is_null(self, pos) {
            return Ok(Value::Null);
        }
        self.verify_fetch(pos)?;
        self.vtype.get_value(self, pos)
    }

    fn get_array_value(&self, num_elements: u32) -> Result<Value> {
        let mut items = Vec::with_capacity(num_elements as usize);
        for pos in 0..num_elements {
            items.push(self.get_single_value(pos)?);
        }
        Ok( Value::Array(items) )
    }

    /// Returns the element at `pos`, or all the elements of an array variable.
    pub(crate) fn get_value(&self, pos: u32) -> Result<Value> {
        if self.is_array {
            self.get_array_value(self.actual_elements.min(self.allocated_elements))
        } else {
            self.get_single_value(pos)
        }
    }

    pub(crate) fn set_single_value(&mut self, pos: u32, value: &Value) -> Result<()> {
        let pos = self.check_pos(pos)?;
        if value.is_null() {
            self.indicator[pos] = OCI_IND_NULL;
            return Ok(());
        }
        self.indicator[pos] = OCI_IND_NOTNULL;
        if !self.return_code.is_empty() {
            self.return_code[pos] = 0;
        }
        let vtype = self.vtype;
        vtype.set_value(self, pos, value)
    }

    fn set_array_value(&mut self, items: &[Value]) -> Result<()> {
        if items.len() > self.allocated_elements as usize {
            return Err( Error::new(msg::ARRAY_SIZE_EXCEEDED) );
        }
        self.actual_elements = items.len() as u32;
        for (pos, item) in items.iter().enumerate() {
            self.set_single_value(pos as u32, item)?;
        }
        Ok(())
    }

    pub(crate) fn set_value(&mut self, pos: u32, value: &Value) -> Result<()> {
        if self.is_array {
            if pos > 0 {
                return Err( Error::new(msg::NO_NESTED_ARRAYS) );
            }
            match value {
                Value::Array(items) => self.set_array_value(items),
                Value::Null => self.set_array_value(&[]),
                other => Err( other.conversion_error("array") ),
            }
        } else {
            self.set_single_value(pos, value)
        }
    }

    fn copy_out(&self, pos: u32) -> Result<Element> {
        if !self.vtype.can_be_copied() {
            return Err( Error::new(msg::NO_COPY) );
        }
        let pos = self.check_pos(pos)?;
        if self.indicator[pos] != OCI_IND_NULL {
            self.verify_fetch(pos)?;
        }
        let data = match &self.data {
            Storage::Bytes(_)    => ElementData::Bytes(self.element(pos)?.to_vec()),
            Storage::Ints(data)  => ElementData::Int(data[pos]),
            Storage::Floats(data) => ElementData::Float(data[pos]),
            Storage::Ptrs(_)     => return Err( Error::new(msg::NO_COPY) ),
        };
        Ok( Element {
            indicator: self.indicator[pos],
            actual_length: self.actual_length.get(pos).copied(),
            return_code: self.return_code.get(pos).copied(),
            data,
        } )
    }

    fn copy_in(&mut self, pos: u32, element: Element) -> Result<()> {
        let pos = self.check_pos(pos)?;
        match (&element.data, self.vtype.storage_kind()) {
            (ElementData::Bytes(bytes), StorageKind::Bytes) => {
                if bytes.len() > self.buffer_size as usize {
                    return Err( Error::new(msg::INSUFFICIENT_SPACE) );
                }
                self.element_mut(pos)?[..bytes.len()].copy_from_slice(bytes);
            }
            (ElementData::Int(val), StorageKind::Ints) => self.ints_mut()?[pos] = *val,
            (ElementData::Float(val), StorageKind::Floats) => self.floats_mut()?[pos] = *val,
            _ => return Err( Error::new(msg::NO_COPY) ),
        }
        self.indicator[pos] = element.indicator;
        if let (Some(len), Some(slot)) = (element.actual_length, self.actual_length.get_mut(pos)) {
            *slot = len;
        }
        if let (Some(code), Some(slot)) = (element.return_code, self.return_code.get_mut(pos)) {
            *slot = code;
        }
        Ok(())
    }
}

/**
A typed bind or define buffer with one or more elements.

Variables are created by a cursor (see [`Cursor::new_var`](crate::Cursor::new_var))
and can be passed to statements as arguments. A `Variable` is a handle: clones
share the same buffers.
*/
#[derive(Clone)]
pub struct Variable {
    inner: Arc<Mutex<VarBuffer>>,
}

impl Variable {
    pub(crate) fn new(conn: &Connection, num_elements: u32, vtype: VariableType, size: u32) -> Result<Self> {
        let buf = VarBuffer::new(conn, num_elements, vtype, size)?;
        Ok( Self::wrap(buf) )
    }

    /// Creates a variable that is bound as a PL/SQL index-by table.
    pub(crate) fn new_array(conn: &Connection, num_elements: u32, vtype: VariableType, size: u32) -> Result<Self> {
        if !vtype.can_be_in_array() {
            return Err( Error::new(msg::NO_ARRAYS) );
        }
        let mut buf = VarBuffer::new(conn, num_elements, vtype, size)?;
        buf.is_array = true;
        Ok( Self::wrap(buf) )
    }

    fn wrap(buf: VarBuffer) -> Self {
        let mut buf = buf;
        let inner = Arc::new_cyclic(move |this| {
            buf.this = this.clone();
            Mutex::new(buf)
        });
        Self { inner }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, VarBuffer> {
        self.inner.lock()
    }

    pub(crate) fn same_as(&self, other: &Variable) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn var_type(&self) -> VariableType {
        self.inner.lock().vtype
    }

    pub fn allocated_elements(&self) -> u32 {
        self.inner.lock().allocated_elements
    }

    /// Number of elements in use by an array variable.
    pub fn actual_elements(&self) -> u32 {
        self.inner.lock().actual_elements
    }

    /// Element size, in characters for character data and bytes otherwise.
    pub fn size(&self) -> u32 {
        self.inner.lock().size
    }

    /// Size of the buffer of a single element in bytes.
    pub fn buffer_size(&self) -> u32 {
        self.inner.lock().buffer_size
    }

    pub fn is_array(&self) -> bool {
        self.inner.lock().is_array
    }

    /**
    Returns the value of the element at `pos`. Array variables return all
    their elements as a [`Value::Array`].
    */
    pub fn get_value(&self, pos: u32) -> Result<Value> {
        self.inner.lock().get_value(pos)
    }

    /// Returns the element at `pos` converted into `T`.
    pub fn get<T: FromSql>(&self, pos: u32) -> Result<T> {
        let value = self.get_value(pos)?;
        T::from_sql(value)
    }

    /// Sets the element at `pos`. Array variables take a [`Value::Array`] at position 0.
    pub fn set_value(&self, pos: u32, value: &Value) -> Result<()> {
        self.inner.lock().set_value(pos, value)
    }

    pub fn set<T: ToSql + ?Sized>(&self, pos: u32, value: &T) -> Result<()> {
        self.set_value(pos, &value.to_sql())
    }

    /**
    Copies the element at `source_pos` of `source` into the element at
    `target_pos` of this variable.
    */
    pub fn copy_from(&self, source: &Variable, source_pos: u32, target_pos: u32) -> Result<()> {
        let element = source.inner.lock().copy_out(source_pos)?;
        self.inner.lock().copy_in(target_pos, element)
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let var = self.inner.lock();
        f.debug_struct("Variable")
            .field("type", &var.vtype)
            .field("allocated_elements", &var.allocated_elements)
            .field("size", &var.size)
            .field("is_array", &var.is_array)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding() {
        assert_eq!(round_even(0), 0);
        assert_eq!(round_even(7), 8);
        assert_eq!(round_even(8), 8);
        assert_eq!(round_even(u32::MAX), u32::MAX);
    }

    #[test]
    fn storage_kinds() {
        match Storage::new(StorageKind::Bytes, 3, 4) {
            Storage::Bytes(data) => assert_eq!(data.len(), 12),
            _ => panic!("expected bytes"),
        }
        match Storage::new(StorageKind::Ints, 3, 8) {
            Storage::Ints(data) => assert_eq!(data.len(), 3),
            _ => panic!("expected ints"),
        }
        match Storage::new(StorageKind::Ptrs, 2, 8) {
            Storage::Ptrs(data) => assert!(data.iter().all(|p| p.is_null())),
            _ => panic!("expected pointers"),
        }
    }
}
