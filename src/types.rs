//! Variable types: the registry of the supported Oracle data types and the
//! hooks that move data between variable buffers and host values.

pub(crate) mod number;
pub(crate) mod varchar;
pub(crate) mod long;
pub(crate) mod date;
pub(crate) mod interval;
pub(crate) mod lob;
pub(crate) mod cursor;

use crate::{Error, Result, Value, env::{MAX_STRING_CHARS, MAX_BINARY_BYTES}, oci::*, var::VarBuffer};
use std::{fmt, mem};

/// Kind of storage a variable of a given type keeps its elements in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StorageKind {
    /// `buffer_size` bytes per element
    Bytes,
    /// one `i64` per element (SQLT_INT)
    Ints,
    /// one `f64` per element (SQLT_BDOUBLE)
    Floats,
    /// one descriptor or handle pointer per element
    Ptrs,
}

/// Static description of a variable type.
pub(crate) struct TypeInfo {
    pub(crate) name: &'static str,
    pub(crate) oracle_type: u16,
    pub(crate) charset_form: u8,
    /// default element size
    pub(crate) size: u32,
    pub(crate) is_char_data: bool,
    pub(crate) is_variable_length: bool,
    pub(crate) can_be_copied: bool,
    pub(crate) can_be_in_array: bool,
}

const PTR_SIZE : u32 = mem::size_of::<*mut libc::c_void>() as u32;
const NUMBER_SIZE : u32 = mem::size_of::<OCINumber>() as u32;
const DATE_SIZE : u32 = mem::size_of::<OCIDate>() as u32;
const LONG_SIZE : u32 = 128 * 1024;

macro_rules! type_info {
    ($name:literal, $oracle_type:ident, $form:ident, $size:expr, char: $c:literal, var: $v:literal, copy: $cp:literal, array: $a:literal) => {
        TypeInfo {
            name: $name,
            oracle_type: $oracle_type,
            charset_form: $form,
            size: $size,
            is_char_data: $c,
            is_variable_length: $v,
            can_be_copied: $cp,
            can_be_in_array: $a,
        }
    };
}

static STRING          : TypeInfo = type_info!("String",         SQLT_CHR,         SQLCS_IMPLICIT, MAX_STRING_CHARS, char: true,  var: true,  copy: true,  array: true);
static FIXED_CHAR      : TypeInfo = type_info!("FixedChar",      SQLT_AFC,         SQLCS_IMPLICIT, 2000,             char: true,  var: true,  copy: true,  array: true);
static ROWID           : TypeInfo = type_info!("Rowid",          SQLT_CHR,         SQLCS_IMPLICIT, 18,               char: true,  var: false, copy: true,  array: true);
static BINARY          : TypeInfo = type_info!("Binary",         SQLT_BIN,         SQLCS_IMPLICIT, MAX_BINARY_BYTES, char: false, var: true,  copy: true,  array: true);
static LONG_STRING     : TypeInfo = type_info!("LongString",     SQLT_LVC,         SQLCS_IMPLICIT, LONG_SIZE,        char: true,  var: true,  copy: true,  array: false);
static LONG_BINARY     : TypeInfo = type_info!("LongBinary",     SQLT_LVB,         SQLCS_IMPLICIT, LONG_SIZE,        char: false, var: true,  copy: true,  array: false);
static FLOAT           : TypeInfo = type_info!("Float",          SQLT_VNU,         SQLCS_IMPLICIT, NUMBER_SIZE,      char: false, var: false, copy: true,  array: true);
static NATIVE_FLOAT    : TypeInfo = type_info!("NativeFloat",    SQLT_BDOUBLE,     SQLCS_IMPLICIT, 8,                char: false, var: false, copy: true,  array: true);
static INT32           : TypeInfo = type_info!("Int32",          SQLT_INT,         SQLCS_IMPLICIT, 8,                char: false, var: false, copy: true,  array: true);
static INT64           : TypeInfo = type_info!("Int64",          SQLT_INT,         SQLCS_IMPLICIT, 8,                char: false, var: false, copy: true,  array: true);
static LONG_INTEGER    : TypeInfo = type_info!("LongInteger",    SQLT_VNU,         SQLCS_IMPLICIT, NUMBER_SIZE,      char: false, var: false, copy: true,  array: true);
static NUMBER_AS_STRING: TypeInfo = type_info!("NumberAsString", SQLT_VNU,         SQLCS_IMPLICIT, NUMBER_SIZE,      char: false, var: false, copy: true,  array: true);
static BOOLEAN         : TypeInfo = type_info!("Boolean",        SQLT_INT,         SQLCS_IMPLICIT, 8,                char: false, var: false, copy: true,  array: true);
static DATE_TIME       : TypeInfo = type_info!("DateTime",       SQLT_ODT,         SQLCS_IMPLICIT, DATE_SIZE,        char: false, var: false, copy: true,  array: true);
static INTERVAL        : TypeInfo = type_info!("Interval",       SQLT_INTERVAL_DS, SQLCS_IMPLICIT, PTR_SIZE,         char: false, var: false, copy: false, array: true);
static CLOB            : TypeInfo = type_info!("Clob",           SQLT_CLOB,        SQLCS_IMPLICIT, PTR_SIZE,         char: true,  var: false, copy: false, array: false);
static NCLOB           : TypeInfo = type_info!("NClob",          SQLT_CLOB,        SQLCS_NCHAR,    PTR_SIZE,         char: true,  var: false, copy: false, array: false);
static BLOB            : TypeInfo = type_info!("Blob",           SQLT_BLOB,        SQLCS_IMPLICIT, PTR_SIZE,         char: false, var: false, copy: false, array: false);
static BFILE           : TypeInfo = type_info!("BFile",          SQLT_BFILE,       SQLCS_IMPLICIT, PTR_SIZE,         char: false, var: false, copy: false, array: false);
static CURSOR          : TypeInfo = type_info!("Cursor",         SQLT_RSET,        SQLCS_IMPLICIT, PTR_SIZE,         char: false, var: false, copy: false, array: false);

/// Data types a [`Variable`](crate::Variable) can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableType {
    String,
    FixedChar,
    Rowid,
    Binary,
    LongString,
    LongBinary,
    /// NUMBER exchanged as `f64`
    Float,
    /// BINARY_DOUBLE and BINARY_FLOAT
    NativeFloat,
    Int32,
    Int64,
    /// Integer NUMBER wider than 18 digits, exchanged as text
    LongInteger,
    /// NUMBER exchanged as text
    NumberAsString,
    Boolean,
    DateTime,
    Interval,
    Clob,
    NClob,
    Blob,
    BFile,
    Cursor,
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl VariableType {
    pub(crate) fn info(self) -> &'static TypeInfo {
        match self {
            VariableType::String         => &STRING,
            VariableType::FixedChar      => &FIXED_CHAR,
            VariableType::Rowid          => &ROWID,
            VariableType::Binary         => &BINARY,
            VariableType::LongString     => &LONG_STRING,
            VariableType::LongBinary     => &LONG_BINARY,
            VariableType::Float          => &FLOAT,
            VariableType::NativeFloat    => &NATIVE_FLOAT,
            VariableType::Int32          => &INT32,
            VariableType::Int64          => &INT64,
            VariableType::LongInteger    => &LONG_INTEGER,
            VariableType::NumberAsString => &NUMBER_AS_STRING,
            VariableType::Boolean        => &BOOLEAN,
            VariableType::DateTime       => &DATE_TIME,
            VariableType::Interval       => &INTERVAL,
            VariableType::Clob           => &CLOB,
            VariableType::NClob          => &NCLOB,
            VariableType::Blob           => &BLOB,
            VariableType::BFile          => &BFILE,
            VariableType::Cursor         => &CURSOR,
        }
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Oracle external (SQLT) data type code
    pub fn oracle_type(self) -> u16 {
        self.info().oracle_type
    }

    pub(crate) fn charset_form(self) -> u8 {
        self.info().charset_form
    }

    /// Default element size
    pub fn default_size(self) -> u32 {
        self.info().size
    }

    pub fn is_char_data(self) -> bool {
        self.info().is_char_data
    }

    pub fn is_variable_length(self) -> bool {
        self.info().is_variable_length
    }

    pub fn can_be_copied(self) -> bool {
        self.info().can_be_copied
    }

    pub fn can_be_in_array(self) -> bool {
        self.info().can_be_in_array
    }

    pub fn is_lob(self) -> bool {
        matches!(self, VariableType::Clob | VariableType::NClob | VariableType::Blob | VariableType::BFile)
    }

    pub fn is_number(self) -> bool {
        matches!(self,
            VariableType::Float | VariableType::NativeFloat | VariableType::Int32 | VariableType::Int64 |
            VariableType::LongInteger | VariableType::NumberAsString | VariableType::Boolean
        )
    }

    pub(crate) fn is_long(self) -> bool {
        matches!(self, VariableType::LongString | VariableType::LongBinary)
    }

    /// String, fixed char, rowid and raw types keep per-element data lengths.
    pub(crate) fn has_lengths(self) -> bool {
        matches!(self, VariableType::String | VariableType::FixedChar | VariableType::Rowid | VariableType::Binary)
    }

    pub(crate) fn storage_kind(self) -> StorageKind {
        match self {
            VariableType::Int32 | VariableType::Int64 | VariableType::Boolean => StorageKind::Ints,
            VariableType::NativeFloat => StorageKind::Floats,
            VariableType::Interval | VariableType::Cursor => StorageKind::Ptrs,
            t if t.is_lob() => StorageKind::Ptrs,
            _ => StorageKind::Bytes,
        }
    }

    /// Returns the per-element buffer size for elements of the given size.
    pub(crate) fn buffer_size(self, size: u32, max_bytes_per_char: u32) -> u32 {
        match self {
            VariableType::String | VariableType::FixedChar | VariableType::Rowid => varchar::buffer_size(size, max_bytes_per_char),
            VariableType::LongString | VariableType::LongBinary => long::buffer_size(self, size, max_bytes_per_char),
            _ => size,
        }
    }

    /**
    Maps an Oracle data type code (and the charset form of character data)
    of a select-list item or a bind to the variable type that handles it.
    */
    pub(crate) fn by_oracle_type(data_type: u16, charset_form: u8) -> Result<Self> {
        let vtype = match data_type {
            SQLT_RDD => VariableType::Rowid,
            SQLT_DAT | SQLT_ODT | SQLT_DATE | SQLT_TIMESTAMP | SQLT_TIMESTAMP_TZ | SQLT_TIMESTAMP_LTZ => VariableType::DateTime,
            SQLT_INTERVAL_DS => VariableType::Interval,
            SQLT_LNG => VariableType::LongString,
            SQLT_LBI => VariableType::LongBinary,
            SQLT_RSET => VariableType::Cursor,
            SQLT_CLOB if charset_form == SQLCS_NCHAR => VariableType::NClob,
            SQLT_CLOB => VariableType::Clob,
            SQLT_BLOB => VariableType::Blob,
            SQLT_BFILE => VariableType::BFile,
            SQLT_AFC => VariableType::FixedChar,
            SQLT_CHR => VariableType::String,
            SQLT_BIN => VariableType::Binary,
            SQLT_BFLOAT | SQLT_IBFLOAT | SQLT_BDOUBLE | SQLT_IBDOUBLE => VariableType::NativeFloat,
            SQLT_NUM | SQLT_VNU => VariableType::Float,
            _ => {
                tracing::warn!(data_type, "unhandled data type");
                return Err( Error::msg(format!("unhandled data type {}", data_type)) );
            }
        };
        Ok( vtype )
    }

    /// Only character data and CLOBs have a meaningful charset form.
    pub(crate) fn has_charset_form(data_type: u16) -> bool {
        matches!(data_type, SQLT_CHR | SQLT_AFC | SQLT_CLOB)
    }

    /**
    Infers the variable type for a host value.

    Returns the type, the element size and the number of elements, which is 0
    for scalar values.
    */
    pub(crate) fn by_value(value: &Value) -> Result<(Self, u32, u32)> {
        let inferred = match value {
            Value::Null        => (VariableType::String, 1, 0),
            Value::Bool(_)     => (VariableType::Boolean, 0, 0),
            Value::Int32(_)    => (VariableType::Int32, 0, 0),
            Value::Int64(_)    => (VariableType::Int64, 0, 0),
            Value::Float(_)    => (VariableType::Float, 0, 0),
            Value::Number(_)   => (VariableType::NumberAsString, 0, 0),
            Value::DateTime(_) => (VariableType::DateTime, 0, 0),
            Value::Interval(_) => (VariableType::Interval, 0, 0),
            Value::Str(text) => {
                let len = text.len() as u32;
                if text.chars().count() as u32 > MAX_STRING_CHARS {
                    (VariableType::LongString, len, 0)
                } else {
                    (VariableType::String, len, 0)
                }
            }
            Value::Bytes(data) => {
                let len = data.len() as u32;
                if len > MAX_BINARY_BYTES {
                    (VariableType::LongBinary, len, 0)
                } else {
                    (VariableType::Binary, len, 0)
                }
            }
            Value::Lob(lob)    => (lob.var_type(), 0, 0),
            Value::Cursor(_)   => (VariableType::Cursor, 0, 0),
            Value::Array(items) => {
                let first = items.first().ok_or_else(|| Error::new(crate::err::msg::LIST_IS_EMPTY))?;
                if let Value::Array(_) = first {
                    return Err( Error::new(crate::err::msg::NO_NESTED_ARRAYS) );
                }
                let (vtype, _, _) = Self::by_value(items.iter().find(|item| !item.is_null()).unwrap_or(first))?;
                let mut size = 0;
                for item in items.iter() {
                    let (_, item_size, _) = Self::by_value(item)?;
                    size = size.max(item_size);
                }
                (vtype, size, items.len() as u32)
            }
        };
        Ok( inferred )
    }

    /// Element size to allocate for a value of this type inferred with `size`.
    pub(crate) fn element_size(self, size: u32) -> u32 {
        if self.is_variable_length() {
            size.max(2)
        } else {
            self.default_size()
        }
    }

    // ---- hooks --------------------------------------------------------------------------

    /// Extended initialization after the buffers have been allocated.
    pub(crate) fn initialize(self, var: &mut VarBuffer) -> Result<()> {
        match self {
            VariableType::Interval => interval::initialize(var),
            VariableType::Cursor => cursor::initialize(var),
            t if t.is_lob() => lob::initialize(var),
            _ => Ok(()),
        }
    }

    /// Releases resources that the initialize hook acquired.
    pub(crate) fn finalize(self, var: &mut VarBuffer) {
        match self {
            VariableType::Interval => interval::finalize(var),
            VariableType::Cursor => cursor::finalize(var),
            t if t.is_lob() => lob::finalize(var),
            _ => {}
        }
    }

    /// Called before every fetch into a define variable of this type.
    pub(crate) fn pre_fetch(self, var: &mut VarBuffer) -> Result<()> {
        match self {
            VariableType::Cursor => cursor::pre_fetch(var),
            t if t.is_lob() => lob::pre_fetch(var),
            _ => Ok(()),
        }
    }

    /// Chooses the type of a define variable from the column description.
    /// Only numbers are refined: integer columns get integer variables.
    pub(crate) fn pre_define(self, param: &Descriptor<OCIParam>, err: *mut OCIError) -> Result<Self> {
        if self != VariableType::Float {
            return Ok(self);
        }
        let scale     : i8  = param.get_attr(OCI_ATTR_SCALE, err)?;
        let precision : i16 = param.get_attr(OCI_ATTR_PRECISION, err)?;
        Ok( number::integer_type(precision, scale).unwrap_or(self) )
    }

    /// Called after the variable has been defined.
    pub(crate) fn post_define(self, var: &mut VarBuffer, define: *mut OCIDefine) -> Result<()> {
        if self.charset_form() != SQLCS_IMPLICIT {
            let form = self.charset_form();
            return crate::oci::attr::set(OCI_ATTR_CHARSET_FORM, form, OCI_HTYPE_DEFINE, define as *mut libc::c_void, var.env.err_ptr());
        }
        Ok(())
    }

    pub(crate) fn is_null(self, var: &VarBuffer, pos: usize) -> bool {
        var.indicator[pos] == OCI_IND_NULL
    }

    pub(crate) fn get_value(self, var: &VarBuffer, pos: usize) -> Result<Value> {
        match self {
            VariableType::String | VariableType::FixedChar | VariableType::Rowid | VariableType::Binary => varchar::get_value(var, pos),
            VariableType::LongString | VariableType::LongBinary => long::get_value(var, pos),
            VariableType::DateTime => date::get_value(var, pos),
            VariableType::Interval => interval::get_value(var, pos),
            VariableType::Cursor => cursor::get_value(var, pos),
            t if t.is_lob() => lob::get_value(var, pos),
            _ => number::get_value(var, pos),
        }
    }

    pub(crate) fn set_value(self, var: &mut VarBuffer, pos: usize, value: &Value) -> Result<()> {
        match self {
            VariableType::String | VariableType::FixedChar | VariableType::Rowid | VariableType::Binary => varchar::set_value(var, pos, value),
            VariableType::LongString | VariableType::LongBinary => long::set_value(var, pos, value),
            VariableType::DateTime => date::set_value(var, pos, value),
            VariableType::Interval => interval::set_value(var, pos, value),
            VariableType::Cursor => cursor::set_value(var, pos, value),
            t if t.is_lob() => lob::set_value(var, pos, value),
            _ => number::set_value(var, pos, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn oracle_types() {
        assert_eq!(VariableType::by_oracle_type(SQLT_CHR, SQLCS_IMPLICIT).unwrap(), VariableType::String);
        assert_eq!(VariableType::by_oracle_type(SQLT_AFC, SQLCS_IMPLICIT).unwrap(), VariableType::FixedChar);
        assert_eq!(VariableType::by_oracle_type(SQLT_RDD, 0).unwrap(), VariableType::Rowid);
        assert_eq!(VariableType::by_oracle_type(SQLT_NUM, 0).unwrap(), VariableType::Float);
        assert_eq!(VariableType::by_oracle_type(SQLT_IBDOUBLE, 0).unwrap(), VariableType::NativeFloat);
        assert_eq!(VariableType::by_oracle_type(SQLT_DAT, 0).unwrap(), VariableType::DateTime);
        assert_eq!(VariableType::by_oracle_type(SQLT_TIMESTAMP_TZ, 0).unwrap(), VariableType::DateTime);
        assert_eq!(VariableType::by_oracle_type(SQLT_INTERVAL_DS, 0).unwrap(), VariableType::Interval);
        assert_eq!(VariableType::by_oracle_type(SQLT_LNG, 0).unwrap(), VariableType::LongString);
        assert_eq!(VariableType::by_oracle_type(SQLT_LBI, 0).unwrap(), VariableType::LongBinary);
        assert_eq!(VariableType::by_oracle_type(SQLT_CLOB, SQLCS_IMPLICIT).unwrap(), VariableType::Clob);
        assert_eq!(VariableType::by_oracle_type(SQLT_CLOB, SQLCS_NCHAR).unwrap(), VariableType::NClob);
        assert_eq!(VariableType::by_oracle_type(SQLT_BLOB, 0).unwrap(), VariableType::Blob);
        assert_eq!(VariableType::by_oracle_type(SQLT_BFILE, 0).unwrap(), VariableType::BFile);
        assert_eq!(VariableType::by_oracle_type(SQLT_RSET, 0).unwrap(), VariableType::Cursor);
        let err = VariableType::by_oracle_type(108, 0).unwrap_err();
        assert_eq!(err.to_string(), "unhandled data type 108");
        assert!(VariableType::has_charset_form(SQLT_CLOB));
        assert!(!VariableType::has_charset_form(SQLT_BLOB));
    }

    #[test]
    fn inference_from_values() {
        assert_eq!(VariableType::by_value(&Value::Null).unwrap(), (VariableType::String, 1, 0));
        assert_eq!(VariableType::by_value(&Value::Str("abc".into())).unwrap(), (VariableType::String, 3, 0));
        let long = "x".repeat(4001);
        assert_eq!(VariableType::by_value(&Value::Str(long)).unwrap(), (VariableType::LongString, 4001, 0));
        // 4000 characters of 2 bytes each are still a plain string
        let wide = "é".repeat(4000);
        assert_eq!(VariableType::by_value(&Value::Str(wide)).unwrap().0, VariableType::String);
        assert_eq!(VariableType::by_value(&Value::Bytes(vec![0; 4000])).unwrap(), (VariableType::Binary, 4000, 0));
        assert_eq!(VariableType::by_value(&Value::Bytes(vec![0; 4001])).unwrap().0, VariableType::LongBinary);
        assert_eq!(VariableType::by_value(&Value::Bool(true)).unwrap().0, VariableType::Boolean);
        assert_eq!(VariableType::by_value(&Value::Int32(1)).unwrap().0, VariableType::Int32);
        assert_eq!(VariableType::by_value(&Value::Int64(1)).unwrap().0, VariableType::Int64);
        assert_eq!(VariableType::by_value(&Value::Float(1.5)).unwrap().0, VariableType::Float);
        assert_eq!(VariableType::by_value(&Value::Number("1".into())).unwrap().0, VariableType::NumberAsString);
        let dt = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap().and_hms_opt(3, 4, 5).unwrap();
        assert_eq!(VariableType::by_value(&Value::DateTime(dt)).unwrap().0, VariableType::DateTime);
        assert_eq!(VariableType::by_value(&Value::Interval(Duration::seconds(1))).unwrap().0, VariableType::Interval);
    }

    #[test]
    fn inference_from_arrays() {
        let arr = Value::Array(vec![Value::Str("a".into()), Value::Str("abcd".into()), Value::Null]);
        assert_eq!(VariableType::by_value(&arr).unwrap(), (VariableType::String, 4, 3));
        let arr = Value::Array(vec![Value::Null, Value::Int64(7)]);
        assert_eq!(VariableType::by_value(&arr).unwrap().0, VariableType::Int64);
        let err = VariableType::by_value(&Value::Array(vec![])).unwrap_err();
        assert_eq!(err, Error::new(crate::err::msg::LIST_IS_EMPTY));
        let nested = Value::Array(vec![Value::Array(vec![Value::Int32(1)])]);
        assert!(VariableType::by_value(&nested).is_err());
    }

    #[test]
    fn element_and_buffer_sizes() {
        assert_eq!(VariableType::String.element_size(0), 2);
        assert_eq!(VariableType::String.element_size(10), 10);
        assert_eq!(VariableType::Int64.element_size(100), 8);
        assert_eq!(VariableType::Rowid.element_size(1), 18);
        assert_eq!(VariableType::String.buffer_size(10, 4), 40);
        assert_eq!(VariableType::Binary.buffer_size(10, 4), 10);
        assert_eq!(VariableType::LongString.buffer_size(10, 4), 44);
        assert_eq!(VariableType::LongBinary.buffer_size(10, 4), 14);
        assert_eq!(VariableType::DateTime.buffer_size(DATE_SIZE, 4), DATE_SIZE);
    }

    #[test]
    fn registry_flags() {
        assert!(VariableType::String.is_variable_length());
        assert!(!VariableType::Rowid.is_variable_length());
        assert!(VariableType::Rowid.has_lengths());
        assert!(!VariableType::LongString.can_be_in_array());
        assert!(!VariableType::Blob.can_be_copied());
        assert_eq!(VariableType::NClob.charset_form(), SQLCS_NCHAR);
        assert_eq!(VariableType::Int32.storage_kind(), StorageKind::Ints);
        assert_eq!(VariableType::NativeFloat.storage_kind(), StorageKind::Floats);
        assert_eq!(VariableType::Clob.storage_kind(), StorageKind::Ptrs);
        assert_eq!(VariableType::Float.storage_kind(), StorageKind::Bytes);
        assert_eq!(VariableType::Float.default_size(), 22);
        assert_eq!(DATE_SIZE, 8);
        assert_eq!(VariableType::LongInteger.to_string(), "LongInteger");
    }
}
