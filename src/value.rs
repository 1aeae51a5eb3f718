//! Host values exchanged with bind and fetch variables

use crate::{Error, Result, ExternalLobVar, RefCursor, Variable, VariableType};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::{convert::TryFrom, fmt};

/// A value read from, or written to, a variable slot.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float(f64),
    /// Decimal number in its text form. Used for numbers that do not fit
    /// native integers and for the "number as string" conversion.
    Number(String),
    Str(String),
    Bytes(Vec<u8>),
    /// Local wall clock time (Oracle DATE has no time zone)
    DateTime(NaiveDateTime),
    /// INTERVAL DAY TO SECOND, with microsecond precision
    Interval(Duration),
    Lob(ExternalLobVar),
    Cursor(RefCursor),
    /// PL/SQL index-by table. Elements must all be of the same kind.
    Array(Vec<Value>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Int32(a), Value::Int64(b)) | (Value::Int64(b), Value::Int32(a)) => *a as i64 == *b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Interval(a), Value::Interval(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the value kind, used in conversion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null        => "null",
            Value::Bool(_)     => "bool",
            Value::Int32(_)    => "int32",
            Value::Int64(_)    => "int64",
            Value::Float(_)    => "float",
            Value::Number(_)   => "number",
            Value::Str(_)      => "string",
            Value::Bytes(_)    => "bytes",
            Value::DateTime(_) => "date-time",
            Value::Interval(_) => "interval",
            Value::Lob(_)      => "LOB",
            Value::Cursor(_)   => "cursor",
            Value::Array(_)    => "array",
        }
    }

    /// Builds an array value from a sequence of bindable values.
    pub fn array<T: ToSql>(items: &[T]) -> Value {
        Value::Array(items.iter().map(ToSql::to_sql).collect())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Number(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn conversion_error(&self, target: &str) -> Error {
        Error::msg(format!("cannot convert {} into {}", self.kind(), target))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null        => f.write_str("NULL"),
            Value::Bool(v)     => write!(f, "{}", v),
            Value::Int32(v)    => write!(f, "{}", v),
            Value::Int64(v)    => write!(f, "{}", v),
            Value::Float(v)    => write!(f, "{}", v),
            Value::Number(v)   => f.write_str(v),
            Value::Str(v)      => f.write_str(v),
            Value::Bytes(v)    => write!(f, "{:02X?}", v),
            Value::DateTime(v) => write!(f, "{}", v),
            Value::Interval(v) => write!(f, "{}", v),
            Value::Lob(_)      => f.write_str("<LOB>"),
            Value::Cursor(_)   => f.write_str("<cursor>"),
            Value::Array(v)    => {
                f.write_str("[")?;
                for (i, item) in v.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Rust values that can be bound as statement arguments.
pub trait ToSql {
    fn to_sql(&self) -> Value;

    /// Variable type that NULLs of this Rust type are bound with.
    fn sql_type() -> Option<VariableType> where Self: Sized { None }

    /// Variable type to use when this value is NULL.
    fn null_type(&self) -> Option<VariableType> { None }
}

/// Rust values that can be created from fetched or returned values.
/// NULL becomes the zero value, except for `Option`, where it is `None`.
pub trait FromSql : Sized {
    fn from_sql(value: Value) -> Result<Self>;
}

/// Output arguments: bound IN/OUT with their current value and updated
/// with the value the statement returned.
pub trait ToSqlOut {
    fn out_value(&self) -> Value;
    fn out_null_type(&self) -> Option<VariableType>;
    fn set_from_sql(&mut self, value: Value) -> Result<()>;
}

impl<T: ToSql + FromSql> ToSqlOut for T {
    fn out_value(&self) -> Value {
        self.to_sql()
    }

    fn out_null_type(&self) -> Option<VariableType> {
        self.null_type()
    }

    fn set_from_sql(&mut self, value: Value) -> Result<()> {
        *self = T::from_sql(value)?;
        Ok(())
    }
}

/// A statement argument.
pub enum Arg<'a> {
    /// Input value
    In(&'a dyn ToSql),
    /// Output (IN/OUT) value, written back after execution
    Out(&'a mut dyn ToSqlOut),
    /// Existing variable, bound as is
    Var(Variable),
    /// New variable of the given type and element size, initialized with the value
    Typed(VariableType, u32, Value),
}

impl<'a, T: ToSql> From<&'a T> for Arg<'a> {
    fn from(val: &'a T) -> Self {
        Arg::In(val)
    }
}

impl<'a> From<Variable> for Arg<'a> {
    fn from(var: Variable) -> Self {
        Arg::Var(var)
    }
}

impl Arg<'_> {
    pub(crate) fn is_bool(&self) -> bool {
        match self {
            Arg::In(val) => matches!(val.to_sql(), Value::Bool(_)),
            Arg::Out(val) => matches!(val.out_value(), Value::Bool(_)) || val.out_null_type() == Some(VariableType::Boolean),
            Arg::Var(var) => var.var_type() == VariableType::Boolean,
            Arg::Typed(vtype, _, _) => *vtype == VariableType::Boolean,
        }
    }
}

impl fmt::Debug for Arg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::In(val) => write!(f, "In({:?})", val.to_sql()),
            Arg::Out(val) => write!(f, "Out({:?})", val.out_value()),
            Arg::Var(var) => write!(f, "Var({:?})", var.var_type()),
            Arg::Typed(vtype, size, val) => write!(f, "Typed({:?}, {}, {:?})", vtype, size, val),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> Value {
        self.clone()
    }
}

impl FromSql for Value {
    fn from_sql(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl<T: ToSql> ToSql for Option<T> {
    fn to_sql(&self) -> Value {
        match self {
            Some(val) => val.to_sql(),
            None => Value::Null,
        }
    }

    fn sql_type() -> Option<VariableType> {
        T::sql_type()
    }

    fn null_type(&self) -> Option<VariableType> {
        match self {
            Some(val) => val.null_type(),
            None => T::sql_type(),
        }
    }
}

impl<T: FromSql> FromSql for Option<T> {
    fn from_sql(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            value => T::from_sql(value).map(Some),
        }
    }
}

impl<T: ToSql + ?Sized> ToSql for &T {
    fn to_sql(&self) -> Value {
        (**self).to_sql()
    }

    fn null_type(&self) -> Option<VariableType> {
        (**self).null_type()
    }
}

macro_rules! impl_small_int {
    ($($t:ty),+) => {
        $(
            impl ToSql for $t {
                fn to_sql(&self) -> Value {
                    Value::Int32(*self as i32)
                }
                fn sql_type() -> Option<VariableType> {
                    Some(VariableType::Int32)
                }
            }
        )+
    };
}

impl_small_int!{ i8, i16, i32, u8, u16 }

macro_rules! impl_big_int {
    ($($t:ty),+) => {
        $(
            impl ToSql for $t {
                fn to_sql(&self) -> Value {
                    match i64::try_from(*self) {
                        Ok(val) => Value::Int64(val),
                        Err(_)  => Value::Number(self.to_string()),
                    }
                }
                fn sql_type() -> Option<VariableType> {
                    Some(VariableType::Int64)
                }
            }
        )+
    };
}

impl_big_int!{ u32, i64, u64, isize, usize }

/// Integer view of a value, used by all integer conversions.
fn value_to_i64(value: Value, target: &str) -> Result<i64> {
    match value {
        Value::Null         => Ok(0),
        Value::Bool(val)    => Ok(val as i64),
        Value::Int32(val)   => Ok(val as i64),
        Value::Int64(val)   => Ok(val),
        Value::Float(val) if val.fract() == 0.0 && val >= i64::MIN as f64 && val <= i64::MAX as f64 => Ok(val as i64),
        Value::Number(ref text) | Value::Str(ref text) => {
            let text = text.trim();
            text.parse::<i64>()
                .or_else(|_| match text.parse::<f64>() {
                    Ok(val) if val.fract() == 0.0 && val >= i64::MIN as f64 && val <= i64::MAX as f64 => Ok(val as i64),
                    _ => Err(()),
                })
                .map_err(|_| value.conversion_error(target))
        }
        value => Err(value.conversion_error(target)),
    }
}

macro_rules! impl_from_sql_int {
    ($($t:ty),+) => {
        $(
            impl FromSql for $t {
                fn from_sql(value: Value) -> Result<Self> {
                    let val = value_to_i64(value, stringify!($t))?;
                    <$t>::try_from(val).map_err(|_| Error::msg(format!("{} does not fit into {}", val, stringify!($t))))
                }
            }
        )+
    };
}

impl_from_sql_int!{ i8, i16, i32, i64, u8, u16, u32, isize, usize }

impl FromSql for u64 {
    fn from_sql(value: Value) -> Result<Self> {
        if let Value::Number(ref text) = value {
            if let Ok(val) = text.trim().parse::<u64>() {
                return Ok(val);
            }
        }
        let val = value_to_i64(value, "u64")?;
        u64::try_from(val).map_err(|_| Error::msg(format!("{} does not fit into u64", val)))
    }
}

impl ToSql for f64 {
    fn to_sql(&self) -> Value {
        Value::Float(*self)
    }
    fn sql_type() -> Option<VariableType> {
        Some(VariableType::Float)
    }
}

impl ToSql for f32 {
    fn to_sql(&self) -> Value {
        Value::Float(*self as f64)
    }
    fn sql_type() -> Option<VariableType> {
        Some(VariableType::Float)
    }
}

impl FromSql for f64 {
    fn from_sql(value: Value) -> Result<Self> {
        match value {
            Value::Null       => Ok(0.0),
            Value::Bool(val)  => Ok(if val { 1.0 } else { 0.0 }),
            Value::Int32(val) => Ok(val as f64),
            Value::Int64(val) => Ok(val as f64),
            Value::Float(val) => Ok(val),
            Value::Number(ref text) | Value::Str(ref text) => {
                text.trim().parse::<f64>().map_err(|_| value.conversion_error("f64"))
            }
            value => Err(value.conversion_error("f64")),
        }
    }
}

impl FromSql for f32 {
    fn from_sql(value: Value) -> Result<Self> {
        f64::from_sql(value).map(|val| val as f32)
    }
}

impl ToSql for bool {
    fn to_sql(&self) -> Value {
        Value::Bool(*self)
    }
    fn sql_type() -> Option<VariableType> {
        Some(VariableType::Boolean)
    }
}

impl FromSql for bool {
    fn from_sql(value: Value) -> Result<Self> {
        match value {
            Value::Bool(val) => Ok(val),
            Value::Float(val) => Ok(val != 0.0),
            value => value_to_i64(value, "bool").map(|val| val != 0),
        }
    }
}

impl ToSql for str {
    fn to_sql(&self) -> Value {
        Value::Str(self.to_string())
    }
}

impl ToSql for String {
    fn to_sql(&self) -> Value {
        Value::Str(self.clone())
    }
    fn sql_type() -> Option<VariableType> {
        Some(VariableType::String)
    }
}

impl FromSql for String {
    fn from_sql(value: Value) -> Result<Self> {
        match value {
            Value::Null         => Ok(String::new()),
            Value::Str(val)     => Ok(val),
            Value::Number(val)  => Ok(val),
            Value::Bool(val)    => Ok(val.to_string()),
            Value::Int32(val)   => Ok(val.to_string()),
            Value::Int64(val)   => Ok(val.to_string()),
            Value::Float(val)   => Ok(val.to_string()),
            Value::DateTime(val) => Ok(val.to_string()),
            Value::Bytes(val)   => String::from_utf8(val).map_err(|_| Error::new("binary data is not valid UTF-8")),
            Value::Lob(lob)     => {
                let data = lob.read_all()?;
                String::from_utf8(data).map_err(|_| Error::new("LOB data is not valid UTF-8"))
            }
            value => Err(value.conversion_error("String")),
        }
    }
}

impl ToSql for [u8] {
    fn to_sql(&self) -> Value {
        Value::Bytes(self.to_vec())
    }
}

impl ToSql for Vec<u8> {
    fn to_sql(&self) -> Value {
        Value::Bytes(self.clone())
    }
    fn sql_type() -> Option<VariableType> {
        Some(VariableType::Binary)
    }
}

impl FromSql for Vec<u8> {
    fn from_sql(value: Value) -> Result<Self> {
        match value {
            Value::Null       => Ok(Vec::new()),
            Value::Bytes(val) => Ok(val),
            Value::Str(val)   => Ok(val.into_bytes()),
            Value::Lob(lob)   => lob.read_all(),
            value => Err(value.conversion_error("Vec<u8>")),
        }
    }
}

impl ToSql for NaiveDateTime {
    fn to_sql(&self) -> Value {
        Value::DateTime(*self)
    }
    fn sql_type() -> Option<VariableType> {
        Some(VariableType::DateTime)
    }
}

impl FromSql for NaiveDateTime {
    fn from_sql(value: Value) -> Result<Self> {
        match value {
            Value::Null => NaiveDate::from_ymd_opt(1, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .ok_or_else(|| Error::new("cannot build the zero date")),
            Value::DateTime(val) => Ok(val),
            value => Err(value.conversion_error("NaiveDateTime")),
        }
    }
}

impl ToSql for NaiveDate {
    fn to_sql(&self) -> Value {
        match self.and_hms_opt(0, 0, 0) {
            Some(val) => Value::DateTime(val),
            None => Value::Null,
        }
    }
    fn sql_type() -> Option<VariableType> {
        Some(VariableType::DateTime)
    }
}

impl ToSql for Duration {
    fn to_sql(&self) -> Value {
        Value::Interval(*self)
    }
    fn sql_type() -> Option<VariableType> {
        Some(VariableType::Interval)
    }
}

impl FromSql for Duration {
    fn from_sql(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Duration::zero()),
            Value::Interval(val) => Ok(val),
            value => Err(value.conversion_error("Duration")),
        }
    }
}

impl ToSql for ExternalLobVar {
    fn to_sql(&self) -> Value {
        Value::Lob(self.clone())
    }
}

impl FromSql for ExternalLobVar {
    fn from_sql(value: Value) -> Result<Self> {
        match value {
            Value::Lob(lob) => Ok(lob),
            value => Err(value.conversion_error("LOB")),
        }
    }
}

impl ToSql for RefCursor {
    fn to_sql(&self) -> Value {
        Value::Cursor(self.clone())
    }
    fn sql_type() -> Option<VariableType> {
        Some(VariableType::Cursor)
    }
}

impl FromSql for RefCursor {
    fn from_sql(value: Value) -> Result<Self> {
        match value {
            Value::Cursor(cursor) => Ok(cursor),
            value => Err(value.conversion_error("cursor")),
        }
    }
}

macro_rules! impl_array {
    ($($t:ty),+) => {
        $(
            impl ToSql for Vec<$t> {
                fn to_sql(&self) -> Value {
                    Value::array(self)
                }
            }

            impl FromSql for Vec<$t> {
                fn from_sql(value: Value) -> Result<Self> {
                    match value {
                        Value::Null => Ok(Vec::new()),
                        Value::Array(items) => items.into_iter().map(<$t>::from_sql).collect(),
                        value => Err(value.conversion_error("array")),
                    }
                }
            }
        )+
    };
}

impl_array!{ i32, i64, f64, String }

impl ToSql for Vec<&str> {
    fn to_sql(&self) -> Value {
        Value::array(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers() {
        assert_eq!(42i32.to_sql(), Value::Int32(42));
        assert_eq!(42u8.to_sql(), Value::Int32(42));
        assert_eq!(42i64.to_sql(), Value::Int64(42));
        assert_eq!(u64::MAX.to_sql(), Value::Number("18446744073709551615".into()));
        assert_eq!(i64::from_sql(Value::Int32(-7)).unwrap(), -7);
        assert_eq!(i64::from_sql(Value::Float(3.0)).unwrap(), 3);
        assert!(i64::from_sql(Value::Float(3.5)).is_err());
        assert_eq!(i64::from_sql(Value::Number("1234".into())).unwrap(), 1234);
        assert_eq!(i32::from_sql(Value::Null).unwrap(), 0);
        assert!(i8::from_sql(Value::Int64(1000)).is_err());
        assert_eq!(u64::from_sql(Value::Number("18446744073709551615".into())).unwrap(), u64::MAX);
        assert!(i64::from_sql(Value::Str("abc".into())).is_err());
    }

    #[test]
    fn floats_and_bools() {
        assert_eq!(1.5f64.to_sql(), Value::Float(1.5));
        assert_eq!(f64::from_sql(Value::Number("3.25".into())).unwrap(), 3.25);
        assert_eq!(f64::from_sql(Value::Int64(2)).unwrap(), 2.0);
        assert_eq!(true.to_sql(), Value::Bool(true));
        assert!(bool::from_sql(Value::Int64(1)).unwrap());
        assert!(!bool::from_sql(Value::Null).unwrap());
        assert!(bool::from_sql(Value::Float(2.0)).unwrap());
    }

    #[test]
    fn strings_and_bytes() {
        assert_eq!("abc".to_sql(), Value::Str("abc".into()));
        assert_eq!(String::from_sql(Value::Null).unwrap(), "");
        assert_eq!(String::from_sql(Value::Number("1.5".into())).unwrap(), "1.5");
        assert_eq!(String::from_sql(Value::Int64(10)).unwrap(), "10");
        assert_eq!(vec![1u8, 2, 3].to_sql(), Value::Bytes(vec![1, 2, 3]));
        assert_eq!(Vec::<u8>::from_sql(Value::Str("ab".into())).unwrap(), b"ab".to_vec());
        assert!(String::from_sql(Value::Bytes(vec![0xff, 0xfe])).is_err());
    }

    #[test]
    fn options() {
        let none : Option<i64> = None;
        assert_eq!(none.to_sql(), Value::Null);
        assert_eq!(none.null_type(), Some(VariableType::Int64));
        assert_eq!(Some(5i64).to_sql(), Value::Int64(5));
        assert_eq!(Option::<i64>::from_sql(Value::Null).unwrap(), None);
        assert_eq!(Option::<String>::from_sql(Value::Str("x".into())).unwrap(), Some("x".to_string()));
        assert_eq!(Value::Null.null_type(), None);
    }

    #[test]
    fn dates_and_intervals() {
        let date = NaiveDate::from_ymd_opt(2013, 11, 30).unwrap();
        let dt = date.and_hms_opt(12, 34, 56).unwrap();
        assert_eq!(dt.to_sql(), Value::DateTime(dt));
        assert_eq!(date.to_sql(), Value::DateTime(date.and_hms_opt(0, 0, 0).unwrap()));
        assert_eq!(NaiveDateTime::from_sql(Value::DateTime(dt)).unwrap(), dt);
        let d = Duration::days(3) + Duration::seconds(5);
        assert_eq!(Duration::from_sql(d.to_sql()).unwrap(), d);
        assert!(Duration::from_sql(Value::Int32(1)).is_err());
    }

    #[test]
    fn arrays() {
        let arr = vec![1i32, 2, 3].to_sql();
        assert_eq!(arr, Value::Array(vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)]));
        assert_eq!(Vec::<i64>::from_sql(arr).unwrap(), vec![1, 2, 3]);
        assert_eq!(vec!["a", "b"].to_sql(), Value::Array(vec![Value::Str("a".into()), Value::Str("b".into())]));
        assert_eq!(Vec::<String>::from_sql(Value::Null).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn out_args() {
        let mut n = 0i64;
        {
            let out : &mut dyn ToSqlOut = &mut n;
            assert_eq!(out.out_value(), Value::Int64(0));
            out.set_from_sql(Value::Int64(9)).unwrap();
        }
        assert_eq!(n, 9);
        let mut s = Some(String::from("x"));
        s.set_from_sql(Value::Null).unwrap();
        assert_eq!(s, None);
    }

    #[test]
    fn display_and_equality() {
        assert_eq!(Value::Int32(5), Value::Int64(5));
        assert_ne!(Value::Str("5".into()), Value::Int64(5));
        assert_eq!(Value::Array(vec![Value::Int32(1), Value::Null]).to_string(), "[1, NULL]");
        assert_eq!(Value::Number("1.50".into()).to_string(), "1.50");
        assert_eq!(Value::Null.kind(), "null");
    }

    #[test]
    fn bool_args_are_detected() {
        let flag = true;
        let n = 1;
        assert!(Arg::from(&flag).is_bool());
        assert!(!Arg::from(&n).is_bool());
        assert!(Arg::Typed(VariableType::Boolean, 0, Value::Null).is_bool());
    }
}
