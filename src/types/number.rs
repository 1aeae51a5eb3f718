//! Numbers: NUMBER, FLOAT, BINARY_DOUBLE and the integer and boolean
//! renditions of NUMBER columns and binds.

use super::VariableType;
use crate::{
    Error, Result, Value,
    env::{Environment, NLS_NUMERIC_CHARACTERS, NUMBER_TO_STRING_FORMAT},
    oci::*, var::{Storage, VarBuffer},
};
use libc::c_void;
use std::{mem, ptr};

/// Maximum number of digits an integer variable can hold without losing precision.
const INT32_DIGITS : i16 = 10;
const INT64_DIGITS : i16 = 19;

/// Scale reported for FLOAT columns.
const FLOAT_SCALE : i8 = -127;

/**
Returns the integer type that can represent values of a NUMBER column with
the given precision and scale, or `None` when the column needs a number type.
*/
pub(crate) fn integer_type(precision: i16, scale: i8) -> Option<VariableType> {
    if precision <= 0 || (scale != 0 && scale != FLOAT_SCALE) {
        None
    } else if precision < INT32_DIGITS {
        Some(VariableType::Int32)
    } else if precision < INT64_DIGITS {
        Some(VariableType::Int64)
    } else {
        Some(VariableType::LongInteger)
    }
}

/// How a textual number is converted into an Oracle NUMBER.
#[derive(Debug, PartialEq)]
pub(crate) enum TextNumber {
    /// text and the format mask to read it with
    Masked(String, String),
    /// exponent notation, converted through a double
    Real(f64),
}

/**
Builds the format mask for a decimal number in text form. Every digit becomes
a `9` and the decimal point becomes `D`. A leading sign is accepted. A plus
sign is dropped from the text.
*/
pub(crate) fn text_number(text: &str) -> Result<TextNumber> {
    let text = text.trim();
    if text.contains(|c| c == 'e' || c == 'E') {
        return text.parse::<f64>()
            .map(TextNumber::Real)
            .map_err(|_| Error::msg(format!("invalid number: {}", text)));
    }
    let (sign, digits) = match text.as_bytes().first() {
        Some(b'-') => ("-", &text[1..]),
        Some(b'+') => ("",  &text[1..]),
        _ => ("", text),
    };
    let mut mask = String::with_capacity(digits.len());
    let mut has_digits = false;
    let mut has_point = false;
    for c in digits.chars() {
        match c {
            '0'..='9' => {
                has_digits = true;
                mask.push('9');
            }
            '.' if !has_point => {
                has_point = true;
                mask.push('D');
            }
            _ => return Err( Error::msg(format!("invalid number: {}", text)) ),
        }
    }
    if !has_digits {
        return Err( Error::msg(format!("invalid number: {}", text)) );
    }
    Ok( TextNumber::Masked(format!("{}{}", sign, digits), mask) )
}

fn from_int(env: &Environment, val: i64) -> Result<OCINumber> {
    let mut num = OCINumber::new();
    let res = unsafe {
        OCINumberFromInt(env.err_ptr(), &val as *const i64 as *const c_void, mem::size_of::<i64>() as u32, OCI_NUMBER_SIGNED, &mut num)
    };
    env.check_status(res, "NumberFromInt")?;
    Ok(num)
}

fn from_real(env: &Environment, val: f64) -> Result<OCINumber> {
    let mut num = OCINumber::new();
    let res = unsafe {
        OCINumberFromReal(env.err_ptr(), &val as *const f64 as *const c_void, mem::size_of::<f64>() as u32, &mut num)
    };
    env.check_status(res, "NumberFromReal")?;
    Ok(num)
}

fn from_text(env: &Environment, text: &str) -> Result<OCINumber> {
    match text_number(text)? {
        TextNumber::Real(val) => from_real(env, val),
        TextNumber::Masked(text, mask) => {
            let mut num = OCINumber::new();
            let res = unsafe {
                OCINumberFromText(
                    env.err_ptr(),
                    text.as_ptr(), text.len() as u32,
                    mask.as_ptr(), mask.len() as u32,
                    NLS_NUMERIC_CHARACTERS.as_ptr(), NLS_NUMERIC_CHARACTERS.len() as u32,
                    &mut num
                )
            };
            env.check_status(res, "NumberFromText")?;
            Ok(num)
        }
    }
}

fn to_real(env: &Environment, num: &OCINumber) -> Result<f64> {
    let mut val = 0f64;
    let res = unsafe {
        OCINumberToReal(env.err_ptr(), num, mem::size_of::<f64>() as u32, &mut val as *mut f64 as *mut c_void)
    };
    env.check_status(res, "NumberToReal")?;
    Ok(val)
}

fn to_text(env: &Environment, num: &OCINumber) -> Result<String> {
    let mut buf = [0u8; 200];
    let mut len = buf.len() as u32;
    let res = unsafe {
        OCINumberToText(
            env.err_ptr(), num,
            NUMBER_TO_STRING_FORMAT.as_ptr(), NUMBER_TO_STRING_FORMAT.len() as u32,
            NLS_NUMERIC_CHARACTERS.as_ptr(), NLS_NUMERIC_CHARACTERS.len() as u32,
            &mut len, buf.as_mut_ptr()
        )
    };
    env.check_status(res, "NumberToText")?;
    let text = &buf[..(len as usize).min(buf.len())];
    Ok( String::from_utf8_lossy(text).trim().to_string() )
}

fn read_number(var: &VarBuffer, pos: usize) -> Result<OCINumber> {
    let bytes = var.element(pos)?;
    Ok( unsafe { ptr::read_unaligned(bytes.as_ptr() as *const OCINumber) } )
}

fn write_number(var: &mut VarBuffer, pos: usize, num: OCINumber) -> Result<()> {
    let bytes = var.element_mut(pos)?;
    bytes[..num.bytes.len()].copy_from_slice(&num.bytes);
    Ok(())
}

fn to_integer(value: &Value, target: &str) -> Result<i64> {
    match value {
        Value::Bool(val)  => Ok(*val as i64),
        Value::Int32(val) => Ok(*val as i64),
        Value::Int64(val) => Ok(*val),
        Value::Float(val) if val.fract() == 0.0 && *val >= i64::MIN as f64 && *val <= i64::MAX as f64 => Ok(*val as i64),
        Value::Number(text) | Value::Str(text) => text.trim().parse().map_err(|_| value.conversion_error(target)),
        _ => Err( value.conversion_error(target) ),
    }
}

fn to_float(value: &Value, target: &str) -> Result<f64> {
    match value {
        Value::Bool(val)  => Ok(*val as i64 as f64),
        Value::Int32(val) => Ok(*val as f64),
        Value::Int64(val) => Ok(*val as f64),
        Value::Float(val) => Ok(*val),
        Value::Number(text) | Value::Str(text) => text.trim().parse().map_err(|_| value.conversion_error(target)),
        _ => Err( value.conversion_error(target) ),
    }
}

pub(crate) fn set_value(var: &mut VarBuffer, pos: usize, value: &Value) -> Result<()> {
    let vtype = var.vtype;
    match vtype {
        VariableType::Int32 | VariableType::Int64 | VariableType::Boolean => {
            let val = to_integer(value, vtype.name())?;
            var.ints_mut()?[pos] = val;
            Ok(())
        }
        VariableType::NativeFloat => {
            let val = to_float(value, vtype.name())?;
            var.floats_mut()?[pos] = val;
            Ok(())
        }
        _ => {
            let num = match value {
                Value::Bool(val)  => from_int(&var.env, *val as i64)?,
                Value::Int32(val) => from_int(&var.env, *val as i64)?,
                Value::Int64(val) => from_int(&var.env, *val)?,
                Value::Float(val) => from_real(&var.env, *val)?,
                Value::Number(text) | Value::Str(text) => from_text(&var.env, text)?,
                _ => return Err( value.conversion_error(vtype.name()) ),
            };
            write_number(var, pos, num)
        }
    }
}

/// The value of an integer slot, in the variant that matches the variable type.
fn int_value(vtype: VariableType, val: i64) -> Value {
    match vtype {
        VariableType::Boolean => Value::Bool(val != 0),
        VariableType::Int32   => Value::Int32(val as i32),
        _                     => Value::Int64(val),
    }
}

pub(crate) fn get_value(var: &VarBuffer, pos: usize) -> Result<Value> {
    match (var.vtype, &var.data) {
        (vtype, Storage::Ints(data)) => Ok( int_value(vtype, data[pos]) ),
        (_, Storage::Floats(data)) => Ok( Value::Float(data[pos]) ),
        (VariableType::Float, _) => {
            let num = read_number(var, pos)?;
            Ok( Value::Float(to_real(&var.env, &num)?) )
        }
        _ => {
            let num = read_number(var, pos)?;
            Ok( Value::Number(to_text(&var.env, &num)?) )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn masked(text: &str, mask: &str) -> TextNumber {
        TextNumber::Masked(text.to_string(), mask.to_string())
    }

    #[test]
    fn integer_columns() {
        assert_eq!(integer_type(5, 0), Some(VariableType::Int32));
        assert_eq!(integer_type(9, 0), Some(VariableType::Int32));
        assert_eq!(integer_type(10, 0), Some(VariableType::Int64));
        assert_eq!(integer_type(18, 0), Some(VariableType::Int64));
        assert_eq!(integer_type(19, 0), Some(VariableType::LongInteger));
        assert_eq!(integer_type(38, 0), Some(VariableType::LongInteger));
        assert_eq!(integer_type(126, -127), Some(VariableType::LongInteger));
    }

    #[test]
    fn integer_slot_values() {
        assert_eq!(int_value(VariableType::Int32, 12345), Value::Int32(12345));
        assert!(matches!(int_value(VariableType::Int32, -7), Value::Int32(-7)));
        assert!(matches!(int_value(VariableType::Int64, 1 << 40), Value::Int64(v) if v == 1 << 40));
        assert!(matches!(int_value(VariableType::Boolean, 1), Value::Bool(true)));
        assert!(matches!(int_value(VariableType::Boolean, 0), Value::Bool(false)));
    }

    #[test]
    fn non_integer_columns() {
        assert_eq!(integer_type(0, 0), None);
        assert_eq!(integer_type(0, -127), None);
        assert_eq!(integer_type(10, 2), None);
        assert_eq!(integer_type(5, -2), None);
    }

    #[test]
    fn masks() {
        assert_eq!(text_number("12345").unwrap(), masked("12345", "99999"));
        assert_eq!(text_number("-1.25").unwrap(), masked("-1.25", "9D99"));
        assert_eq!(text_number("+42").unwrap(), masked("42", "99"));
        assert_eq!(text_number(" 0.5 ").unwrap(), masked("0.5", "9D9"));
        assert_eq!(text_number(".5").unwrap(), masked(".5", "D9"));
        assert_eq!(
            text_number("123456789012345678901234567890").unwrap(),
            masked("123456789012345678901234567890", "999999999999999999999999999999")
        );
    }

    #[test]
    fn exponent_notation() {
        assert_eq!(text_number("1.5e3").unwrap(), TextNumber::Real(1500.0));
        assert_eq!(text_number("-2E-2").unwrap(), TextNumber::Real(-0.02));
        assert!(text_number("1e").is_err());
    }

    #[test]
    fn invalid_text() {
        assert!(text_number("").is_err());
        assert!(text_number("-").is_err());
        assert!(text_number("1.2.3").is_err());
        assert!(text_number("12a").is_err());
        assert!(text_number("1,5").is_err());
        assert!(text_number("--1").is_err());
    }

    #[test]
    fn integer_conversions() {
        assert_eq!(to_integer(&Value::Bool(true), "int64").unwrap(), 1);
        assert_eq!(to_integer(&Value::Int32(-7), "int64").unwrap(), -7);
        assert_eq!(to_integer(&Value::Float(3.0), "int64").unwrap(), 3);
        assert_eq!(to_integer(&Value::Number(" 42 ".into()), "int64").unwrap(), 42);
        assert!(to_integer(&Value::Float(3.5), "int64").is_err());
        assert!(to_integer(&Value::Bytes(vec![1]), "int64").is_err());
    }

    #[test]
    fn float_conversions() {
        assert_eq!(to_float(&Value::Int64(2), "float").unwrap(), 2.0);
        assert_eq!(to_float(&Value::Str("2.5".into()), "float").unwrap(), 2.5);
        assert!(to_float(&Value::Str("x".into()), "float").is_err());
    }
}
