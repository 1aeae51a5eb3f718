//! VARCHAR2, NVARCHAR2, CHAR, ROWID and RAW

use super::VariableType;
use crate::{Error, Result, Value, env::{MAX_BINARY_BYTES, MAX_STRING_CHARS}, err::msg, var::VarBuffer};

/// Buffer size for strings of `size` characters (or bytes for RAW).
pub(crate) fn buffer_size(size: u32, max_bytes_per_char: u32) -> u32 {
    size.saturating_mul(max_bytes_per_char)
}

/// Checks the length limits of string and binary data.
pub(crate) fn check_length(vtype: VariableType, data: &[u8]) -> Result<()> {
    if vtype.is_char_data() {
        let num_chars = String::from_utf8_lossy(data).chars().count();
        if num_chars > MAX_STRING_CHARS as usize {
            return Err( Error::new(msg::STRING_TOO_LARGE) );
        }
    } else if data.len() > MAX_BINARY_BYTES as usize {
        return Err( Error::new(msg::BINARY_TOO_LARGE) );
    }
    Ok(())
}

/// Number of characters (bytes for binary data) to size a buffer for `len` bytes.
pub(crate) fn size_for(vtype: VariableType, len: usize, max_bytes_per_char: u32) -> u32 {
    let len = len as u32;
    if vtype.is_char_data() {
        let max_bytes_per_char = max_bytes_per_char.max(1);
        (len + max_bytes_per_char - 1) / max_bytes_per_char
    } else {
        len
    }
}

pub(crate) fn set_value(var: &mut VarBuffer, pos: usize, value: &Value) -> Result<()> {
    let vtype = var.vtype;
    let data = match value {
        Value::Str(text) | Value::Number(text) => text.as_bytes(),
        Value::Bytes(bytes) => bytes.as_slice(),
        _ => return Err( value.conversion_error(vtype.name()) ),
    };
    check_length(vtype, data)?;
    if data.len() > var.buffer_size as usize {
        let size = size_for(vtype, data.len(), var.env.max_bytes_per_character());
        var.resize(size)?;
    }
    var.element_mut(pos)?[..data.len()].copy_from_slice(data);
    var.actual_length[pos] = data.len() as u16;
    Ok(())
}

pub(crate) fn get_value(var: &VarBuffer, pos: usize) -> Result<Value> {
    let bytes = var.element(pos)?;
    let len = (var.actual_length[pos] as usize).min(bytes.len());
    let data = &bytes[..len];
    if var.vtype == VariableType::Binary {
        Ok( Value::Bytes(data.to_vec()) )
    } else {
        Ok( Value::Str(String::from_utf8_lossy(data).into_owned()) )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits() {
        let text = "ы".repeat(MAX_STRING_CHARS as usize);
        assert!(check_length(VariableType::String, text.as_bytes()).is_ok());
        let text = "x".repeat(MAX_STRING_CHARS as usize + 1);
        assert_eq!(
            check_length(VariableType::String, text.as_bytes()).unwrap_err().to_string(),
            msg::STRING_TOO_LARGE
        );
        let data = vec![0u8; MAX_BINARY_BYTES as usize + 1];
        assert_eq!(
            check_length(VariableType::Binary, &data).unwrap_err().to_string(),
            msg::BINARY_TOO_LARGE
        );
        assert!(check_length(VariableType::Binary, &data[1..]).is_ok());
    }

    #[test]
    fn sizes() {
        assert_eq!(buffer_size(100, 4), 400);
        assert_eq!(size_for(VariableType::String, 10, 4), 3);
        assert_eq!(size_for(VariableType::String, 12, 4), 3);
        assert_eq!(size_for(VariableType::FixedChar, 5, 1), 5);
        assert_eq!(size_for(VariableType::Binary, 10, 4), 10);
    }
}
