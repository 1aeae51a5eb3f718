//! LONG and LONG RAW. Element buffers start with a 4-byte length in native
//! byte order followed by the data.

use super::{varchar, VariableType};
use crate::{Result, Value, var::VarBuffer};

const LENGTH_PREFIX : usize = 4;

pub(crate) fn buffer_size(vtype: VariableType, size: u32, max_bytes_per_char: u32) -> u32 {
    let data_size = if vtype.is_char_data() { size.saturating_mul(max_bytes_per_char) } else { size };
    data_size.saturating_add(LENGTH_PREFIX as u32)
}

/// Writes `data` with its length prefix into `buf`, which must be large enough.
pub(crate) fn encode(data: &[u8], buf: &mut [u8]) {
    buf[..LENGTH_PREFIX].copy_from_slice(&(data.len() as u32).to_ne_bytes());
    buf[LENGTH_PREFIX..LENGTH_PREFIX + data.len()].copy_from_slice(data);
}

/// Returns the data part of a length prefixed buffer.
pub(crate) fn decode(buf: &[u8]) -> &[u8] {
    if buf.len() < LENGTH_PREFIX {
        return &[];
    }
    let mut prefix = [0u8; LENGTH_PREFIX];
    prefix.copy_from_slice(&buf[..LENGTH_PREFIX]);
    let len = (u32::from_ne_bytes(prefix) as usize).min(buf.len() - LENGTH_PREFIX);
    &buf[LENGTH_PREFIX..LENGTH_PREFIX + len]
}

pub(crate) fn set_value(var: &mut VarBuffer, pos: usize, value: &Value) -> Result<()> {
    let vtype = var.vtype;
    let data = match value {
        Value::Str(text) | Value::Number(text) => text.as_bytes(),
        Value::Bytes(bytes) => bytes.as_slice(),
        _ => return Err( value.conversion_error(vtype.name()) ),
    };
    if data.len() + LENGTH_PREFIX > var.buffer_size as usize {
        let size = varchar::size_for(vtype, data.len(), var.env.max_bytes_per_character());
        var.resize(size)?;
    }
    encode(data, var.element_mut(pos)?);
    Ok(())
}

pub(crate) fn get_value(var: &VarBuffer, pos: usize) -> Result<Value> {
    let data = decode(var.element(pos)?);
    if var.vtype == VariableType::LongBinary {
        Ok( Value::Bytes(data.to_vec()) )
    } else {
        Ok( Value::Str(String::from_utf8_lossy(data).into_owned()) )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(buffer_size(VariableType::LongString, 10, 4), 44);
        assert_eq!(buffer_size(VariableType::LongBinary, 10, 4), 14);
    }

    #[test]
    fn prefix() {
        let mut buf = vec![0xffu8; 16];
        encode(b"hello", &mut buf);
        assert_eq!(&buf[..4], &5u32.to_ne_bytes());
        assert_eq!(decode(&buf), b"hello");
        encode(b"", &mut buf);
        assert_eq!(decode(&buf), b"");
    }

    #[test]
    fn truncated_buffers() {
        let mut buf = vec![0u8; 8];
        buf[..4].copy_from_slice(&100u32.to_ne_bytes());
        assert_eq!(decode(&buf).len(), 4);
        assert!(decode(&buf[..2]).is_empty());
    }
}
