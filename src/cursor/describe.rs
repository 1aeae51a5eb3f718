//! Result set description

use super::Cursor;
use crate::{Error, Result, VariableType, err::msg, oci::*};

/// Description of a result set column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDescription {
    pub name: String,
    /// Type of the variable the column is fetched into
    pub var_type: VariableType,
    /// Oracle data type code of the column
    pub oracle_type: u16,
    /// Maximum number of characters needed to display a value, -1 when unknown
    pub display_size: i32,
    /// Size of the column in bytes
    pub internal_size: u32,
    pub precision: i16,
    pub scale: i8,
    pub null_ok: bool,
}

/// Computes the display size of a column from its type and size attributes.
fn display_size(vtype: VariableType, char_size: u16, data_size: u16, precision: i16, scale: i8) -> i32 {
    match vtype {
        VariableType::String | VariableType::FixedChar | VariableType::Rowid | VariableType::LongString => char_size as i32,
        VariableType::Binary | VariableType::LongBinary => data_size as i32,
        VariableType::DateTime => 23,
        t if t.is_number() => {
            if precision == 0 {
                127
            } else {
                let mut size = precision as i32 + 1;
                if scale > 0 {
                    size += scale as i32 + 1;
                }
                size
            }
        }
        _ => -1,
    }
}

impl Cursor {
    /// Describes the columns of the executed query.
    pub fn description(&mut self) -> Result<Vec<VariableDescription>> {
        self.check_open()?;
        self.fixup_bound_cursor()?;
        if !self.is_query() {
            return Err( Error::new(msg::NOT_A_QUERY) );
        }
        let num_columns : u32 = self.get_attr(OCI_ATTR_PARAM_COUNT)?;
        (1..=num_columns).map(|position| self.describe_column(position)).collect()
    }

    fn describe_column(&self, position: u32) -> Result<VariableDescription> {
        let err = self.conn.env().err_ptr();
        let param = self.column_param(position)?;
        let data_type : u16 = param.get_attr(OCI_ATTR_DATA_TYPE, err)?;
        let charset_form = if VariableType::has_charset_form(data_type) {
            param.get_attr::<u8>(OCI_ATTR_CHARSET_FORM, err)?
        } else {
            SQLCS_IMPLICIT
        };
        let vtype = VariableType::by_oracle_type(data_type, charset_form)?;
        let vtype = vtype.pre_define(&param, err)?;

        let name : String = param.get_attr(OCI_ATTR_NAME, err)?;
        let data_size : u16 = param.get_attr(OCI_ATTR_DATA_SIZE, err)?;
        let char_size : u16 = if vtype.is_char_data() { param.get_attr(OCI_ATTR_CHAR_SIZE, err)? } else { 0 };
        let (precision, scale) = if vtype.is_number() {
            (param.get_attr::<i16>(OCI_ATTR_PRECISION, err)?, param.get_attr::<i8>(OCI_ATTR_SCALE, err)?)
        } else {
            (0, 0)
        };
        let null_ok : u8 = param.get_attr(OCI_ATTR_IS_NULL, err)?;

        Ok(VariableDescription {
            name,
            var_type: vtype,
            oracle_type: data_type,
            display_size: display_size(vtype, char_size, data_size, precision, scale),
            internal_size: data_size as u32,
            precision,
            scale,
            null_ok: null_ok != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_sizes() {
        assert_eq!(display_size(VariableType::String, 30, 120, 0, 0), 30);
        assert_eq!(display_size(VariableType::Binary, 0, 16, 0, 0), 16);
        assert_eq!(display_size(VariableType::DateTime, 0, 7, 0, 0), 23);
        assert_eq!(display_size(VariableType::Int32, 0, 22, 5, 0), 6);
        assert_eq!(display_size(VariableType::Float, 0, 22, 10, 2), 14);
        assert_eq!(display_size(VariableType::Float, 0, 22, 0, -127), 127);
        assert_eq!(display_size(VariableType::Clob, 0, 4000, 0, 0), -1);
    }
}
