//! Result set definition and row fetching

use super::Cursor;
use crate::{Error, Result, Status, ToSqlOut, Value, Variable, VariableType, err::msg, oci::*};
use libc::c_void;
use std::ptr;

impl Cursor {
    pub(crate) fn column_param(&self, position: u32) -> Result<Descriptor<OCIParam>> {
        let env = self.conn.env();
        let mut param = ptr::null_mut::<c_void>();
        let res = unsafe {
            OCIParamGet(self.handle.get() as *const c_void, OCI_HTYPE_STMT, env.err_ptr(), &mut param, position)
        };
        env.check_status(res, "ParamGet")?;
        Ok(Descriptor::from(param as *mut OCIParam))
    }

    /// Creates and defines the variable for the column at `position` (1-based).
    fn var_define(&self, position: u32) -> Result<Variable> {
        let err = self.conn.env().err_ptr();
        let param = self.column_param(position)?;
        let data_type : u16 = param.get_attr(OCI_ATTR_DATA_TYPE, err)?;
        let charset_form = if VariableType::has_charset_form(data_type) {
            param.get_attr::<u8>(OCI_ATTR_CHARSET_FORM, err)?
        } else {
            SQLCS_IMPLICIT
        };
        let vtype = VariableType::by_oracle_type(data_type, charset_form)?;

        let mut size = vtype.default_size();
        if vtype.is_variable_length() {
            let data_size : u16 = param.get_attr(OCI_ATTR_DATA_SIZE, err)?;
            if data_size > 0 {
                size = data_size as u32;
            } else if let Some(output_size) = self.output_size {
                if self.output_size_column.map_or(true, |column| column == position) {
                    size = output_size;
                }
            }
        }
        let vtype = vtype.pre_define(&param, err)?;

        let var = Variable::new(&self.conn, self.fetch_array_size, vtype, size)?;
        var.lock().define(self.handle.get(), position)?;
        Ok(var)
    }

    /// Defines a variable for every column of the executed query.
    pub(crate) fn perform_define(&mut self) -> Result<()> {
        let num_columns : u32 = self.get_attr(OCI_ATTR_PARAM_COUNT)?;
        self.fetch_array_size = self.array_size;
        let mut vars = Vec::with_capacity(num_columns as usize);
        for position in 1..=num_columns {
            vars.push(self.var_define(position)?);
        }
        tracing::debug!(num_columns, fetch_array_size = self.fetch_array_size, "define");
        self.fetch_vars = vars;
        Ok(())
    }

    /// Describes a cursor that OCI filled through a REF CURSOR bind or column.
    pub(crate) fn fixup_bound_cursor(&mut self) -> Result<()> {
        if !self.handle.is_null() && self.statement_type.is_none() {
            self.get_statement_type()?;
            if self.is_query() {
                self.perform_define()?;
            }
            self.set_row_count()?;
        }
        Ok(())
    }

    fn verify_fetch(&mut self) -> Result<()> {
        self.check_open()?;
        self.fixup_bound_cursor()?;
        if !self.is_query() {
            return Err( Error::new(msg::NOT_A_QUERY) );
        }
        Ok(())
    }

    fn internal_fetch(&mut self, num_rows: u32) -> Result<()> {
        if self.fetch_vars.is_empty() {
            return Err( Error::new(msg::QUERY_NOT_EXECUTED) );
        }
        for var in self.fetch_vars.iter() {
            let mut buf = var.lock();
            buf.internal_fetch_num += 1;
            let vtype = buf.vtype;
            vtype.pre_fetch(&mut *buf)?;
        }
        let handle = self.handle.get();
        self.conn.with_session(|_, env| {
            let res = unsafe {
                OCIStmtFetch2(handle, env.err_ptr(), num_rows, OCI_FETCH_NEXT, 0, OCI_DEFAULT)
            };
            match env.check_status(res, "Fetch") {
                Err(Error::Status(Status::NoDataFound)) => Ok(()),
                other => other,
            }
        })?;
        let row_count : u32 = self.get_attr(OCI_ATTR_ROW_COUNT)?;
        self.actual_rows = row_count as i64 - self.row_count;
        self.row_num = 0;
        tracing::trace!(num_rows, actual_rows = self.actual_rows, "fetch");
        Ok(())
    }

    /// Makes sure a fetched row is available at `row_num`, fetching the next batch when needed.
    fn more_rows(&mut self) -> Result<bool> {
        if self.row_num >= self.actual_rows {
            if self.actual_rows < 0 || self.actual_rows == self.fetch_array_size as i64 {
                self.internal_fetch(self.fetch_array_size)?;
            }
            if self.row_num >= self.actual_rows {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn create_row(&mut self) -> Result<Vec<Value>> {
        let pos = self.row_num as u32;
        let row = self.fetch_vars.iter()
            .map(|var| var.get_value(pos))
            .collect::<Result<Vec<_>>>()?;
        self.row_num += 1;
        self.row_count += 1;
        Ok(row)
    }

    /// Returns the next row, or `None` when the result set is exhausted.
    pub fn fetch_one(&mut self) -> Result<Option<Vec<Value>>> {
        self.verify_fetch()?;
        if self.more_rows()? {
            self.create_row().map(Some)
        } else {
            Ok(None)
        }
    }

    /**
    Reads the next row into `dest`, one destination per column. Returns
    `false` when the result set is exhausted.
    */
    pub fn fetch_one_into(&mut self, dest: &mut [&mut dyn ToSqlOut]) -> Result<bool> {
        self.verify_fetch()?;
        if !self.more_rows()? {
            return Ok(false);
        }
        if dest.len() != self.fetch_vars.len() {
            return Err( Error::msg(format!(
                "column count mismatch: {} destinations for {} columns", dest.len(), self.fetch_vars.len()
            )) );
        }
        let pos = self.row_num as u32;
        for (var, dest) in self.fetch_vars.iter().zip(dest.iter_mut()) {
            dest.set_from_sql(var.get_value(pos)?)?;
        }
        self.row_num += 1;
        self.row_count += 1;
        Ok(true)
    }

    /**
    Returns up to `limit` rows. A negative limit reads one batch of
    [`array_size`](Cursor::array_size) rows, zero reads all remaining rows.
    */
    pub fn fetch_many(&mut self, limit: i64) -> Result<Vec<Vec<Value>>> {
        self.verify_fetch()?;
        let limit = if limit < 0 { self.array_size as i64 } else { limit };
        self.multi_fetch(limit)
    }

    /// Returns all remaining rows.
    pub fn fetch_all(&mut self) -> Result<Vec<Vec<Value>>> {
        self.verify_fetch()?;
        self.multi_fetch(0)
    }

    fn multi_fetch(&mut self, limit: i64) -> Result<Vec<Vec<Value>>> {
        let mut rows = Vec::new();
        while limit == 0 || (rows.len() as i64) < limit {
            if !self.more_rows()? {
                break;
            }
            rows.push(self.create_row()?);
        }
        Ok(rows)
    }

    /**
    Fetches up to `num_rows` rows into the define variables without
    converting them. Returns the number of rows fetched; the values are
    then read from [`fetch_vars`](Cursor::fetch_vars).
    */
    pub fn fetch_raw(&mut self, num_rows: u32) -> Result<i64> {
        self.verify_fetch()?;
        if num_rows > self.fetch_array_size {
            return Err( Error::new(msg::ROWS_EXCEED_ARRAY_SIZE) );
        }
        let num_rows = if num_rows == 0 { self.fetch_array_size } else { num_rows };
        self.internal_fetch(num_rows)?;
        self.row_count += self.actual_rows;
        self.row_num = self.actual_rows;
        Ok(self.actual_rows)
    }

    /// Returns an iterator over the remaining rows.
    pub fn rows(&mut self) -> Rows<'_> {
        Rows { cursor: self, done: false }
    }
}

/// Iterator over the rows of an executed query. Stops after the first error.
pub struct Rows<'c> {
    cursor: &'c mut Cursor,
    done: bool,
}

impl Iterator for Rows<'_> {
    type Item = Result<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.cursor.fetch_one() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
