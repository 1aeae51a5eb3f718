//! Cursors: prepared statements with their bind tables and result sets

mod bind;
mod call;
mod describe;
mod exec;
mod fetch;

pub use call::call_build_statement;
pub use describe::VariableDescription;
pub use fetch::Rows;
use bind::BindVars;

use crate::{Connection, Error, Result, ToSql, Value, Variable, VariableType, err::msg, oci::*};
use libc::c_void;
use parking_lot::{Mutex, MutexGuard};
use std::{fmt, ptr, sync::Arc};

const DEFAULT_ARRAY_SIZE : u32 = 50;

const FNV_OFFSET_BASIS : u64 = 0xcbf29ce484222325;
const FNV_PRIME        : u64 = 0x100000001b3;

/// 64-bit FNV-1a hash of the statement text in big-endian bytes.
fn statement_tag(sql: &str) -> Vec<u8> {
    let hash = sql.as_bytes().iter().fold(FNV_OFFSET_BASIS, |hash, &b| {
        (hash ^ b as u64).wrapping_mul(FNV_PRIME)
    });
    hash.to_be_bytes().to_vec()
}

/// Kind of a prepared statement as reported by OCI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementType {
    Select,
    Update,
    Delete,
    Insert,
    Create,
    Drop,
    Alter,
    Begin,
    Declare,
    Call,
    Merge,
    Other(u16),
}

impl StatementType {
    pub(crate) fn from_oci(code: u16) -> Self {
        match code {
            OCI_STMT_SELECT  => StatementType::Select,
            OCI_STMT_UPDATE  => StatementType::Update,
            OCI_STMT_DELETE  => StatementType::Delete,
            OCI_STMT_INSERT  => StatementType::Insert,
            OCI_STMT_CREATE  => StatementType::Create,
            OCI_STMT_DROP    => StatementType::Drop,
            OCI_STMT_ALTER   => StatementType::Alter,
            OCI_STMT_BEGIN   => StatementType::Begin,
            OCI_STMT_DECLARE => StatementType::Declare,
            OCI_STMT_CALL    => StatementType::Call,
            OCI_STMT_MERGE   => StatementType::Merge,
            other            => StatementType::Other(other),
        }
    }

    /// INSERT, UPDATE, DELETE or MERGE
    pub fn is_dml(self) -> bool {
        matches!(self, StatementType::Insert | StatementType::Update | StatementType::Delete | StatementType::Merge)
    }

    /// CREATE, DROP or ALTER
    pub fn is_ddl(self) -> bool {
        matches!(self, StatementType::Create | StatementType::Drop | StatementType::Alter)
    }

    /// An anonymous block or a CALL
    pub fn is_plsql(self) -> bool {
        matches!(self, StatementType::Begin | StatementType::Declare | StatementType::Call)
    }
}

/**
A statement executor bound to a connection.

A cursor prepares one statement at a time, keeps the variables its arguments
are bound through and, for queries, the define variables rows are fetched
into.

# Example

```no_run
# fn main() -> goracle::Result<()> {
let conn = goracle::Connection::open("scott/tiger@localhost:1521/orcl")?;
let mut cursor = conn.new_cursor();
cursor.execute("SELECT ename FROM emp WHERE deptno = :1", &mut [(&10).into()])?;
for row in cursor.rows() {
    let row = row?;
    println!("{}", row[0]);
}
# Ok(()) }
```
*/
pub struct Cursor {
    conn: Connection,
    handle: Ptr<OCIStmt>,
    /// handle was allocated by the cursor rather than prepared from the cache
    is_owned: bool,
    is_open: bool,
    statement: Option<String>,
    tag: Vec<u8>,
    statement_type: Option<StatementType>,
    bind_vars: BindVars,
    fetch_vars: Vec<Variable>,
    array_size: u32,
    bind_array_size: u32,
    fetch_array_size: u32,
    row_count: i64,
    actual_rows: i64,
    row_num: i64,
    set_input_sizes: bool,
    output_size: Option<u32>,
    output_size_column: Option<u32>,
    bypass_multiple_args: bool,
}

impl Cursor {
    pub(crate) fn new(conn: &Connection) -> Self {
        Self {
            conn: conn.clone(),
            handle: Ptr::null(),
            is_owned: false,
            is_open: true,
            statement: None,
            tag: Vec::new(),
            statement_type: None,
            bind_vars: BindVars::None,
            fetch_vars: Vec::new(),
            array_size: DEFAULT_ARRAY_SIZE,
            bind_array_size: 1,
            fetch_array_size: DEFAULT_ARRAY_SIZE,
            row_count: 0,
            actual_rows: -1,
            row_num: 0,
            set_input_sizes: false,
            output_size: None,
            output_size_column: None,
            bypass_multiple_args: false,
        }
    }

    /// Creates a cursor with its own statement handle, which OCI fills when
    /// a REF CURSOR is bound or fetched into it.
    pub(crate) fn new_owned(conn: &Connection) -> Result<Self> {
        let mut cursor = Self::new(conn);
        cursor.allocate_handle()?;
        Ok(cursor)
    }

    fn allocate_handle(&mut self) -> Result<()> {
        let env = self.conn.env();
        let mut handle = ptr::null_mut::<c_void>();
        let res = unsafe {
            OCIHandleAlloc(env.env_ptr() as *const c_void, &mut handle, OCI_HTYPE_STMT, 0, ptr::null())
        };
        if res != OCI_SUCCESS {
            return Err( Error::env(env.env_ptr(), res).at("AllocateStatement") );
        }
        self.handle = Ptr::new(handle as *mut OCIStmt);
        self.is_owned = true;
        Ok(())
    }

    fn free_handle(&mut self) -> Result<()> {
        let handle = self.handle.take();
        if handle.is_null() {
            return Ok(());
        }
        let env = self.conn.env();
        if self.is_owned {
            let res = unsafe { OCIHandleFree(handle as *mut c_void, OCI_HTYPE_STMT) };
            env.check_status(res, "FreeStatement")
        } else if self.conn.is_connected() {
            let _serial = self.conn.lock();
            let res = unsafe {
                OCIStmtRelease(handle, env.err_ptr(), self.tag.as_ptr(), self.tag.len() as u32, OCI_DEFAULT)
            };
            env.check_status(res, "StatementRelease")
        } else {
            Ok(())
        }
    }

    /// Replaces a cached statement handle with one the cursor owns, so OCI
    /// can bind a REF CURSOR into it.
    pub(crate) fn make_owned(&mut self) -> Result<()> {
        if self.is_owned && !self.handle.is_null() {
            return Ok(());
        }
        self.free_handle()?;
        self.allocate_handle()?;
        self.statement = None;
        self.tag.clear();
        Ok(())
    }

    pub(crate) fn handle_ptr(&self) -> *mut OCIStmt {
        self.handle.get()
    }

    /// Forgets the statement type, so the cursor is described again before
    /// its next fetch.
    pub(crate) fn reset_statement_type(&mut self) {
        self.statement_type = None;
    }

    fn get_attr<V: attr::AttrGet>(&self, attr_type: u32) -> Result<V> {
        attr::get::<V>(attr_type, OCI_HTYPE_STMT, self.handle.get() as *const c_void, self.conn.env().err_ptr())
    }

    pub(crate) fn check_open(&self) -> Result<()> {
        if !self.is_open {
            return Err( Error::new(msg::CURSOR_IS_CLOSED) );
        }
        if !self.conn.is_connected() {
            return Err( Error::new(msg::NOT_CONNECTED) );
        }
        Ok(())
    }

    /// Whether the cursor is usable: not closed, and its connection is connected.
    pub fn is_open(&self) -> bool {
        self.is_open && self.conn.is_connected()
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Text of the last prepared statement.
    pub fn statement(&self) -> Option<&str> {
        self.statement.as_deref()
    }

    pub fn statement_type(&self) -> Option<StatementType> {
        self.statement_type
    }

    pub fn is_ddl(&self) -> bool {
        self.statement_type.map_or(false, StatementType::is_ddl)
    }

    pub(crate) fn is_query(&self) -> bool {
        self.statement_type == Some(StatementType::Select)
    }

    /**
    Number of rows affected by the last DML statement, or the number of rows
    fetched so far from the current query. Statements of other kinds
    leave it unchanged.
    */
    pub fn row_count(&self) -> i64 {
        self.row_count
    }

    /// Number of rows fetched from the server in one round trip.
    pub fn array_size(&self) -> u32 {
        self.array_size
    }

    /// Sets the fetch array size for queries executed after this call.
    pub fn set_array_size(&mut self, size: u32) {
        self.array_size = size.max(1);
    }

    /// Number of elements of the variables created by the `set_input_sizes_*` methods.
    pub fn bind_array_size(&self) -> u32 {
        self.bind_array_size
    }

    pub fn set_bind_array_size(&mut self, size: u32) {
        self.bind_array_size = size.max(1);
    }

    pub fn bypass_multiple_args(&self) -> bool {
        self.bypass_multiple_args
    }

    /**
    When enabled, [`execute_named`](Cursor::execute_named) binds every
    occurrence of a placeholder that appears more than once in the statement
    as a separate variable carrying the same value.
    */
    pub fn set_bypass_multiple_args(&mut self, bypass: bool) {
        self.bypass_multiple_args = bypass;
    }

    /**
    Sets the buffer size for variable-length columns whose size the server
    does not report (LONG and LONG RAW). With a `column` (1-based) only that
    column is affected. The setting is used by the next execution only.
    */
    pub fn set_output_size(&mut self, size: u32, column: Option<u32>) {
        self.output_size = Some(size);
        self.output_size_column = column;
    }

    /// Variables of the current result set, one per column.
    pub fn fetch_vars(&self) -> &[Variable] {
        &self.fetch_vars
    }

    /// Variables of the current bind table in bind order. Slots whose binding
    /// was deferred are skipped.
    pub fn bind_vars(&self) -> Vec<Variable> {
        self.bind_vars.vars()
    }

    /**
    Prepares the statement unless the same text is already prepared under the
    same tag. DDL is always prepared anew. An empty `sql` reuses the previous
    statement.
    */
    pub(crate) fn internal_prepare(&mut self, sql: &str, tag: Option<&str>) -> Result<()> {
        let sql = if sql.is_empty() {
            match &self.statement {
                Some(prev) => prev.clone(),
                None => return Err( Error::new(msg::NO_STATEMENT) ),
            }
        } else {
            sql.to_string()
        };
        let same_tag = match tag {
            None | Some("") => true,
            Some(tag) => tag.as_bytes() == self.tag.as_slice(),
        };
        if !self.handle.is_null() && !self.is_owned
            && self.statement.as_deref() == Some(sql.as_str())
            && same_tag && !self.is_ddl()
        {
            return Ok(());
        }

        self.free_handle()?;
        self.is_owned = false;
        self.statement_type = None;
        let tag = match tag {
            Some(tag) if !tag.is_empty() => tag.as_bytes().to_vec(),
            _ => statement_tag(&sql),
        };
        tracing::debug!(statement = sql.as_str(), "prepare");
        let mut handle = ptr::null_mut::<OCIStmt>();
        let res = self.conn.with_session(|svc, env| {
            env.check_status(unsafe {
                OCIStmtPrepare2(
                    svc, &mut handle, env.err_ptr(),
                    sql.as_ptr(), sql.len() as u32,
                    tag.as_ptr(), tag.len() as u32,
                    OCI_NTV_SYNTAX, OCI_DEFAULT
                )
            }, "Prepare")
        });
        self.statement = Some(sql);
        self.tag = tag;
        res?;
        self.handle = Ptr::new(handle);

        if !self.set_input_sizes {
            self.bind_vars = BindVars::None;
        }
        self.get_statement_type()
    }

    /**
    Prepares a statement for a later execution with an empty statement text.
    A non-empty `tag` is the key of the statement in the statement cache.
    */
    pub fn prepare(&mut self, sql: &str, tag: Option<&str>) -> Result<()> {
        self.check_open()?;
        self.internal_prepare(sql, tag)
    }

    /// Parses the statement on the server without executing it.
    pub fn parse(&mut self, sql: &str) -> Result<()> {
        self.check_open()?;
        self.internal_prepare(sql, None)?;
        let mode = if self.is_query() { OCI_DESCRIBE_ONLY } else { OCI_PARSE_ONLY };
        let handle = self.handle.get();
        self.conn.with_session(|svc, env| {
            env.check_status(unsafe {
                OCIStmtExecute(svc, handle, env.err_ptr(), 0, 0, ptr::null(), ptr::null_mut(), mode)
            }, "Parse")
        })
    }

    pub(crate) fn get_statement_type(&mut self) -> Result<()> {
        let code : u16 = self.get_attr(OCI_ATTR_STMT_TYPE)?;
        self.statement_type = Some(StatementType::from_oci(code));
        self.fetch_vars.clear();
        Ok(())
    }

    /// Creates a variable of `vtype` with `num_elements` elements of `size`.
    pub fn new_variable(&self, num_elements: u32, vtype: VariableType, size: u32) -> Result<Variable> {
        if !self.is_open {
            return Err( Error::new(msg::NOT_A_VAR_CREATOR) );
        }
        Variable::new(&self.conn, num_elements, vtype, size)
    }

    /**
    Creates a variable for a host value: the type and the size are inferred
    from the value, which is then stored in the variable. Arrays become
    PL/SQL index-by table variables.
    */
    pub fn new_var<T: ToSql + ?Sized>(&self, value: &T) -> Result<Variable> {
        if !self.is_open {
            return Err( Error::new(msg::NOT_A_VAR_CREATOR) );
        }
        let val = value.to_sql();
        let (mut vtype, mut size, num_elements) = VariableType::by_value(&val)?;
        if val.is_null() {
            if let Some(null_type) = value.null_type() {
                vtype = null_type;
            }
        }
        if size == 0 && vtype.is_variable_length() {
            size = vtype.default_size();
        }
        let var = if num_elements > 0 {
            Variable::new_array(&self.conn, num_elements, vtype, size)?
        } else {
            Variable::new(&self.conn, 1, vtype, size)?
        };
        var.set_value(0, &val)?;
        Ok(var)
    }

    /// Creates an index-by table variable of `vtype` holding `values`.
    pub fn new_array_var(&self, vtype: VariableType, values: &[Value], size: u32) -> Result<Variable> {
        if !self.is_open {
            return Err( Error::new(msg::NOT_A_VAR_CREATOR) );
        }
        let var = Variable::new_array(&self.conn, values.len() as u32, vtype, size)?;
        var.set_value(0, &Value::Array(values.to_vec()))?;
        Ok(var)
    }

    fn input_size_var(&self, vtype: VariableType) -> Result<Variable> {
        let size = if vtype.is_variable_length() { vtype.default_size() } else { 0 };
        Variable::new(&self.conn, self.bind_array_size, vtype, size)
    }

    /**
    Predefines positional bind variables of the given types. The next
    execution binds its arguments through these variables.
    */
    pub fn set_input_sizes_by_pos(&mut self, types: &[VariableType]) -> Result<Vec<Variable>> {
        self.check_open()?;
        let vars = types.iter().map(|&vtype| self.input_size_var(vtype)).collect::<Result<Vec<_>>>()?;
        self.bind_vars = BindVars::ByPos(vars.iter().cloned().map(Some).collect());
        self.set_input_sizes = true;
        Ok(vars)
    }

    /// Predefines named bind variables of the given types.
    pub fn set_input_sizes_by_name(&mut self, types: &[(&str, VariableType)]) -> Result<Vec<Variable>> {
        self.check_open()?;
        let mut table = Vec::with_capacity(types.len());
        let mut vars = Vec::with_capacity(types.len());
        for &(name, vtype) in types {
            let var = self.input_size_var(vtype)?;
            table.push((name.trim_start_matches(':').to_string(), Some(var.clone())));
            vars.push(var);
        }
        self.bind_vars = BindVars::ByName(table);
        self.set_input_sizes = true;
        Ok(vars)
    }

    /// Returns the distinct names of the placeholders of the prepared statement.
    pub fn bind_names(&self) -> Result<Vec<String>> {
        if self.handle.is_null() {
            return Err( Error::new(msg::NOT_PREPARED) );
        }
        let mut size = 8;
        loop {
            match self.bind_info(size)? {
                Ok(names) => return Ok(names),
                Err(found) => size = found,
            }
        }
    }

    /// Reads up to `size` bind names. Returns the number of binds when more
    /// than `size` were found.
    fn bind_info(&self, size: usize) -> Result<std::result::Result<Vec<String>, usize>> {
        let mut names     = vec![ptr::null_mut::<u8>(); size];
        let mut name_lens = vec![0u8; size];
        let mut ind_names = vec![ptr::null_mut::<u8>(); size];
        let mut ind_lens  = vec![0u8; size];
        let mut dups      = vec![0u8; size];
        let mut binds     = vec![ptr::null_mut::<OCIBind>(); size];
        let mut found     = 0i32;
        let env = self.conn.env();
        let res = unsafe {
            OCIStmtGetBindInfo(
                self.handle.get(), env.err_ptr(), size as u32, 1, &mut found,
                names.as_mut_ptr(), name_lens.as_mut_ptr(),
                ind_names.as_mut_ptr(), ind_lens.as_mut_ptr(),
                dups.as_mut_ptr(), binds.as_mut_ptr()
            )
        };
        if res == OCI_NO_DATA {
            return Ok(Ok(Vec::new()));
        }
        env.check_status(res, "GetBindInfo")?;
        if found < 0 {
            return Ok(Err(found.unsigned_abs() as usize));
        }
        let found = (found as usize).min(size);
        let names = (0..found)
            .filter(|&i| dups[i] == 0 && !names[i].is_null())
            .map(|i| {
                let name = unsafe { std::slice::from_raw_parts(names[i], name_lens[i] as usize) };
                String::from_utf8_lossy(name).into_owned()
            })
            .collect();
        Ok(Ok(names))
    }

    /// Releases the statement and the variables. Closing a closed cursor is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if !self.is_open {
            return Ok(());
        }
        self.is_open = false;
        self.fetch_vars.clear();
        self.bind_vars = BindVars::None;
        self.free_handle()
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::warn!(%err, "failed to release statement");
        }
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("statement", &self.statement)
            .field("type", &self.statement_type)
            .field("open", &self.is_open)
            .field("row_count", &self.row_count)
            .finish()
    }
}

/**
A shareable cursor: the value of a REF CURSOR column, bind or element.

Clones refer to the same cursor. Do not hold the guard returned by
[`lock`](RefCursor::lock) while fetching from the cursor that produced it.
*/
#[derive(Clone)]
pub struct RefCursor(Arc<Mutex<Cursor>>);

impl RefCursor {
    pub fn lock(&self) -> MutexGuard<'_, Cursor> {
        self.0.lock()
    }

    /// Whether a clone of this cursor exists outside of its variable.
    pub(crate) fn is_shared(&self) -> bool {
        Arc::strong_count(&self.0) > 1
    }
}

impl From<Cursor> for RefCursor {
    fn from(cursor: Cursor) -> Self {
        Self(Arc::new(Mutex::new(cursor)))
    }
}

impl fmt::Debug for RefCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_lock() {
            Some(cursor) => write!(f, "RefCursor({:?})", cursor.statement_type),
            None => f.write_str("RefCursor(<locked>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_types() {
        assert_eq!(StatementType::from_oci(1), StatementType::Select);
        assert_eq!(StatementType::from_oci(4), StatementType::Insert);
        assert_eq!(StatementType::from_oci(8), StatementType::Begin);
        assert_eq!(StatementType::from_oci(16), StatementType::Merge);
        assert_eq!(StatementType::from_oci(99), StatementType::Other(99));
        assert!(StatementType::Delete.is_dml());
        assert!(!StatementType::Select.is_dml());
        assert!(StatementType::Alter.is_ddl());
        assert!(StatementType::Declare.is_plsql());
    }

    #[test]
    fn tags() {
        // FNV-1a 64 of the empty input is the offset basis
        assert_eq!(statement_tag(""), FNV_OFFSET_BASIS.to_be_bytes().to_vec());
        assert_eq!(statement_tag("a"), 0xaf63dc4c8601ec8cu64.to_be_bytes().to_vec());
        assert_eq!(statement_tag("SELECT 1 FROM DUAL").len(), 8);
        assert_ne!(statement_tag("SELECT 1 FROM DUAL"), statement_tag("SELECT 2 FROM DUAL"));
    }
}
