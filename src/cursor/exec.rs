//! Statement execution

use super::{Cursor, StatementType, bind::BindVars};
use crate::{Arg, Error, Result, Value, err::msg, oci::*, scan};
use std::{borrow::Cow, collections::{BTreeMap, BTreeSet}, ptr};

/// Describes how the named binds differ from the placeholders of a statement.
pub(crate) fn named_bind_report(statement: &str, bound: &[&str]) -> String {
    let mut declared : BTreeMap<String, usize> = BTreeMap::new();
    for (name, offsets) in scan::find_statement_vars(statement) {
        *declared.entry(name.to_uppercase()).or_default() += offsets.len();
    }
    let declared_names : BTreeSet<String> = declared.keys().cloned().collect();
    let bound_names : BTreeSet<String> = bound.iter().map(|name| name.trim_start_matches(':').to_uppercase()).collect();
    let missing : Vec<&str> = declared_names.difference(&bound_names).map(String::as_str).collect();
    let unnecessary : Vec<&str> = bound_names.difference(&declared_names).map(String::as_str).collect();
    let repeated : Vec<&str> = declared.iter()
        .filter(|(_, count)| **count > 1)
        .map(|(name, _)| name.as_str())
        .collect();
    format!(
        "missing: [{}]; unnecessary: [{}]; declared more than once: [{}]",
        missing.join(", "), unnecessary.join(", "), repeated.join(", ")
    )
}

/// Describes how many values were bound to a statement with positional binds.
pub(crate) fn positional_bind_report(statement: &str, bound: usize) -> String {
    let declared = scan::find_statement_vars(statement);
    let occurrences : usize = declared.values().map(Vec::len).sum();
    format!(
        "statement has {} placeholders ({} occurrences), {} values bound",
        declared.len(), occurrences, bound
    )
}

impl Cursor {
    /**
    Prepares (unless already prepared) and executes a statement with
    positional arguments. An empty `sql` executes the previously prepared
    statement. Values returned into [`Arg::Out`] arguments are written back
    once the statement completes.

    Queries are executed without fetching; rows are then read with the
    `fetch_*` methods.
    */
    pub fn execute(&mut self, sql: &str, args: &mut [Arg]) -> Result<()> {
        self.check_open()?;
        self.internal_prepare(sql, None)?;
        if !args.is_empty() {
            let refs : Vec<&Arg> = args.iter().collect();
            self.set_bind_variables_by_pos(&refs, 1, 0, false)?;
        }
        self.execute_prepared()?;
        if !self.is_query() {
            for (pos, arg) in args.iter_mut().enumerate() {
                self.write_back_pos(pos, arg)?;
            }
        }
        Ok(())
    }

    /**
    Executes a statement with named arguments. Names may be given with or
    without the leading colon.

    With [`set_bypass_multiple_args`](Cursor::set_bypass_multiple_args) every
    occurrence of a placeholder used more than once is bound separately.
    */
    pub fn execute_named(&mut self, sql: &str, args: &mut [(&str, Arg)]) -> Result<()> {
        self.check_open()?;
        let (sql, aliases) = if self.bypass_multiple_args {
            let (sql, aliases) = scan::uniquify_statement_vars(sql);
            (Cow::Owned(sql), aliases)
        } else {
            (Cow::Borrowed(sql), BTreeMap::new())
        };
        self.internal_prepare(&sql, None)?;
        if !args.is_empty() {
            let refs : Vec<(&str, &Arg)> = args.iter().map(|(name, arg)| (*name, arg)).collect();
            self.set_bind_variables_by_name(&refs, 1, 0, false)?;
            if !aliases.is_empty() {
                self.spread_aliases(&aliases)?;
            }
        }
        self.execute_prepared()?;
        if !self.is_query() {
            for (name, arg) in args.iter_mut() {
                self.write_back_named(name, arg)?;
            }
        }
        Ok(())
    }

    /**
    Executes a DML statement once for every row of named values, in a single
    round trip. Names missing from a row, and NULLs in rows before the first
    row that has a value for them, are bound as NULL.
    */
    pub fn execute_many(&mut self, sql: &str, rows: &[Vec<(&str, Value)>]) -> Result<()> {
        self.check_open()?;
        self.internal_prepare(sql, None)?;
        if self.is_query() {
            return Err( Error::new(msg::QUERIES_NOT_SUPPORTED) );
        }
        let num_rows = rows.len() as u32;
        for (i, row) in rows.iter().enumerate() {
            let args : Vec<Arg> = row.iter().map(|(_, value)| Arg::In(value)).collect();
            let refs : Vec<(&str, &Arg)> = row.iter().zip(args.iter()).map(|((name, _), arg)| (*name, arg)).collect();
            self.set_bind_variables_by_name(&refs, num_rows, i as u32, i + 1 < rows.len())?;
        }
        self.perform_bind()?;
        if num_rows > 0 {
            self.internal_execute(num_rows)?;
        }
        Ok(())
    }

    /**
    Executes the prepared statement `num_iters` times with the variables
    bound by [`set_input_sizes_by_pos`](Cursor::set_input_sizes_by_pos) or
    [`set_input_sizes_by_name`](Cursor::set_input_sizes_by_name).
    */
    pub fn execute_many_prepared(&mut self, num_iters: u32) -> Result<()> {
        self.check_open()?;
        if self.handle.is_null() {
            return Err( Error::new(msg::NOT_PREPARED) );
        }
        if self.is_query() {
            return Err( Error::new(msg::QUERIES_NOT_SUPPORTED) );
        }
        if self.bind_vars.vars().iter().any(|var| num_iters > var.allocated_elements()) {
            return Err( Error::new(msg::ITERS_EXCEED_BIND_SIZE) );
        }
        self.perform_bind()?;
        self.internal_execute(num_iters)
    }

    /// Binds the bind table, executes and, for queries, defines the result set.
    pub(crate) fn execute_prepared(&mut self) -> Result<()> {
        self.perform_bind()?;
        let is_query = self.is_query();
        self.internal_execute(if is_query { 0 } else { 1 })?;
        if is_query && self.fetch_vars.is_empty() {
            self.perform_define()?;
        }
        self.output_size = None;
        self.output_size_column = None;
        Ok(())
    }

    pub(crate) fn internal_execute(&mut self, num_iters: u32) -> Result<()> {
        let mode = if self.conn.autocommit() { OCI_COMMIT_ON_SUCCESS } else { OCI_DEFAULT };
        let handle = self.handle.get();
        tracing::debug!(statement = self.statement.as_deref().unwrap_or(""), num_iters, "execute");
        let res = self.conn.with_session(|svc, env| {
            env.check_status(unsafe {
                OCIStmtExecute(svc, handle, env.err_ptr(), num_iters, 0, ptr::null(), ptr::null_mut(), mode)
            }, "Execute")
        });
        if let Err(err) = res {
            let offset = attr::parse_error_offset(handle, self.conn.env().err_ptr());
            let err = err.with_offset(offset);
            if err.code() == Some(ORA_NOT_ALL_VARIABLES_BOUND) {
                return Err( err.with_details(&self.bind_report()) );
            }
            return Err(err);
        }
        self.set_row_count()
    }

    fn bind_report(&self) -> String {
        let statement = self.statement.as_deref().unwrap_or("");
        match &self.bind_vars {
            BindVars::ByName(vars) => {
                let bound : Vec<&str> = vars.iter()
                    .filter(|(_, var)| var.is_some())
                    .map(|(name, _)| name.as_str())
                    .collect();
                named_bind_report(statement, &bound)
            }
            BindVars::ByPos(vars) => positional_bind_report(statement, vars.iter().flatten().count()),
            BindVars::None => positional_bind_report(statement, 0),
        }
    }

    pub(crate) fn set_row_count(&mut self) -> Result<()> {
        match self.statement_type {
            Some(StatementType::Select) => {
                self.row_count = 0;
                self.actual_rows = -1;
                self.row_num = 0;
            }
            Some(stmt_type) if stmt_type.is_dml() => {
                let count : u32 = self.get_attr(OCI_ATTR_ROW_COUNT)?;
                self.row_count = count as i64;
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_report() {
        let report = named_bind_report("UPDATE t SET a = :a, b = :b WHERE c = :a", &["A", ":x"]);
        assert_eq!(report, "missing: [B]; unnecessary: [X]; declared more than once: [A]");

        let report = named_bind_report("SELECT :Id FROM t WHERE p = :id", &["ID"]);
        assert_eq!(report, "missing: []; unnecessary: []; declared more than once: [ID]");

        let report = named_bind_report("SELECT :v FROM DUAL", &["v"]);
        assert_eq!(report, "missing: []; unnecessary: []; declared more than once: []");
    }

    #[test]
    fn positional_report() {
        let report = positional_bind_report("INSERT INTO t VALUES (:1, :2, :1)", 1);
        assert_eq!(report, "statement has 2 placeholders (3 occurrences), 1 values bound");
    }
}
