//! Bind tables: turning arguments into bind variables

use super::Cursor;
use crate::{Arg, Error, Result, Value, Variable, VariableType, err::msg};
use std::{collections::BTreeMap, mem};

/// Variables the arguments of a statement are bound through. A `None` slot
/// is a NULL whose type is not known yet.
pub(crate) enum BindVars {
    None,
    ByPos(Vec<Option<Variable>>),
    ByName(Vec<(String, Option<Variable>)>),
}

impl BindVars {
    pub(crate) fn vars(&self) -> Vec<Variable> {
        match self {
            BindVars::None => Vec::new(),
            BindVars::ByPos(vars) => vars.iter().flatten().cloned().collect(),
            BindVars::ByName(vars) => vars.iter().filter_map(|(_, var)| var.clone()).collect(),
        }
    }

    pub(crate) fn at(&self, pos: usize) -> Option<&Variable> {
        match self {
            BindVars::ByPos(vars) => vars.get(pos).and_then(Option::as_ref),
            _ => None,
        }
    }

    pub(crate) fn named(&self, name: &str) -> Option<&Variable> {
        match self {
            BindVars::ByName(vars) => vars.iter()
                .find(|(n, _)| n == name)
                .and_then(|(_, var)| var.as_ref()),
            _ => None,
        }
    }
}

/// The value of an argument and the type to bind it with when it is NULL.
fn arg_value(arg: &Arg) -> (Value, Option<VariableType>) {
    match arg {
        Arg::In(val) => (val.to_sql(), val.null_type()),
        Arg::Out(val) => (val.out_value(), val.out_null_type()),
        Arg::Var(var) => (Value::Null, Some(var.var_type())),
        Arg::Typed(vtype, _, val) => (val.clone(), Some(*vtype)),
    }
}

impl Cursor {
    fn new_bound_var(&self, num_elements: u32, array_pos: u32, vtype: VariableType, size: u32, value: &Value) -> Result<Variable> {
        let var = if let Value::Array(items) = value {
            Variable::new_array(&self.conn, items.len() as u32, vtype, size)?
        } else {
            Variable::new(&self.conn, num_elements, vtype, size)?
        };
        var.set_value(array_pos, value)?;
        Ok(var)
    }

    /**
    Returns the variable to bind `arg` through at element `array_pos` of a
    bind of `num_elements` rows. `orig` is the variable bound in this slot
    before; it is reused when it can take the value.

    With `defer_type` a NULL argument that has no variable yet leaves the
    slot empty so a later row can decide its type.
    */
    fn bind_variable(&self, num_elements: u32, array_pos: u32, defer_type: bool, arg: &Arg, orig: Option<&Variable>) -> Result<Option<Variable>> {
        if let Arg::Var(var) = arg {
            return Ok(Some(var.clone()));
        }
        if let Arg::Typed(vtype, size, value) = arg {
            if let Some(orig) = orig {
                if orig.var_type() == *vtype && orig.size() >= *size
                    && orig.allocated_elements() >= num_elements
                    && orig.is_array() == matches!(value, Value::Array(_))
                {
                    orig.set_value(array_pos, value)?;
                    return Ok(Some(orig.clone()));
                }
            }
            return self.new_bound_var(num_elements, array_pos, *vtype, *size, value).map(Some);
        }

        let (value, null_type) = arg_value(arg);
        if value.is_null() && defer_type && orig.is_none() {
            return Ok(None);
        }
        let (mut vtype, mut size, elements) = VariableType::by_value(&value)?;
        if value.is_null() {
            if let Some(null_type) = null_type {
                vtype = null_type;
            }
        }
        if let Arg::Out(_) = arg {
            if vtype.is_variable_length() {
                size = size.max(vtype.default_size());
            }
        }

        if let Some(orig) = orig {
            if orig.is_array() == (elements > 0) && (orig.var_type() == vtype || array_pos > 0) {
                if num_elements > orig.allocated_elements() {
                    let size = orig.size().max(size);
                    return self.new_bound_var(num_elements, array_pos, orig.var_type(), size, &value).map(Some);
                }
                match orig.set_value(array_pos, &value) {
                    Ok(()) => return Ok(Some(orig.clone())),
                    Err(err) if array_pos > 0 => return Err(err),
                    Err(_) => {}
                }
            }
        }
        self.new_bound_var(num_elements, array_pos, vtype, size, &value).map(Some)
    }

    /// Fills the positional bind table for element `array_pos` of a bind of `num_elements` rows.
    pub(crate) fn set_bind_variables_by_pos(&mut self, args: &[&Arg<'_>], num_elements: u32, array_pos: u32, defer_type: bool) -> Result<()> {
        if args.is_empty() {
            return Err( Error::new(msg::LIST_IS_EMPTY) );
        }
        let mut table = match mem::replace(&mut self.bind_vars, BindVars::None) {
            BindVars::ByPos(table) => table,
            _ => Vec::with_capacity(args.len()),
        };
        if table.len() < args.len() {
            table.resize(args.len(), None);
        }
        let res = self.fill_by_pos(&mut table, args, num_elements, array_pos, defer_type);
        self.bind_vars = BindVars::ByPos(table);
        res
    }

    fn fill_by_pos(&self, table: &mut [Option<Variable>], args: &[&Arg<'_>], num_elements: u32, array_pos: u32, defer_type: bool) -> Result<()> {
        for (slot, arg) in table.iter_mut().zip(args.iter()) {
            if let Some(var) = self.bind_variable(num_elements, array_pos, defer_type, arg, slot.as_ref())? {
                *slot = Some(var);
            }
        }
        Ok(())
    }

    /**
    Fills the named bind table for element `array_pos`. Entries of names not
    in `args` are kept, so rows of a multi-row bind may omit arguments that
    are NULL.
    */
    pub(crate) fn set_bind_variables_by_name(&mut self, args: &[(&str, &Arg<'_>)], num_elements: u32, array_pos: u32, defer_type: bool) -> Result<()> {
        if args.is_empty() {
            return Err( Error::new(msg::LIST_IS_EMPTY) );
        }
        let mut table = match mem::replace(&mut self.bind_vars, BindVars::None) {
            BindVars::ByName(table) => table,
            _ => Vec::with_capacity(args.len()),
        };
        let res = self.fill_by_name(&mut table, args, num_elements, array_pos, defer_type);
        self.bind_vars = BindVars::ByName(table);
        res
    }

    fn fill_by_name(&self, table: &mut Vec<(String, Option<Variable>)>, args: &[(&str, &Arg<'_>)], num_elements: u32, array_pos: u32, defer_type: bool) -> Result<()> {
        for (name, slot) in table.iter_mut() {
            if args.iter().any(|(arg_name, _)| arg_name.trim_start_matches(':') == name.as_str()) {
                continue;
            }
            let nulled = match slot {
                Some(var) => self.null_element(var, num_elements, array_pos)?,
                None => continue,
            };
            *slot = Some(nulled);
        }
        for &(name, arg) in args {
            let name = name.trim_start_matches(':');
            match table.iter().position(|(n, _)| n == name) {
                Some(idx) => {
                    if let Some(var) = self.bind_variable(num_elements, array_pos, defer_type, arg, table[idx].1.as_ref())? {
                        table[idx].1 = Some(var);
                    }
                }
                None => {
                    let var = self.bind_variable(num_elements, array_pos, defer_type, arg, None)?;
                    table.push((name.to_string(), var));
                }
            }
        }
        Ok(())
    }

    /// Sets element `array_pos` of a table entry that has no argument to NULL.
    fn null_element(&self, var: &Variable, num_elements: u32, array_pos: u32) -> Result<Variable> {
        if var.is_array() {
            return Ok(var.clone());
        }
        if var.allocated_elements() < num_elements {
            return Variable::new(&self.conn, num_elements, var.var_type(), var.size());
        }
        var.set_value(array_pos, &Value::Null)?;
        Ok(var.clone())
    }

    /**
    Rebinds every placeholder that was renamed into several aliases: the
    first alias takes the variable of the original name, the others take
    copies of its value.
    */
    pub(crate) fn spread_aliases(&mut self, aliases: &BTreeMap<String, Vec<String>>) -> Result<()> {
        let mut table = match mem::replace(&mut self.bind_vars, BindVars::None) {
            BindVars::ByName(table) => table,
            other => {
                self.bind_vars = other;
                return Ok(());
            }
        };
        let res = self.fill_aliases(&mut table, aliases);
        self.bind_vars = BindVars::ByName(table);
        res
    }

    fn fill_aliases(&self, table: &mut Vec<(String, Option<Variable>)>, aliases: &BTreeMap<String, Vec<String>>) -> Result<()> {
        for (name, names) in aliases {
            let var = match table.iter().position(|(n, _)| n == name) {
                Some(idx) => table.remove(idx).1,
                None => continue,
            };
            let var = match var {
                Some(var) => var,
                None => continue,
            };
            for (i, alias) in names.iter().enumerate() {
                let alias_var = if i == 0 { var.clone() } else { self.duplicate(&var)? };
                match table.iter_mut().find(|(n, _)| n == alias) {
                    Some(entry) => entry.1 = Some(alias_var),
                    None => table.push((alias.clone(), Some(alias_var))),
                }
            }
        }
        Ok(())
    }

    fn duplicate(&self, var: &Variable) -> Result<Variable> {
        let (vtype, size) = (var.var_type(), var.size());
        let copy = if var.is_array() {
            Variable::new_array(&self.conn, var.allocated_elements(), vtype, size)?
        } else {
            Variable::new(&self.conn, var.allocated_elements(), vtype, size)?
        };
        copy.set_value(0, &var.get_value(0)?)?;
        Ok(copy)
    }

    /// Binds the variables of the bind table to the statement.
    pub(crate) fn perform_bind(&mut self) -> Result<()> {
        self.set_input_sizes = false;
        let stmt = self.handle.get();
        match &self.bind_vars {
            BindVars::None => {}
            BindVars::ByPos(vars) => {
                for (i, var) in vars.iter().enumerate() {
                    if let Some(var) = var {
                        var.lock().bind(stmt, None, i as u32 + 1)?;
                    }
                }
            }
            BindVars::ByName(vars) => {
                for (name, var) in vars {
                    if let Some(var) = var {
                        var.lock().bind(stmt, Some(name.as_str()), 0)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Stores the value the statement left in positional slot `pos` into an OUT argument.
    pub(crate) fn write_back_pos(&self, pos: usize, arg: &mut Arg) -> Result<()> {
        if let Arg::Out(dest) = arg {
            if let Some(var) = self.bind_vars.at(pos) {
                dest.set_from_sql(var.get_value(0)?)?;
            }
        }
        Ok(())
    }

    /// Stores the value of the named placeholder into an OUT argument.
    pub(crate) fn write_back_named(&self, name: &str, arg: &mut Arg) -> Result<()> {
        if let Arg::Out(dest) = arg {
            let name = name.trim_start_matches(':');
            let var = match self.bind_vars.named(name) {
                Some(var) => Some(var),
                None => self.bind_vars.named(&format!("{}##1", name)),
            };
            if let Some(var) = var {
                dest.set_from_sql(var.get_value(0)?)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_values() {
        let n = 5;
        let (value, null_type) = arg_value(&Arg::In(&n));
        assert_eq!(value, Value::Int32(5));
        assert_eq!(null_type, None);

        let none : Option<i64> = None;
        let (value, null_type) = arg_value(&Arg::In(&none));
        assert!(value.is_null());
        assert_eq!(null_type, Some(VariableType::Int64));

        let mut out = String::new();
        let (value, _) = arg_value(&Arg::Out(&mut out));
        assert_eq!(value, Value::Str(String::new()));

        let (value, null_type) = arg_value(&Arg::Typed(VariableType::DateTime, 0, Value::Null));
        assert!(value.is_null());
        assert_eq!(null_type, Some(VariableType::DateTime));
    }

    #[test]
    fn empty_table() {
        let table = BindVars::None;
        assert!(table.vars().is_empty());
        assert!(table.at(0).is_none());
        assert!(table.named("x").is_none());
        let table = BindVars::ByName(vec![("x".to_string(), None)]);
        assert!(table.named("x").is_none());
        assert!(table.vars().is_empty());
    }
}
