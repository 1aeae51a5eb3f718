//! Stored procedure and function calls

use super::Cursor;
use crate::{Arg, Result, Value, VariableType};

/**
Builds the anonymous block that calls `name`, and the arguments in the order
of their placeholders. The return value, when given, takes the first
placeholder. Boolean arguments are compared with 1 so that they reach the
callee as PL/SQL BOOLEANs.

# Example

```
use goracle::{Arg, call_build_statement};

let args = [Arg::In(&1), Arg::In(&true)];
let kwargs = [("p_name", Arg::In(&"x"))];
let (sql, all) = call_build_statement("pkg.proc", None, &args, &kwargs);
assert_eq!(sql, "begin pkg.proc(:1, :2 = 1, p_name=>:3); end;");
assert_eq!(all.len(), 3);
```
*/
pub fn call_build_statement<'x, 'a>(
    name: &str,
    return_value: Option<&'x Arg<'a>>,
    args: &'x [Arg<'a>],
    kwargs: &'x [(&str, Arg<'a>)],
) -> (String, Vec<&'x Arg<'a>>) {
    let mut all = Vec::with_capacity(args.len() + kwargs.len() + 1);
    let mut sql = String::from("begin ");
    if let Some(ret) = return_value {
        all.push(ret);
        sql.push_str(":1 := ");
    }
    let mut params = Vec::with_capacity(args.len() + kwargs.len());
    for arg in args {
        all.push(arg);
        params.push(format!(":{}{}", all.len(), if arg.is_bool() { " = 1" } else { "" }));
    }
    for (key, arg) in kwargs {
        all.push(arg);
        params.push(format!("{}=>:{}{}", key, all.len(), if arg.is_bool() { " = 1" } else { "" }));
    }
    sql.push_str(name);
    sql.push('(');
    sql.push_str(&params.join(", "));
    sql.push_str("); end;");
    (sql, all)
}

impl Cursor {
    fn call<'a>(&mut self, return_value: Option<&Arg<'a>>, name: &str, args: &mut [Arg<'a>], kwargs: &mut [(&str, Arg<'a>)]) -> Result<()> {
        self.check_open()?;
        let (sql, all) = call_build_statement(name, return_value, args, kwargs);
        self.internal_prepare(&sql, None)?;
        if !all.is_empty() {
            self.set_bind_variables_by_pos(&all, 1, 0, false)?;
        }
        self.execute_prepared()?;

        let first = if return_value.is_some() { 1 } else { 0 };
        let first_kwarg = first + args.len();
        for (i, arg) in args.iter_mut().enumerate() {
            self.write_back_pos(first + i, arg)?;
        }
        for (i, (_, arg)) in kwargs.iter_mut().enumerate() {
            self.write_back_pos(first_kwarg + i, arg)?;
        }
        Ok(())
    }

    /**
    Calls a stored function and returns its result, which is received into a
    variable of `return_type`. OUT arguments are written back.
    */
    pub fn call_func<'a>(&mut self, name: &str, return_type: VariableType, args: &mut [Arg<'a>], kwargs: &mut [(&str, Arg<'a>)]) -> Result<Value> {
        let size = if return_type.is_variable_length() { return_type.default_size() } else { 0 };
        let ret = self.new_variable(1, return_type, size)?;
        let ret_arg = Arg::Var(ret.clone());
        self.call(Some(&ret_arg), name, args, kwargs)?;
        ret.get_value(0)
    }

    /**
    Calls a stored procedure. Returns the values of all positional and
    keyword arguments after the call, in call order.
    */
    pub fn call_proc<'a>(&mut self, name: &str, args: &mut [Arg<'a>], kwargs: &mut [(&str, Arg<'a>)]) -> Result<Vec<Value>> {
        self.call(None, name, args, kwargs)?;
        self.bind_vars.vars().iter().map(|var| var.get_value(0)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn procedure_without_arguments() {
        let args : [Arg; 0] = [];
        let kwargs : [(&str, Arg); 0] = [];
        let (sql, all) = call_build_statement("dbms_output.enable", None, &args, &kwargs);
        assert_eq!(sql, "begin dbms_output.enable(); end;");
        assert!(all.is_empty());
    }

    #[test]
    fn function_with_return_value() {
        let ret = Arg::Typed(VariableType::Int64, 0, Value::Null);
        let args = [Arg::In(&"a")];
        let kwargs = [("b", Arg::In(&2))];
        let (sql, all) = call_build_statement("f", Some(&ret), &args, &kwargs);
        assert_eq!(sql, "begin :1 := f(:2, b=>:3); end;");
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn boolean_keyword_argument() {
        let kwargs = [("flag", Arg::In(&false))];
        let (sql, _) = call_build_statement("p", None, &[], &kwargs);
        assert!(kwargs[0].1.is_bool());
        assert_eq!(sql, "begin p(flag=>:1 = 1); end;");
    }
}
