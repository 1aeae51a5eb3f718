/*!
Oracle database access through the Oracle Call Interface.

The OCI client library is loaded at run time, so the crate builds without an
Oracle client installed. A [`Connection`] executes statements through a
[`Cursor`]. Arguments are bound through typed [`Variable`]s that are created
on demand from host values, and query rows are fetched into define variables
as arrays of [`Value`]s.

# Example

```no_run
use goracle::{Connection, Value};

fn main() -> goracle::Result<()> {
    let conn = Connection::open("scott/tiger@//localhost:1521/orcl")?;
    let mut cursor = conn.new_cursor();
    cursor.execute(
        "SELECT ename, sal FROM emp WHERE deptno = :dept ORDER BY ename",
        &mut [(&20).into()],
    )?;
    while let Some(row) = cursor.fetch_one()? {
        if let [Value::Str(name), salary] = row.as_slice() {
            println!("{}: {}", name, salary);
        }
    }
    Ok(())
}
```
*/

#[macro_use]
mod err;
mod oci;
mod env;
mod dsn;
mod conn;
mod value;
mod var;
mod types;
mod lob;
mod cursor;
mod scan;
mod pool;
mod queue;

pub use err::{Error, Status, msg, is_bad_connection_code};
pub use env::{Environment, client_version, MAX_STRING_CHARS, MAX_BINARY_BYTES};
pub use dsn::{split_dsn, make_dsn};
pub use conn::{Connection, ConnectMode, NlsSettings, alter_session_statements, session_initializer};
pub use value::{Value, ToSql, FromSql, ToSqlOut, Arg};
pub use var::Variable;
pub use types::VariableType;
pub use lob::ExternalLobVar;
pub use cursor::{Cursor, RefCursor, StatementType, Rows, VariableDescription, call_build_statement};
pub use scan::{find_statement_vars, count_statement_vars};
pub use pool::Pool;
pub use queue::{Queue, Message, EnqOptions, DeqOptions, DeqMode, DeqNavigation, Visibility};

pub type Result<T> = std::result::Result<T, Error>;
