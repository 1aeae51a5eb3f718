//! Process-local connection pool

use crate::{Connection, ConnectMode, Environment, Result, split_dsn};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::Arc;

type Initializer = Box<dyn Fn(&Connection) -> Result<()> + Send + Sync>;

/**
A LIFO cache of connections to one database as one user.

Connections taken with [`get`](Pool::get) are returned with
[`put`](Pool::put), which rolls back any open transaction. A connection that
is dropped instead of being returned closes its session and logs a warning.

# Example

```no_run
# fn main() -> goracle::Result<()> {
let pool = goracle::Pool::new("scott/tiger@orcl")
    .with_initializer(goracle::session_initializer(&[("NLS_DATE_FORMAT", "YYYY-MM-DD")]));
let conn = pool.get()?;
conn.ping()?;
pool.put(conn);
# Ok(()) }
```
*/
pub struct Pool {
    username: String,
    password: String,
    dsn: String,
    env: OnceCell<Arc<Environment>>,
    idle: Mutex<Vec<Connection>>,
    initializer: Option<Initializer>,
}

impl Pool {
    /// Creates an empty pool for `user/password@sid`.
    pub fn new(dsn: &str) -> Self {
        let (username, password, dsn) = split_dsn(dsn);
        Self {
            username, password, dsn,
            env: OnceCell::new(),
            idle: Mutex::new(Vec::new()),
            initializer: None,
        }
    }

    /// Sets a callback that runs on every newly opened connection.
    pub fn with_initializer(mut self, init: impl Fn(&Connection) -> Result<()> + Send + Sync + 'static) -> Self {
        self.initializer = Some(Box::new(init));
        self
    }

    fn open(&self) -> Result<Connection> {
        let env = self.env.get_or_try_init(|| Environment::new().map(Arc::new))?;
        let conn = Connection::with_environment(env.clone(), &self.username, &self.password, &self.dsn);
        conn.connect(ConnectMode::Default, false)?;
        if let Some(init) = &self.initializer {
            init(&conn)?;
        }
        tracing::debug!(dsn = self.dsn.as_str(), user = self.username.as_str(), "opened pooled connection");
        Ok(conn)
    }

    /// Returns the most recently returned idle connection, or opens a new one.
    pub fn get(&self) -> Result<Connection> {
        let conn = loop {
            let idle = self.idle.lock().pop();
            match idle {
                Some(conn) if conn.is_connected() => break conn,
                Some(_) => continue,
                None => break self.open()?,
            }
        };
        conn.set_checked_out(true);
        Ok(conn)
    }

    /**
    Returns a connection to the pool. The open transaction is rolled back;
    connections that are closed, or that cannot be rolled back, are dropped.
    */
    pub fn put(&self, conn: Connection) {
        conn.set_checked_out(false);
        if !conn.is_connected() {
            return;
        }
        if let Err(err) = conn.rollback() {
            tracing::warn!(%err, "rollback of a returned connection failed, closing it");
            if let Err(err) = conn.close() {
                tracing::warn!(%err, "failed to close connection");
            }
            return;
        }
        self.idle.lock().push(conn);
    }

    /// Number of idle connections.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("user", &self.username)
            .field("dsn", &self.dsn)
            .field("idle", &self.idle_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_pool_is_empty() {
        let pool = Pool::new("scott/tiger@orcl");
        assert_eq!(pool.username, "scott");
        assert_eq!(pool.password, "tiger");
        assert_eq!(pool.dsn, "orcl");
        assert_eq!(pool.idle_count(), 0);
    }
}
