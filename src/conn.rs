//! User Session

use crate::{Cursor, Environment, Error, Result, FromSql, err::msg, oci::*};
use libc::c_void;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::sync::{Arc, atomic::{AtomicBool, Ordering}};

/// Name the driver reports to the server
const DRIVER_NAME : &str = "goracle";

/// Session authentication mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectMode {
    Default,
    SysDba,
    SysOper,
}

impl ConnectMode {
    fn oci_mode(self) -> u32 {
        match self {
            ConnectMode::Default => OCI_DEFAULT,
            ConnectMode::SysDba  => OCI_SYSDBA,
            ConnectMode::SysOper => OCI_SYSOPER,
        }
    }
}

impl Default for ConnectMode {
    fn default() -> Self {
        ConnectMode::Default
    }
}

/// Handles of an established session. Dropped (freed) in declaration order.
pub(crate) struct Session {
    usr: Handle<OCISession>,
    svc: Handle<OCISvcCtx>,
    srv: Handle<OCIServer>,
}

impl Session {
    pub(crate) fn svc_ptr(&self) -> *mut OCISvcCtx {
        self.svc.get()
    }

    /// Rolls back, ends the session and detaches from the server.
    /// Returns the first error, but always performs all three steps.
    fn end(self, env: &Environment) -> Result<()> {
        let err = env.err_ptr();
        let rc = unsafe { OCITransRollback(self.svc.get(), err, OCI_DEFAULT) };
        if let Err(error) = Error::check(err, rc, "Close[rollback]") {
            tracing::warn!(%error, "rollback before session end failed");
        }
        let ended = env.check_status(unsafe {
            OCISessionEnd(self.svc.get(), err, self.usr.get(), OCI_DEFAULT)
        }, "Close[end session]");
        let detached = env.check_status(unsafe {
            OCIServerDetach(self.srv.get(), err, OCI_DEFAULT)
        }, "Close[server detach]");
        ended.and(detached)
    }
}

pub(crate) struct ConnInner {
    env: Arc<Environment>,
    username: String,
    password: String,
    dsn: String,
    // all server round trips on the session are serialized by this mutex
    serial: Mutex<()>,
    session: RwLock<Option<Session>>,
    autocommit: AtomicBool,
    checked_out: AtomicBool,
}

impl Drop for ConnInner {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            if self.checked_out.load(Ordering::Relaxed) {
                tracing::warn!(dsn = self.dsn.as_str(), "pooled connection was dropped without being returned, closing it");
            } else {
                tracing::debug!(dsn = self.dsn.as_str(), "closing dropped connection");
            }
            if let Err(err) = session.end(&self.env) {
                tracing::warn!(error = %err, "failed to close connection");
            }
        }
    }
}

/**
Represents a connection (server attachment and user session) to the database.

`Connection` is a cheap handle: clones share the same session. Every server
round trip is serialized on the session, so a connection can be used from
several threads, although one cursor should be driven by one thread at a time.
*/
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnInner>,
}

impl Connection {
    /**
    Creates a new, not yet connected, connection object with its own environment.

    # Example

    ```no_run
    use goracle::{Connection, ConnectMode};

    let dbname = std::env::var("DBNAME").unwrap_or_default();
    let dbuser = std::env::var("DBUSER").unwrap_or_default();
    let dbpass = std::env::var("DBPASS").unwrap_or_default();

    let conn = Connection::new(&dbuser, &dbpass, &dbname)?;
    conn.connect(ConnectMode::Default, false)?;
    assert!(conn.is_connected());
    conn.close()?;
    # Ok::<(),goracle::Error>(())
    ```
    */
    pub fn new(username: &str, password: &str, dsn: &str) -> Result<Self> {
        let env = Arc::new(Environment::new()?);
        Ok(Self::with_environment(env, username, password, dsn))
    }

    /// Creates a new, not yet connected, connection object that uses the given environment.
    pub fn with_environment(env: Arc<Environment>, username: &str, password: &str, dsn: &str) -> Self {
        let inner = ConnInner {
            env,
            username: username.to_string(),
            password: password.to_string(),
            dsn: dsn.to_string(),
            serial: Mutex::new(()),
            session: RwLock::new(None),
            autocommit: AtomicBool::new(false),
            checked_out: AtomicBool::new(false),
        };
        Self { inner: Arc::new(inner) }
    }

    /**
    Splits `user/password@sid` and connects in the default mode.

    # Example

    ```no_run
    let dsn = std::env::var("GORACLE_DSN").unwrap_or_default();
    let conn = goracle::Connection::open(&dsn)?;
    conn.ping()?;
    # Ok::<(),goracle::Error>(())
    ```
    */
    pub fn open(dsn: &str) -> Result<Self> {
        let (username, password, sid) = crate::split_dsn(dsn);
        let conn = Self::new(&username, &password, &sid)?;
        conn.connect(ConnectMode::Default, false)?;
        Ok(conn)
    }

    /**
    Attaches to the server and begins the user session.

    Any existing session of this connection is ended first. External
    credentials are used when both the user name and the password are empty.
    When `twophase` is set the server handle gets the internal and external
    names that distributed transactions need.
    */
    pub fn connect(&self, mode: ConnectMode, twophase: bool) -> Result<()> {
        let inner = &*self.inner;
        let env = &*inner.env;
        let err = env.err_ptr();

        let _serial = inner.serial.lock();
        let mut current = inner.session.write();
        if let Some(session) = current.take() {
            if let Err(e) = session.end(env) {
                tracing::debug!(error = %e, "ending the previous session failed");
            }
        }

        let srv = Handle::<OCIServer>::new(env.env_ptr())?;
        env.check_status(unsafe {
            OCIServerAttach(srv.get(), err, inner.dsn.as_ptr(), inner.dsn.len() as i32, OCI_DEFAULT)
        }, "Connect[server attach]")?;

        let begin = || -> Result<(Handle<OCISvcCtx>, Handle<OCISession>)> {
            let svc = Handle::<OCISvcCtx>::new(env.env_ptr())?;
            svc.set_attr(OCI_ATTR_SERVER, srv.get(), err).map_err(|e| e.at("Connect[set server handle]"))?;

            if twophase {
                srv.set_attr(OCI_ATTR_INTERNAL_NAME, DRIVER_NAME, err).map_err(|e| e.at("Connect[set internal name]"))?;
                srv.set_attr(OCI_ATTR_EXTERNAL_NAME, DRIVER_NAME, err).map_err(|e| e.at("Connect[set external name]"))?;
            }

            let usr = Handle::<OCISession>::new(env.env_ptr())?;
            let mut credentials = OCI_CRED_EXT;
            if !inner.username.is_empty() {
                credentials = OCI_CRED_RDBMS;
                usr.set_attr(OCI_ATTR_USERNAME, inner.username.as_str(), err).map_err(|e| e.at("Connect[set user name]"))?;
            }
            if !inner.password.is_empty() {
                credentials = OCI_CRED_RDBMS;
                usr.set_attr(OCI_ATTR_PASSWORD, inner.password.as_str(), err).map_err(|e| e.at("Connect[set password]"))?;
            }
            if let Err(e) = usr.set_attr(OCI_ATTR_DRIVER_NAME, DRIVER_NAME, err) {
                tracing::debug!(error = %e, "cannot set the driver name");
            }
            svc.set_attr(OCI_ATTR_SESSION, usr.get(), err).map_err(|e| e.at("Connect[set session handle]"))?;

            env.check_status(unsafe {
                OCISessionBegin(svc.get(), err, usr.get(), credentials, mode.oci_mode() | OCI_STMT_CACHE)
            }, "Connect[begin session]")?;
            Ok((svc, usr))
        };

        match begin() {
            Ok((svc, usr)) => {
                tracing::debug!(dsn = inner.dsn.as_str(), user = inner.username.as_str(), ?mode, "connected");
                *current = Some(Session { usr, svc, srv });
                Ok(())
            }
            Err(e) => {
                unsafe {
                    OCIServerDetach(srv.get(), err, OCI_DEFAULT);
                }
                Err(e)
            }
        }
    }

    /// Reports whether the connection has an established session.
    pub fn is_connected(&self) -> bool {
        self.inner.session.read().is_some()
    }

    /**
    Rolls back any pending transaction, ends the session and detaches from the
    server. Closing a connection that is not connected is a no-op.
    */
    pub fn close(&self) -> Result<()> {
        let _serial = self.inner.serial.lock();
        let session = self.inner.session.write().take();
        match session {
            Some(session) => {
                tracing::debug!(dsn = self.inner.dsn.as_str(), "closing connection");
                session.end(&self.inner.env)
            }
            None => Ok(()),
        }
    }

    /// Commits the current transaction.
    pub fn commit(&self) -> Result<()> {
        self.with_session(|svc, env| {
            env.check_status(unsafe { OCITransCommit(svc, env.err_ptr(), OCI_DEFAULT) }, "Commit")
        })
    }

    /// Rolls back the current transaction.
    pub fn rollback(&self) -> Result<()> {
        self.with_session(|svc, env| {
            env.check_status(unsafe { OCITransRollback(svc, env.err_ptr(), OCI_DEFAULT) }, "Rollback")
        })
    }

    /// Makes a round trip to the server to confirm that the connection and the server are active.
    pub fn ping(&self) -> Result<()> {
        self.with_session(|svc, env| {
            env.check_status(unsafe { OCIPing(svc, env.err_ptr(), OCI_DEFAULT) }, "Ping")
        })
    }

    /**
    Asks the server to abort the currently executing call on this connection.

    This does not wait for the session to become idle, so it can be called from
    another thread while a statement is executing.
    */
    pub fn cancel(&self) -> Result<()> {
        let session = self.inner.session.read();
        match session.as_ref() {
            Some(session) => {
                let env = &*self.inner.env;
                env.check_status(unsafe { OCIBreak(session.svc_ptr() as *mut c_void, env.err_ptr()) }, "Cancel")
            }
            None => Ok(()),
        }
    }

    /// Returns the server's version banner.
    pub fn server_version(&self) -> Result<String> {
        self.with_session(|svc, env| {
            let mut buf = [0u8; 512];
            env.check_status(unsafe {
                OCIServerVersion(svc as *mut c_void, env.err_ptr(), buf.as_mut_ptr(), buf.len() as u32, OCI_HTYPE_SVCCTX_UB1)
            }, "ServerVersion")?;
            Ok(crate::env::c_buf_to_string(&buf))
        })
    }

    /// Creates a new cursor on this connection.
    pub fn new_cursor(&self) -> Cursor {
        Cursor::new(self)
    }

    /// Whether statements are committed as they are executed.
    pub fn autocommit(&self) -> bool {
        self.inner.autocommit.load(Ordering::Relaxed)
    }

    pub fn set_autocommit(&self, autocommit: bool) {
        self.inner.autocommit.store(autocommit, Ordering::Relaxed)
    }

    pub fn username(&self) -> &str {
        &self.inner.username
    }

    pub fn dsn(&self) -> &str {
        &self.inner.dsn
    }

    pub fn environment(&self) -> &Environment {
        &self.inner.env
    }

    /**
    Retrieves the NLS settings: the client character set, the session
    language (`LANGUAGE_TERRITORY.CHARSET`) and the database language built
    the same way from `nls_database_parameters`.
    */
    pub fn nls_settings(&self) -> Result<NlsSettings> {
        let mut cur = self.new_cursor();

        cur.execute("SELECT USERENV('language') FROM DUAL", &mut [])?;
        let client = match cur.fetch_one()? {
            Some(row) => String::from_sql(row.into_iter().next().unwrap_or_default())?,
            None => String::new(),
        };

        cur.execute(
            "SELECT parameter, value FROM nls_database_parameters
              WHERE parameter IN ('NLS_TERRITORY', 'NLS_LANGUAGE', 'NLS_CHARACTERSET')",
            &mut []
        )?;
        let mut language = String::new();
        let mut territory = String::new();
        let mut charset = String::new();
        while let Some(row) = cur.fetch_one()? {
            let mut cols = row.into_iter();
            let name  = String::from_sql(cols.next().unwrap_or_default())?;
            let value = String::from_sql(cols.next().unwrap_or_default())?;
            match name.as_str() {
                "NLS_LANGUAGE"     => language = value,
                "NLS_TERRITORY"    => territory = value,
                "NLS_CHARACTERSET" => charset = value,
                _ => {}
            }
        }
        cur.close()?;

        Ok(NlsSettings {
            oci: self.inner.env.encoding().to_string(),
            client,
            database: format!("{}_{}.{}", language, territory, charset),
        })
    }

    pub(crate) fn env(&self) -> &Arc<Environment> {
        &self.inner.env
    }

    /// Runs a server round trip: takes the serialization lock, then calls `f`
    /// with the service context.
    pub(crate) fn with_session<R>(&self, f: impl FnOnce(*mut OCISvcCtx, &Environment) -> Result<R>) -> Result<R> {
        let _serial = self.inner.serial.lock();
        let session = self.inner.session.read();
        match session.as_ref() {
            Some(session) => f(session.svc_ptr(), &self.inner.env),
            None => Err(Error::new(msg::NOT_CONNECTED)),
        }
    }

    /// Returns the service context without taking the serialization lock.
    /// Used for calls that do not make a round trip.
    pub(crate) fn svc_ptr(&self) -> Result<*mut OCISvcCtx> {
        match self.inner.session.read().as_ref() {
            Some(session) => Ok(session.svc_ptr()),
            None => Err(Error::new(msg::NOT_CONNECTED)),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.inner.serial.lock()
    }

    pub(crate) fn set_checked_out(&self, checked_out: bool) {
        self.inner.checked_out.store(checked_out, Ordering::Relaxed)
    }

    pub(crate) fn same_as(&self, other: &Connection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("user", &self.inner.username)
            .field("dsn", &self.inner.dsn)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// NLS settings of a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NlsSettings {
    /// IANA name of the client (OCI) character set
    pub oci: String,
    /// Session language as `LANGUAGE_TERRITORY.CHARSET`
    pub client: String,
    /// Database language as `LANGUAGE_TERRITORY.CHARSET`
    pub database: String,
}

/// Builds the `ALTER SESSION` statements that set the given parameters.
/// Parameters are applied in name order. Single quotes in values are doubled.
pub fn alter_session_statements<K, V>(params: &[(K, V)]) -> Vec<String>
where K: AsRef<str>, V: AsRef<str>
{
    let mut params : Vec<(&str, &str)> = params.iter().map(|(k, v)| (k.as_ref(), v.as_ref())).collect();
    params.sort_by(|a, b| a.0.cmp(b.0));
    params.into_iter()
        .map(|(name, value)| format!("ALTER SESSION SET {} = '{}'", name, value.replace('\'', "''")))
        .collect()
}

/**
Returns a callback that applies the session parameters to a fresh connection,
suitable for [`Pool::with_initializer`](crate::Pool::with_initializer).

# Example

```no_run
let init = goracle::session_initializer(&[("NLS_DATE_FORMAT", "YYYY-MM-DD")]);
let conn = goracle::Connection::open("scott/tiger@orcl")?;
init(&conn)?;
# Ok::<(),goracle::Error>(())
```
*/
pub fn session_initializer<K, V>(params: &[(K, V)]) -> impl Fn(&Connection) -> Result<()> + Send + Sync + 'static
where K: AsRef<str>, V: AsRef<str>
{
    let statements = alter_session_statements(params);
    move |conn: &Connection| {
        let mut cur = conn.new_cursor();
        for stmt in statements.iter() {
            tracing::trace!(sql = stmt.as_str(), "initializing session");
            cur.execute(stmt, &mut [])?;
        }
        cur.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alter_session() {
        let stmts = alter_session_statements(&[
            ("NLS_NUMERIC_CHARACTERS", ".,"),
            ("NLS_DATE_FORMAT", "YYYY-MM-DD\"T\"HH24:MI:SS"),
            ("NLS_LANGUAGE", "it's"),
        ]);
        assert_eq!(stmts, vec![
            "ALTER SESSION SET NLS_DATE_FORMAT = 'YYYY-MM-DD\"T\"HH24:MI:SS'".to_string(),
            "ALTER SESSION SET NLS_LANGUAGE = 'it''s'".to_string(),
            "ALTER SESSION SET NLS_NUMERIC_CHARACTERS = '.,'".to_string(),
        ]);
        let empty : [(&str, &str); 0] = [];
        assert!(alter_session_statements(&empty).is_empty());
    }

    #[test]
    fn connect_modes() {
        assert_eq!(ConnectMode::default(), ConnectMode::Default);
        assert_eq!(ConnectMode::Default.oci_mode(), 0);
        assert_eq!(ConnectMode::SysDba.oci_mode(), 2);
        assert_eq!(ConnectMode::SysOper.oci_mode(), 4);
    }
}
