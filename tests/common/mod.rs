use goracle::{Connection, ConnectMode, Result};

/// Connects with the DBNAME, DBUSER and DBPASS credentials. Returns `None`
/// when they are not set, so tests can be skipped on machines without a database.
pub fn connect() -> Result<Option<Connection>> {
    let (dbname, dbuser, dbpass) = match (std::env::var("DBNAME"), std::env::var("DBUSER"), std::env::var("DBPASS")) {
        (Ok(dbname), Ok(dbuser), Ok(dbpass)) => (dbname, dbuser, dbpass),
        _ => return Ok(None),
    };
    let conn = Connection::new(&dbuser, &dbpass, &dbname)?;
    conn.connect(ConnectMode::Default, false)?;
    Ok(Some(conn))
}

#[allow(dead_code)]
pub fn dsn() -> Option<String> {
    let dbname = std::env::var("DBNAME").ok()?;
    let dbuser = std::env::var("DBUSER").ok()?;
    let dbpass = std::env::var("DBPASS").ok()?;
    Some(format!("{}/{}@{}", dbuser, dbpass, dbname))
}
