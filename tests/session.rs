mod common;

use goracle::*;
use std::thread;

#[test]
fn dsn_parts() {
    assert_eq!(split_dsn("scott/tiger@orcl"), ("scott".to_string(), "tiger".to_string(), "orcl".to_string()));
    assert_eq!(split_dsn("scott/p@ss@orcl"), ("scott".to_string(), "p@ss".to_string(), "orcl".to_string()));
    assert_eq!(split_dsn("scott"), ("scott".to_string(), String::new(), String::new()));
    assert_eq!(
        make_dsn("db", 1521, "", ""),
        "(DESCRIPTION=(ADDRESS_LIST=(ADDRESS=(PROTOCOL=TCP)(HOST=db)(PORT=1521)))(CONNECT_DATA=(SERVICE_NAME=)))"
    );
}

#[test]
fn check_client_version() -> Result<()> {
    if common::dsn().is_none() {
        return Ok(());
    }
    let (release, _, _, _, _) = client_version()?;
    assert!(release >= 11, "client release {}", release);
    Ok(())
}

#[test]
fn connect_and_ping() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    assert!(conn.is_connected());
    conn.ping()?;
    assert!(!conn.server_version()?.is_empty());
    let nls = conn.nls_settings()?;
    assert!(!nls.database.is_empty());

    conn.close()?;
    assert!(!conn.is_connected());
    let res = conn.ping();
    assert_eq!(res.err(), Some(Error::Interface(msg::NOT_CONNECTED.to_string())));
    Ok(())
}

#[test]
fn close_rolls_back_open_transaction() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    let mut cursor = conn.new_cursor();
    let _ = cursor.execute("DROP TABLE goracle_close", &mut []);
    cursor.execute("CREATE TABLE goracle_close (id NUMBER)", &mut [])?;
    cursor.execute("INSERT INTO goracle_close (id) VALUES (1)", &mut [])?;
    assert_eq!(cursor.row_count(), 1);
    drop(cursor);
    conn.close()?;

    let conn = common::connect()?.expect("second connection");
    let mut cursor = conn.new_cursor();
    cursor.execute("SELECT COUNT(*) FROM goracle_close", &mut [])?;
    let mut row = cursor.fetch_one()?.expect("one row");
    assert_eq!(i64::from_sql(row.remove(0))?, 0);
    cursor.execute("DROP TABLE goracle_close", &mut [])?;
    Ok(())
}

#[test]
fn failed_connect() -> Result<()> {
    let dbname = match std::env::var("DBNAME") { Ok(name) => name, Err(_) => return Ok(()) };
    let conn = Connection::new("goracle_nobody", "wrong password", &dbname)?;
    let err = conn.connect(ConnectMode::Default, false).err().expect("connection with invalid credentials");
    assert_eq!(err.code(), Some(1017));
    assert!(!conn.is_connected());
    Ok(())
}

#[test]
fn session_settings() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    let init = session_initializer(&[("NLS_DATE_FORMAT", "YYYY-MM-DD")]);
    init(&conn)?;

    let mut cursor = conn.new_cursor();
    cursor.execute("SELECT TO_CHAR(DATE '2001-02-03') FROM dual", &mut [])?;
    let row = cursor.fetch_one()?.expect("one row");
    assert_eq!(row[0].as_str(), Some("2001-02-03"));
    Ok(())
}

#[test]
fn pooled_connections() -> Result<()> {
    let dsn = match common::dsn() { Some(dsn) => dsn, None => return Ok(()) };
    let pool = Pool::new(&dsn);
    assert_eq!(pool.idle_count(), 0);

    let conn = pool.get()?;
    conn.ping()?;
    pool.put(conn);
    assert_eq!(pool.idle_count(), 1);

    let first = pool.get()?;
    assert_eq!(pool.idle_count(), 0);
    let second = pool.get()?;
    pool.put(first);
    pool.put(second);
    assert_eq!(pool.idle_count(), 2);
    Ok(())
}

#[test]
fn pool_shared_between_threads() -> Result<()> {
    let dsn = match common::dsn() { Some(dsn) => dsn, None => return Ok(()) };
    let pool = std::sync::Arc::new(Pool::new(&dsn));

    let workers : Vec<_> = (0..4).map(|n| {
        let pool = pool.clone();
        thread::spawn(move || -> Result<i64> {
            let conn = pool.get()?;
            let mut cursor = conn.new_cursor();
            cursor.execute("SELECT :1 * 2 FROM dual", &mut [Arg::In(&n)])?;
            let mut row = cursor.fetch_one()?.expect("one row");
            let doubled = i64::from_sql(row.remove(0))?;
            drop(cursor);
            pool.put(conn);
            Ok(doubled)
        })
    }).collect();

    for (n, handle) in (0..4i64).zip(workers) {
        assert_eq!(handle.join().expect("pool user thread")?, n * 2);
    }
    assert!(pool.idle_count() >= 1);
    Ok(())
}

/// Needs a RAW payload queue named by GORACLE_QUEUE.
#[test]
fn raw_queue() -> Result<()> {
    let queue_name = match std::env::var("GORACLE_QUEUE") { Ok(name) => name, Err(_) => return Ok(()) };
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    let mut queue = Queue::new(&conn, &queue_name, "")?;

    let mut options = queue.deq_options()?;
    options.wait = Some(0);
    options.navigation = DeqNavigation::FirstMsg;
    queue.set_deq_options(&options)?;
    let mut drain = vec![Message::default(); 16];
    while queue.dequeue(&mut drain)? > 0 {}

    let sent = vec![
        Message { raw: b"first".to_vec(), expiration: -1, ..Message::default() },
        Message { raw: b"second".to_vec(), expiration: -1, ..Message::default() },
    ];
    queue.enqueue(&sent)?;
    conn.commit()?;

    let mut received = vec![Message::default(); 3];
    let count = queue.dequeue(&mut received)?;
    assert_eq!(count, 2);
    assert_eq!(received[0].raw, b"first");
    assert_eq!(received[1].raw, b"second");
    conn.commit()?;
    queue.close();
    Ok(())
}
