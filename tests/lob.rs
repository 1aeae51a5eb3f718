mod common;

use goracle::*;
use std::{io::Read, thread};

#[test]
fn clob_round_trip() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    let mut cursor = conn.new_cursor();

    let text = "0123456789abcdef".repeat(500);
    assert_eq!(text.len(), 8000);
    cursor.execute("SELECT :1 FROM dual", &mut [Arg::Typed(VariableType::Clob, 0, Value::Str(text.clone()))])?;
    let mut row = cursor.fetch_one()?.expect("one row");
    let lob = ExternalLobVar::from_sql(row.remove(0))?;
    assert_eq!(lob.var_type(), VariableType::Clob);
    assert_eq!(lob.size(true)?, 8000);

    let data = lob.read_all()?;
    assert_eq!(data.len(), 8000);
    assert_eq!(std::str::from_utf8(&data).ok(), Some(text.as_str()));

    let mut head = [0u8; 16];
    assert_eq!(lob.read_at(&mut head, 0)?, 16);
    assert_eq!(&head, b"0123456789abcdef");
    Ok(())
}

#[test]
fn streamed_read() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    let mut cursor = conn.new_cursor();
    cursor.execute("SELECT TO_CLOB(RPAD('x', 3000, 'x')) FROM dual", &mut [])?;
    let mut row = cursor.fetch_one()?.expect("one row");
    let mut lob = ExternalLobVar::from_sql(row.remove(0))?;
    let mut text = String::new();
    lob.read_to_string(&mut text).map_err(|err| Error::Interface(err.to_string()))?;
    assert_eq!(text.len(), 3000);
    assert!(text.chars().all(|c| c == 'x'));
    Ok(())
}

#[test]
fn stale_locator_is_rejected() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    let mut cursor = conn.new_cursor();
    cursor.set_array_size(1);
    cursor.execute("SELECT TO_CLOB('row ' || level) FROM dual CONNECT BY level <= 2", &mut [])?;

    let mut first = cursor.fetch_one()?.expect("first row");
    let first = ExternalLobVar::from_sql(first.remove(0))?;
    assert_eq!(first.read_all()?, b"row 1");

    let mut second = cursor.fetch_one()?.expect("second row");
    let second = ExternalLobVar::from_sql(second.remove(0))?;
    assert_eq!(second.read_all()?, b"row 2");

    assert_eq!(first.read_all().err(), Some(Error::Interface(msg::LOB_NO_LONGER_VALID.to_string())));
    Ok(())
}

#[test]
fn concurrent_readers_on_one_connection() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };

    let workers : Vec<_> = (1..=8usize).map(|n| {
        let conn = conn.clone();
        thread::spawn(move || -> Result<usize> {
            let mut cursor = conn.new_cursor();
            cursor.execute("SELECT TO_CLOB(RPAD('y', :1, 'y')) FROM dual", &mut [Arg::In(&(n * 500))])?;
            let mut row = cursor.fetch_one()?.expect("one row");
            let text = String::from_sql(row.remove(0))?;
            Ok(text.len())
        })
    }).collect();

    for (n, handle) in (1..=8usize).zip(workers) {
        let len = handle.join().expect("reader thread")?;
        assert_eq!(len, n * 500);
    }
    Ok(())
}
