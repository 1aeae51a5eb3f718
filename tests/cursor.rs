mod common;

use goracle::*;

#[test]
fn select_bound_primitives() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    let mut cursor = conn.new_cursor();

    cursor.execute("SELECT :1, :2, :3 FROM dual", &mut [Arg::In(&42), Arg::In(&1.5), Arg::In(&"text")])?;
    let row = cursor.fetch_one()?.expect("one row");
    assert_eq!(row.len(), 3);
    let mut row = row.into_iter();
    assert_eq!(i64::from_sql(row.next().unwrap())?, 42);
    assert_eq!(f64::from_sql(row.next().unwrap())?, 1.5);
    assert_eq!(String::from_sql(row.next().unwrap())?, "text");
    assert!(cursor.fetch_one()?.is_none());

    let none : Option<i64> = None;
    cursor.execute("SELECT :1 FROM dual", &mut [Arg::In(&none)])?;
    let row = cursor.fetch_one()?.expect("one row");
    assert!(row[0].is_null());
    Ok(())
}

#[test]
fn dates() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    let mut cursor = conn.new_cursor();

    let mut now = chrono::NaiveDate::from_ymd_opt(1970, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    cursor.execute("BEGIN :1 := SYSDATE; END;", &mut [Arg::Out(&mut now)])?;
    assert!(now > chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap());

    cursor.execute("SELECT TO_DATE('2012-02-29 13:45:10', 'YYYY-MM-DD HH24:MI:SS') FROM dual", &mut [])?;
    let row = cursor.fetch_one()?.expect("one row");
    let expected = chrono::NaiveDate::from_ymd_opt(2012, 2, 29).unwrap().and_hms_opt(13, 45, 10).unwrap();
    assert_eq!(row[0], Value::DateTime(expected));
    Ok(())
}

#[test]
fn multilingual_text() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    if !conn.nls_settings()?.database.ends_with("AL32UTF8") {
        return Ok(());
    }
    let mut cursor = conn.new_cursor();
    let _ = cursor.execute("DROP TABLE goracle_rooms", &mut []);
    cursor.execute("CREATE TABLE goracle_rooms (id NUMBER(3), name VARCHAR2(255))", &mut [])?;

    let names = ["Habitación doble", "雙人房", "двухместный номер"];
    for (id, name) in names.iter().enumerate() {
        cursor.execute("INSERT INTO goracle_rooms (id, name) VALUES (:1, :2)", &mut [Arg::In(&id), Arg::In(name)])?;
        assert_eq!(cursor.row_count(), 1);
    }

    cursor.execute("SELECT name FROM goracle_rooms ORDER BY id", &mut [])?;
    let rows = cursor.fetch_all()?;
    let fetched = rows.into_iter().map(|mut row| String::from_sql(row.remove(0))).collect::<Result<Vec<_>>>()?;
    assert_eq!(fetched.len(), names.len());
    for (got, expected) in fetched.iter().zip(names.iter()) {
        assert_eq!(got.as_bytes(), expected.as_bytes());
    }

    conn.rollback()?;
    cursor.execute("DROP TABLE goracle_rooms", &mut [])?;
    Ok(())
}

#[test]
fn row_accounting() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    let mut cursor = conn.new_cursor();
    cursor.set_array_size(4);

    cursor.execute("SELECT level FROM dual CONNECT BY level <= 10", &mut [])?;
    assert_eq!(cursor.statement_type(), Some(StatementType::Select));
    assert_eq!(cursor.row_count(), 0);

    let rows = cursor.fetch_many(3)?;
    assert_eq!(rows.len(), 3);
    assert_eq!(cursor.row_count(), 3);
    let levels = rows.into_iter().map(|mut row| i64::from_sql(row.remove(0))).collect::<Result<Vec<_>>>()?;
    assert_eq!(levels, vec![1, 2, 3]);

    let rest = cursor.fetch_all()?;
    assert_eq!(rest.len(), 7);
    assert_eq!(cursor.row_count(), 10);
    assert!(cursor.fetch_many(-1)?.is_empty());
    Ok(())
}

#[test]
fn rows_iterator_and_description() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    let mut cursor = conn.new_cursor();
    cursor.execute("SELECT level AS num, 'x' || level AS name FROM dual CONNECT BY level <= 5", &mut [])?;

    let desc = cursor.description()?;
    assert_eq!(desc.len(), 2);
    assert_eq!(desc[0].name, "NUM");
    assert_eq!(desc[1].name, "NAME");

    let mut names = Vec::new();
    for row in cursor.rows() {
        let mut row = row?;
        names.push(String::from_sql(row.remove(1))?);
    }
    assert_eq!(names, vec!["x1", "x2", "x3", "x4", "x5"]);
    Ok(())
}

#[test]
fn fetch_into_host_values() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    let mut cursor = conn.new_cursor();
    cursor.execute("SELECT 7, 'seven' FROM dual", &mut [])?;

    let mut num = 0i32;
    let mut name = String::new();
    {
        let mut dest : [&mut dyn ToSqlOut; 2] = [&mut num, &mut name];
        assert!(cursor.fetch_one_into(&mut dest)?);
        assert!(!cursor.fetch_one_into(&mut dest)?);
    }
    assert_eq!(num, 7);
    assert_eq!(name, "seven");
    Ok(())
}

#[test]
fn named_out_arguments() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    let mut cursor = conn.new_cursor();

    let mut sum = 0i64;
    cursor.execute_named(
        "BEGIN :sum := :a + :b; END;",
        &mut [("sum", Arg::Out(&mut sum)), ("a", Arg::In(&40)), ("b", Arg::In(&2))],
    )?;
    assert_eq!(sum, 42);

    let mut greeting = String::new();
    cursor.set_bypass_multiple_args(true);
    cursor.execute_named(
        "BEGIN :greeting := :name || ' and ' || :name; END;",
        &mut [("greeting", Arg::Out(&mut greeting)), ("name", Arg::In(&"Tom"))],
    )?;
    assert_eq!(greeting, "Tom and Tom");
    Ok(())
}

#[test]
fn missing_bind_is_reported() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    let mut cursor = conn.new_cursor();
    let res = cursor.execute_named("SELECT :a, :b FROM dual", &mut [("a", Arg::In(&1))]);
    match res {
        Err(err) => {
            assert_eq!(err.code(), Some(1008));
            assert!(err.to_string().contains("missing: [B]"), "{}", err);
        }
        Ok(()) => panic!("statement with an unbound placeholder executed"),
    }
    Ok(())
}

#[test]
fn stored_calls() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    let mut cursor = conn.new_cursor();

    let lower = cursor.call_func("lower", VariableType::String, &mut [Arg::In(&"ABC")], &mut [])?;
    assert_eq!(lower.as_str(), Some("abc"));

    let values = cursor.call_proc("dbms_output.put_line", &mut [], &mut [("a", Arg::In(&"hello"))])?;
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].as_str(), Some("hello"));
    Ok(())
}

#[test]
fn execute_many_rows() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    let mut cursor = conn.new_cursor();
    let _ = cursor.execute("DROP TABLE goracle_many", &mut []);
    cursor.execute("CREATE TABLE goracle_many (id NUMBER, name VARCHAR2(20))", &mut [])?;
    assert!(cursor.is_ddl());

    let rows = vec![
        vec![("id", Value::Int32(1)), ("name", Value::Null)],
        vec![("id", Value::Int32(2)), ("name", Value::Str("two".to_string()))],
        vec![("id", Value::Int32(3)), ("name", Value::Str("three".to_string()))],
    ];
    cursor.execute_many("INSERT INTO goracle_many (id, name) VALUES (:id, :name)", &rows)?;
    assert_eq!(cursor.row_count(), 3);

    cursor.execute("SELECT name FROM goracle_many ORDER BY id", &mut [])?;
    let names = cursor.fetch_all()?;
    assert_eq!(names.len(), 3);
    assert!(names[0][0].is_null());
    assert_eq!(names[2][0].as_str(), Some("three"));

    let res = cursor.execute_many("SELECT * FROM goracle_many", &rows);
    assert_eq!(res.err(), Some(Error::Interface(msg::QUERIES_NOT_SUPPORTED.to_string())));

    conn.rollback()?;
    cursor.execute("DROP TABLE goracle_many", &mut [])?;
    Ok(())
}

#[test]
fn execute_many_omitted_names_are_null() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    let mut cursor = conn.new_cursor();
    let _ = cursor.execute("DROP TABLE goracle_omitted", &mut []);
    cursor.execute("CREATE TABLE goracle_omitted (id NUMBER, name VARCHAR2(20))", &mut [])?;

    let insert = "INSERT INTO goracle_omitted (id, name) VALUES (:id, :name)";
    cursor.execute_many(insert, &[vec![("id", Value::Int32(1)), ("name", Value::Str("a".to_string()))]])?;
    cursor.execute_many(insert, &[vec![("id", Value::Int32(2))]])?;
    cursor.execute_many(insert, &[
        vec![("id", Value::Int32(3))],
        vec![("id", Value::Int32(4)), ("name", Value::Str("d".to_string()))],
        vec![("id", Value::Int32(5))],
    ])?;
    assert_eq!(cursor.row_count(), 3);

    cursor.execute("SELECT name FROM goracle_omitted ORDER BY id", &mut [])?;
    let names = cursor.fetch_all()?;
    assert_eq!(names.len(), 5);
    assert_eq!(names[0][0].as_str(), Some("a"));
    assert!(names[1][0].is_null());
    assert!(names[2][0].is_null());
    assert_eq!(names[3][0].as_str(), Some("d"));
    assert!(names[4][0].is_null());

    conn.rollback()?;
    cursor.execute("DROP TABLE goracle_omitted", &mut [])?;
    Ok(())
}

#[test]
fn row_count_survives_other_statements() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    let mut cursor = conn.new_cursor();
    cursor.execute("SELECT level FROM dual CONNECT BY level <= 3", &mut [])?;
    assert_eq!(cursor.fetch_all()?.len(), 3);
    assert_eq!(cursor.row_count(), 3);

    cursor.execute("BEGIN NULL; END;", &mut [])?;
    assert_eq!(cursor.row_count(), 3);
    Ok(())
}

#[test]
fn fetched_integer_columns() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    let mut cursor = conn.new_cursor();
    cursor.execute("SELECT CAST(12345 AS NUMBER(5)), CAST(12345678901 AS NUMBER(12)) FROM dual", &mut [])?;
    let row = cursor.fetch_one()?.expect("one row");
    assert!(matches!(row[0], Value::Int32(12345)));
    assert!(matches!(row[1], Value::Int64(12345678901)));
    Ok(())
}

#[test]
fn execute_many_rejects_queries() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    let mut cursor = conn.new_cursor();
    let rows = vec![vec![("id", Value::Int32(1))]];
    let res = cursor.execute_many("SELECT :id FROM dual", &rows);
    assert_eq!(res.err(), Some(Error::Interface(msg::QUERIES_NOT_SUPPORTED.to_string())));
    Ok(())
}

#[test]
fn close_is_idempotent() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    let mut cursor = conn.new_cursor();
    cursor.execute("SELECT 1 FROM dual", &mut [])?;
    cursor.close()?;
    cursor.close()?;
    assert!(!cursor.is_open());
    let res = cursor.execute("SELECT 1 FROM dual", &mut []);
    assert_eq!(res.err(), Some(Error::Interface(msg::CURSOR_IS_CLOSED.to_string())));
    Ok(())
}

#[test]
fn ref_cursor_out_argument() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    let mut cursor = conn.new_cursor();
    let child = cursor.new_variable(1, VariableType::Cursor, 0)?;
    cursor.execute(
        "BEGIN OPEN :1 FOR SELECT level FROM dual CONNECT BY level <= 3; END;",
        &mut [Arg::Var(child.clone())],
    )?;
    let child = RefCursor::from_sql(child.get_value(0)?)?;
    let rows = child.lock().fetch_all()?;
    assert_eq!(rows.len(), 3);
    Ok(())
}

#[test]
fn bound_subquery() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    let mut cursor = conn.new_cursor();
    cursor.execute("
        SELECT b.object_id, a.rn
          FROM all_objects b, (SELECT :1 rn FROM dual) a
         WHERE ROWNUM < GREATEST(2, a.rn)
    ", &mut [Arg::In(&2)])?;
    let rows = cursor.fetch_many(3)?;
    assert_eq!(rows.len(), 1);
    assert_eq!(i64::from_sql(rows[0][1].clone())?, 2);
    Ok(())
}

#[test]
fn interval_fetch() -> Result<()> {
    let conn = match common::connect()? { Some(conn) => conn, None => return Ok(()) };
    let mut cursor = conn.new_cursor();
    cursor.execute("SELECT TO_DSINTERVAL('2 10:20:30.456') FROM dual", &mut [])?;
    let row = cursor.fetch_one()?.expect("one row");
    let expected = chrono::Duration::days(2) + chrono::Duration::hours(10) + chrono::Duration::minutes(20)
        + chrono::Duration::seconds(30) + chrono::Duration::milliseconds(456);
    assert_eq!(row[0], Value::Interval(expected));
    Ok(())
}
