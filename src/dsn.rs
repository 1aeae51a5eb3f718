//! Data source names

/**
Splits a `user/password@sid` data source name into its parts.

The SID part follows the last `@`, so passwords may contain `@`. The password
follows the first `/` of the remainder. Missing parts are returned as empty strings.

# Example

```
let (user, pass, sid) = goracle::split_dsn("scott/tiger@//db:1521/orcl");
assert_eq!(user, "scott");
assert_eq!(pass, "tiger");
assert_eq!(sid,  "//db:1521/orcl");
```
*/
pub fn split_dsn(dsn: &str) -> (String, String, String) {
    let (credentials, sid) = match dsn.rfind('@') {
        Some(i) => (&dsn[..i], &dsn[i + 1..]),
        None    => (dsn, ""),
    };
    let (username, password) = match credentials.find('/') {
        Some(i) => (&credentials[..i], &credentials[i + 1..]),
        None    => (credentials, ""),
    };
    (username.to_string(), password.to_string(), sid.to_string())
}

/**
Builds a TNS connect descriptor for a TCP address. When `sid` is empty the
descriptor names the service instead, even when `service_name` is empty too.

# Example

```
let dsn = goracle::make_dsn("localhost", 1521, "", "XEPDB1");
assert_eq!(dsn, "(DESCRIPTION=(ADDRESS_LIST=(ADDRESS=(PROTOCOL=TCP)(HOST=localhost)(PORT=1521)))(CONNECT_DATA=(SERVICE_NAME=XEPDB1)))");
```
*/
pub fn make_dsn(host: &str, port: u16, sid: &str, service_name: &str) -> String {
    if !sid.is_empty() {
        format!(
            "(DESCRIPTION=(ADDRESS_LIST=(ADDRESS=(PROTOCOL=TCP)(HOST={})(PORT={})))(CONNECT_DATA=(SID={})))",
            host, port, sid
        )
    } else {
        format!(
            "(DESCRIPTION=(ADDRESS_LIST=(ADDRESS=(PROTOCOL=TCP)(HOST={})(PORT={})))(CONNECT_DATA=(SERVICE_NAME={})))",
            host, port, service_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(dsn: &str) -> (String, String, String) {
        split_dsn(dsn)
    }

    fn parts(user: &str, pass: &str, sid: &str) -> (String, String, String) {
        (user.to_string(), pass.to_string(), sid.to_string())
    }

    #[test]
    fn splits_full_dsn() {
        assert_eq!(split("u/p@s"), parts("u", "p", "s"));
        assert_eq!(split("u/p"), parts("u", "p", ""));
        assert_eq!(split("u@s"), parts("u", "", "s"));
        assert_eq!(split("u"), parts("u", "", ""));
        assert_eq!(split(""), parts("", "", ""));
    }

    #[test]
    fn splits_on_last_at_and_first_slash() {
        assert_eq!(split("u/p@ss@w0rd@db"), parts("u", "p@ss@w0rd", "db"));
        assert_eq!(split("u/p/q@db"), parts("u", "p/q", "db"));
        assert_eq!(split("/@db"), parts("", "", "db"));
        assert_eq!(split("/p"), parts("", "p", ""));
        assert_eq!(split("u/p@"), parts("u", "p", ""));
    }

    #[test]
    fn keeps_descriptors_intact() {
        let sid = "(DESCRIPTION=(ADDRESS=(PROTOCOL=TCP)(HOST=h)(PORT=1521))(CONNECT_DATA=(SID=X)))";
        let dsn = format!("scott/tiger@{}", sid);
        assert_eq!(split(&dsn), parts("scott", "tiger", sid));
    }

    #[test]
    fn makes_sid_descriptor() {
        assert_eq!(
            make_dsn("h", 1521, "ORCL", ""),
            "(DESCRIPTION=(ADDRESS_LIST=(ADDRESS=(PROTOCOL=TCP)(HOST=h)(PORT=1521)))(CONNECT_DATA=(SID=ORCL)))"
        );
        // SID takes precedence
        assert_eq!(make_dsn("h", 1521, "ORCL", "svc"), make_dsn("h", 1521, "ORCL", ""));
    }

    #[test]
    fn makes_service_descriptor() {
        assert_eq!(
            make_dsn("db.example.com", 1522, "", "svc"),
            "(DESCRIPTION=(ADDRESS_LIST=(ADDRESS=(PROTOCOL=TCP)(HOST=db.example.com)(PORT=1522)))(CONNECT_DATA=(SERVICE_NAME=svc)))"
        );
        assert_eq!(
            make_dsn("h", 1, "", ""),
            "(DESCRIPTION=(ADDRESS_LIST=(ADDRESS=(PROTOCOL=TCP)(HOST=h)(PORT=1)))(CONNECT_DATA=(SERVICE_NAME=)))"
        );
    }
}
