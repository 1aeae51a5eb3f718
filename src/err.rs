//! Driver errors

use crate::oci::*;
use libc::c_void;
use std::{ptr, fmt, io, ffi::CStr};
use thiserror::Error;

const OCI_ERROR_MAXMSG_SIZE : usize = 3072;

/// Messages of the errors that the driver itself raises.
pub mod msg {
    pub const CURSOR_IS_CLOSED          : &str = "cursor is closed";
    pub const QUERIES_NOT_SUPPORTED     : &str = "queries not supported: results undefined";
    pub const LIST_IS_EMPTY             : &str = "list is empty";
    pub const ROWS_EXCEED_ARRAY_SIZE    : &str = "rows to fetch exceeds array size";
    pub const ITERS_EXCEED_BIND_SIZE    : &str = "iterations exceed bind array size";
    pub const NOT_A_QUERY               : &str = "not a query";
    pub const NOT_A_VAR_CREATOR         : &str = "stmt must be a varCreator";
    pub const NOT_CONNECTED             : &str = "not connected";
    pub const ARRAY_SIZE_EXCEEDED       : &str = "array size exceeded";
    pub const ARRAY_TOO_LARGE           : &str = "array too large";
    pub const NO_ARRAYS                 : &str = "type does not support arrays";
    pub const NO_NESTED_ARRAYS          : &str = "arrays of arrays are not supported by the OCI";
    pub const NO_COPY                   : &str = "variable does not support copying";
    pub const INSUFFICIENT_SPACE        : &str = "target variable has insufficient space to copy source data";
    pub const STRING_TOO_LARGE          : &str = "string data too large";
    pub const BINARY_TOO_LARGE          : &str = "binary data too large";
    pub const BFILE_READ_ONLY           : &str = "BFILEs are read only";
    pub const LOB_NO_LONGER_VALID       : &str = "LOB variable no longer valid after subsequent fetch";
    pub const QUERY_NOT_EXECUTED        : &str = "query not executed";
    pub const NO_STATEMENT              : &str = "no statement specified and no prior statement prepared";
    pub const NOT_PREPARED              : &str = "statement must be prepared first";
}

/// Outcome of an OCI call that is neither success nor an Oracle error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Warning,
    NeedData,
    NoDataFound,
    StillExecuting,
    Continue,
    InvalidHandle,
    Other(i32),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Status::Warning         => f.write_str("warning"),
            Status::NeedData        => f.write_str("need data"),
            Status::NoDataFound     => f.write_str("no data found"),
            Status::StillExecuting  => f.write_str("still executing"),
            Status::Continue        => f.write_str("continue"),
            Status::InvalidHandle   => f.write_str("invalid handle"),
            Status::Other(code)     => write!(f, "unknown OCI status {}", code),
        }
    }
}

/// Represents possible errors returned from the driver
#[derive(Error, Debug)]
pub enum Error {
    /// Error reported by the Oracle client or server
    #[error("{}", oracle_message(.message, .site, .offset))]
    Oracle {
        code: i32,
        message: String,
        site: String,
        offset: u32,
    },

    /// Non-error OCI status surfaced as a sentinel
    #[error("{0}")]
    Status(Status),

    /// Error raised by the driver itself
    #[error("{0}")]
    Interface(String),
}

fn oracle_message(message: &str, site: &str, offset: &u32) -> String {
    let mut text = if site.is_empty() {
        message.to_string()
    } else {
        format!("{}: {}", site, message)
    };
    if *offset > 0 {
        text.push_str(&format!(" (at offset {})", offset));
    }
    text
}

impl PartialEq for Error {
    fn eq(&self, other: &Error) -> bool {
        match (self, other) {
            (Error::Oracle { code: this_code, .. }, Error::Oracle { code: other_code, .. }) => this_code == other_code,
            (Error::Status(this), Error::Status(other)) => this == other,
            (Error::Interface(this_msg), Error::Interface(other_msg)) => this_msg == other_msg,
            _ => false,
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        io::Error::new(io::ErrorKind::Other, err)
    }
}

/// Oracle error codes that mean the session is unusable.
const BAD_CONNECTION_CODES : [i32; 25] = [
    115, 451, 452, 609, 1090, 1092, 1073, 3113, 3114, 3135, 3136,
    12153, 12161, 12170, 12224, 12230, 12233, 12510, 12511, 12514,
    12518, 12526, 12527, 12528, 12539,
];

/// Reports whether the Oracle error code indicates a broken connection.
pub fn is_bad_connection_code(code: i32) -> bool {
    BAD_CONNECTION_CODES.contains(&code)
}

/// Reads every diagnostic record from an error (or environment) handle.
/// Returns the code of the first record and the messages of all of them.
fn drain_errors(rc: i32, errhp: *mut c_void, htype: u32) -> (i32, String) {
    let mut code = 0;
    let mut messages = Vec::new();
    let mut buf : Vec<u8> = vec![0; OCI_ERROR_MAXMSG_SIZE];
    let mut recordno = 1;
    loop {
        let mut errcode = 0i32;
        buf[0] = 0;
        let res = unsafe {
            OCIErrorGet(errhp, recordno, ptr::null_mut(), &mut errcode, buf.as_mut_ptr(), buf.len() as u32, htype)
        };
        if res != OCI_SUCCESS {
            break;
        }
        let text = unsafe { CStr::from_ptr(buf.as_ptr() as *const libc::c_char) };
        let text = text.to_string_lossy().trim_end().to_string();
        if code == 0 {
            code = errcode;
        }
        if !text.is_empty() {
            messages.push(text);
        }
        recordno += 1;
    }
    if messages.is_empty() {
        let text = match rc {
            OCI_NO_DATA        => String::from("No Data"),
            OCI_NEED_DATA      => String::from("Need Data"),
            OCI_INVALID_HANDLE => String::from("Invalid Handle"),
            _ => format!("Error {}", rc),
        };
        messages.push(text);
    }
    if code == 0 {
        code = rc;
    }
    (code, messages.join("\n"))
}

macro_rules! catch {
    ( $err:expr, $site:expr => $( $stmt:stmt );+ ) => {{
        let res = unsafe { $($stmt)+ };
        match res {
            OCI_ERROR | OCI_INVALID_HANDLE => { return Err( crate::Error::oci($err, res).at($site) ); },
            _ => {}
        }
    }};
    ( $err:expr => $( $stmt:stmt );+ ) => {{
        let res = unsafe { $($stmt)+ };
        match res {
            OCI_ERROR | OCI_INVALID_HANDLE => { return Err( crate::Error::oci($err, res) ); },
            _ => {}
        }
    }};
}

impl Error {
    pub(crate) fn new(msg: &str) -> Self {
        Error::Interface( msg.to_owned() )
    }

    pub(crate) fn msg(msg: String) -> Self {
        Error::Interface( msg )
    }

    pub(crate) fn env(env: *mut OCIEnv, rc: i32) -> Self {
        let (code, message) = drain_errors(rc, env as *mut c_void, OCI_HTYPE_ENV);
        Error::Oracle { code, message, site: String::new(), offset: 0 }
    }

    pub(crate) fn oci(err: *mut OCIError, rc: i32) -> Self {
        let (code, message) = drain_errors(rc, err as *mut c_void, OCI_HTYPE_ERROR);
        Error::Oracle { code, message, site: String::new(), offset: 0 }
    }

    /// Converts an OCI status code into `Ok` or the matching error.
    /// `OCI_SUCCESS_WITH_INFO` is logged and treated as success.
    pub(crate) fn check(err: *mut OCIError, rc: i32, site: &str) -> crate::Result<()> {
        match rc {
            OCI_SUCCESS => Ok(()),
            OCI_SUCCESS_WITH_INFO => {
                let (code, message) = drain_errors(rc, err as *mut c_void, OCI_HTYPE_ERROR);
                tracing::warn!(site, code, message = message.as_str(), "OCI call succeeded with info");
                Ok(())
            }
            OCI_NEED_DATA       => Err(Error::Status(Status::NeedData)),
            OCI_NO_DATA         => Err(Error::Status(Status::NoDataFound)),
            OCI_INVALID_HANDLE  => Err(Error::Status(Status::InvalidHandle)),
            OCI_STILL_EXECUTING => Err(Error::Status(Status::StillExecuting)),
            OCI_CONTINUE        => Err(Error::Status(Status::Continue)),
            OCI_ERROR           => Err(Error::oci(err, rc).at(site)),
            _                   => Err(Error::Status(Status::Other(rc))),
        }
    }

    /// Records the operation that raised an Oracle error.
    pub(crate) fn at(self, site: &str) -> Self {
        match self {
            Error::Oracle { code, message, offset, .. } => Error::Oracle { code, message, site: site.to_string(), offset },
            other => other,
        }
    }

    pub(crate) fn with_offset(self, offset: u32) -> Self {
        match self {
            Error::Oracle { code, message, site, .. } => Error::Oracle { code, message, site, offset },
            other => other,
        }
    }

    pub(crate) fn with_details(self, details: &str) -> Self {
        match self {
            Error::Oracle { code, mut message, site, offset } => {
                message.push('\n');
                message.push_str(details);
                Error::Oracle { code, message, site, offset }
            }
            other => other,
        }
    }

    /// Oracle error code, if this is an Oracle error.
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::Oracle { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Byte offset in the statement text where parsing failed.
    pub fn offset(&self) -> Option<u32> {
        match self {
            Error::Oracle { offset, .. } if *offset > 0 => Some(*offset),
            _ => None,
        }
    }

    /// Reports whether the connection that raised this error is no longer usable.
    pub fn is_bad_connection(&self) -> bool {
        match self {
            Error::Oracle { code, .. } => is_bad_connection_code(*code),
            _ => false,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Error::Status(Status::NoDataFound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_connection_codes() {
        for code in [3113, 3114, 12170, 12528, 1092].iter() {
            assert!(is_bad_connection_code(*code));
        }
        assert!(!is_bad_connection_code(1));
        assert!(!is_bad_connection_code(942));
        let err = Error::Oracle { code: 3113, message: "ORA-03113: end-of-file on communication channel".into(), site: String::new(), offset: 0 };
        assert!(err.is_bad_connection());
        assert!(!Error::new("x").is_bad_connection());
    }

    #[test]
    fn display() {
        let err = Error::Oracle { code: 942, message: "ORA-00942: table or view does not exist".into(), site: "Execute".into(), offset: 14 };
        assert_eq!(err.to_string(), "Execute: ORA-00942: table or view does not exist (at offset 14)");
        assert_eq!(err.code(), Some(942));
        assert_eq!(err.offset(), Some(14));
        let err = Error::Oracle { code: 1, message: "ORA-00001: unique constraint".into(), site: String::new(), offset: 0 };
        assert_eq!(err.to_string(), "ORA-00001: unique constraint");
        assert_eq!(Error::new(msg::CURSOR_IS_CLOSED).to_string(), "cursor is closed");
        assert_eq!(Error::Status(Status::NoDataFound).to_string(), "no data found");
    }

    #[test]
    fn sentinels_compare() {
        assert_eq!(Error::Status(Status::NoDataFound), Error::Status(Status::NoDataFound));
        assert_ne!(Error::Status(Status::NoDataFound), Error::Status(Status::NeedData));
        assert_eq!(Error::new(msg::LIST_IS_EMPTY), Error::Interface(String::from("list is empty")));
        assert!(Error::Status(Status::NoDataFound).is_no_data());
    }

    #[test]
    fn decorations() {
        let err = Error::Oracle { code: 1008, message: "ORA-01008: not all variables bound".into(), site: String::new(), offset: 0 };
        let err = err.at("Execute").with_offset(3).with_details("missing: [B]");
        match err {
            Error::Oracle { code, message, site, offset } => {
                assert_eq!(code, 1008);
                assert_eq!(site, "Execute");
                assert_eq!(offset, 3);
                assert!(message.ends_with("\nmissing: [B]"));
            }
            _ => panic!("unexpected variant"),
        }
        assert_eq!(Error::new("x").at("site"), Error::new("x"));
    }
}
