//! OCI environment

use crate::{Error, Result, oci::{self, *}};
use libc::c_void;
use once_cell::sync::OnceCell;
use std::ptr;

/// Maximum number of characters in a (non-LONG) string value
pub const MAX_STRING_CHARS : u32 = 4000;
/// Maximum number of bytes in a (non-LONG) binary value
pub const MAX_BINARY_BYTES : u32 = 4000;

/// Format that converts any NUMBER into its shortest text representation.
pub(crate) const NUMBER_TO_STRING_FORMAT : &[u8] = b"TM9";
/// NLS parameters that pin the decimal and group separators.
pub(crate) const NLS_NUMERIC_CHARACTERS : &[u8] = b"NLS_NUMERIC_CHARACTERS='.,'";

static AL32UTF8_ID : OnceCell<u16> = OnceCell::new();

/// Looks up the character set ID of AL32UTF8. The lookup uses a temporary
/// environment and is done once per process.
fn al32utf8_id() -> Result<u16> {
    AL32UTF8_ID.get_or_try_init(|| {
        let mut env = ptr::null_mut::<OCIEnv>();
        let res = unsafe {
            OCIEnvNlsCreate(
                &mut env, OCI_DEFAULT | OCI_THREADED,
                ptr::null_mut(), ptr::null(), ptr::null(), ptr::null(), 0, ptr::null_mut(),
                0, 0
            )
        };
        if res != OCI_SUCCESS || env.is_null() {
            return Err( Error::new("Unable to acquire Oracle environment handle") );
        }
        let env = Handle::from(env);
        let id = unsafe { OCINlsCharSetNameToId(env.get() as *mut c_void, b"AL32UTF8\0".as_ptr()) };
        if id == 0 {
            tracing::warn!("AL32UTF8 is not known to the client library, using the built-in ID");
            Ok(AL32UTF8)
        } else {
            Ok(id)
        }
    }).map(|id| *id)
}

/**
Represents an OCI environment: the environment handle, its error handle and
the character set properties that the variables need to size their buffers.

The environment is always created with the AL32UTF8 character set for both
the database and the national character sets.
*/
pub struct Environment {
    // declared first so that it is freed before its parent environment
    err: Handle<OCIError>,
    env: Handle<OCIEnv>,
    max_bytes_per_character: u32,
    fixed_width: bool,
    encoding: String,
    nencoding: String,
}

impl Environment {
    /**
    Loads the Oracle client library (once per process) and returns a new
    environment handle.

    # Example

    ```no_run
    let env = goracle::Environment::new()?;
    assert!(env.max_bytes_per_character() >= 1);
    # Ok::<(),goracle::Error>(())
    ```
    */
    pub fn new() -> Result<Self> {
        oci::load()?;
        let csid = al32utf8_id()?;

        let mut env = ptr::null_mut::<OCIEnv>();
        let res = unsafe {
            OCIEnvNlsCreate(
                &mut env, OCI_OBJECT | OCI_THREADED,
                ptr::null_mut(), ptr::null(), ptr::null(), ptr::null(), 0, ptr::null_mut(),
                csid, csid
            )
        };
        if res != OCI_SUCCESS || env.is_null() {
            return Err( Error::new("Unable to acquire Oracle environment handle with AL32UTF8 charset") );
        }
        let env = Handle::from(env);
        let err = Handle::<OCIError>::new(env.get())?;

        let mut val = 0i32;
        Error::check(err.get(), unsafe {
            OCINlsNumericInfoGet(env.get() as *mut c_void, err.get(), &mut val, OCI_NLS_CHARSET_MAXBYTESZ)
        }, "Environment[get max bytes per character]")?;
        let max_bytes_per_character = val.max(1) as u32;

        Error::check(err.get(), unsafe {
            OCINlsNumericInfoGet(env.get() as *mut c_void, err.get(), &mut val, OCI_NLS_CHARSET_FIXEDWIDTH)
        }, "Environment[determine if charset fixed width]")?;
        let fixed_width = val > 0;

        let mut environment = Self {
            err, env, max_bytes_per_character, fixed_width,
            encoding: String::new(),
            nencoding: String::new(),
        };
        environment.encoding  = environment.character_set_name(OCI_ATTR_CHARSET_ID)?;
        environment.nencoding = environment.character_set_name(OCI_ATTR_NCHARSET_ID)?;
        tracing::debug!(
            encoding = environment.encoding.as_str(),
            nencoding = environment.nencoding.as_str(),
            max_bytes_per_character,
            "created OCI environment"
        );
        Ok(environment)
    }

    pub(crate) fn env_ptr(&self) -> *mut OCIEnv {
        self.env.get()
    }

    pub(crate) fn err_ptr(&self) -> *mut OCIError {
        self.err.get()
    }

    /// Converts the status of an OCI call made with this environment's error handle.
    pub(crate) fn check_status(&self, rc: i32, site: &str) -> Result<()> {
        Error::check(self.err.get(), rc, site)
    }

    /// Maximum number of bytes a single character takes in the client character set.
    pub fn max_bytes_per_character(&self) -> u32 {
        self.max_bytes_per_character
    }

    /// Maximum number of bytes of a (non-LONG) string variable.
    pub fn max_string_bytes(&self) -> u32 {
        MAX_STRING_CHARS * self.max_bytes_per_character
    }

    pub fn is_fixed_width(&self) -> bool {
        self.fixed_width
    }

    /// IANA name of the client character set.
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// IANA name of the client national character set.
    pub fn nencoding(&self) -> &str {
        &self.nencoding
    }

    /// Returns the IANA name of the character set referenced by the given
    /// environment attribute.
    fn character_set_name(&self, attribute: u32) -> Result<String> {
        let charset_id : u16 = self.env.get_attr(attribute, self.err.get())?;

        let mut oracle_name = [0u8; OCI_NLS_MAXBUFSZ];
        self.check_status(unsafe {
            OCINlsCharSetIdToName(self.env.get() as *mut c_void, oracle_name.as_mut_ptr(), oracle_name.len(), charset_id)
        }, "GetCharacterSetName[get Oracle charset name]")?;

        let mut iana_name = [0u8; OCI_NLS_MAXBUFSZ];
        self.check_status(unsafe {
            OCINlsNameMap(self.env.get() as *mut c_void, iana_name.as_mut_ptr(), iana_name.len(), oracle_name.as_ptr(), OCI_NLS_CS_ORA_TO_IANA)
        }, "GetCharacterSetName[translate NLS charset]")?;

        Ok(c_buf_to_string(&iana_name))
    }
}

/// Converts a NUL terminated buffer filled in by OCI into a string.
pub(crate) fn c_buf_to_string(buf: &[u8]) -> String {
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..len]).into_owned()
}

/**
Returns the 5 digit tuple with the Oracle client library version.

# Example

```no_run
let (major, _minor, _update, _patch, _port_update) = goracle::client_version()?;
assert!(major >= 11);
# Ok::<(),goracle::Error>(())
```
*/
pub fn client_version() -> Result<(i32, i32, i32, i32, i32)> {
    oci::load()?;
    let mut major = 0i32;
    let mut minor = 0i32;
    let mut update = 0i32;
    let mut patch = 0i32;
    let mut port_update = 0i32;
    unsafe {
        OCIClientVersion(&mut major, &mut minor, &mut update, &mut patch, &mut port_update);
    }
    Ok((major, minor, update, patch, port_update))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_buffers() {
        assert_eq!(c_buf_to_string(b"UTF-8\0\0\0"), "UTF-8");
        assert_eq!(c_buf_to_string(b"AL32UTF8"), "AL32UTF8");
        assert_eq!(c_buf_to_string(b"\0"), "");
    }
}
