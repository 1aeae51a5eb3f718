//! Large objects: OCI LOB primitives and the external view over one
//! locator of a LOB variable.

use crate::{
    Environment, Error, Result, VariableType,
    err::msg, oci::*, var::VarBuffer,
};
use libc::c_void;
use parking_lot::Mutex;
use std::{fmt, io, ptr, sync::Weak};

const MAX_DIR_ALIAS_LEN : usize = 30;
const MAX_FILE_NAME_LEN : usize = 255;

fn is_char_lob(vtype: VariableType) -> bool {
    matches!(vtype, VariableType::Clob | VariableType::NClob)
}

fn charset_id(vtype: VariableType) -> u16 {
    if vtype == VariableType::NClob { AL32UTF8 } else { 0 }
}

pub(crate) fn is_temporary(env: &Environment, loc: *mut OCILobLocator) -> Result<bool> {
    let mut flag = 0i32;
    let res = unsafe { OCILobIsTemporary(env.env_ptr(), env.err_ptr(), loc, &mut flag) };
    env.check_status(res, "LobIsTemporary")?;
    Ok( flag != 0 )
}

pub(crate) fn free_temporary(svc: *mut OCISvcCtx, env: &Environment, loc: *mut OCILobLocator) -> Result<()> {
    let res = unsafe { OCILobFreeTemporary(svc, env.err_ptr(), loc) };
    env.check_status(res, "LobFreeTemporary")
}

/**
Makes `loc` a session-duration temporary LOB (unless it already is one),
replaces its content with `data` and returns the number of bytes written.
*/
pub(crate) fn write_temporary(var: &VarBuffer, loc: *mut OCILobLocator, data: &[u8]) -> Result<usize> {
    let vtype = var.vtype;
    if vtype == VariableType::BFile {
        return Err( Error::new(msg::BFILE_READ_ONLY) );
    }
    var.conn.with_session(|svc, env| {
        let err = env.err_ptr();
        if !is_temporary(env, loc)? {
            let lob_type = if vtype == VariableType::Blob { OCI_TEMP_BLOB } else { OCI_TEMP_CLOB };
            tracing::trace!(vtype = vtype.name(), "OCILobCreateTemporary");
            let res = unsafe {
                OCILobCreateTemporary(svc, err, loc, 0, vtype.charset_form(), lob_type, 0, OCI_DURATION_SESSION)
            };
            env.check_status(res, "LobCreateTemporary")?;
        }
        let res = unsafe { OCILobTrim2(svc, err, loc, 0) };
        env.check_status(res, "LobTrim")?;
        let (written, _) = write_piece(svc, env, vtype, loc, data, 0)?;
        Ok(written)
    })
}

/// Writes `data` at the 0-based `offset`. Returns bytes consumed and the
/// LOB units (characters or bytes) written.
fn write_piece(svc: *mut OCISvcCtx, env: &Environment, vtype: VariableType, loc: *mut OCILobLocator, data: &[u8], offset: u64) -> Result<(usize, u64)> {
    if data.is_empty() {
        return Ok((0, 0));
    }
    let mut byte_amt = data.len() as u64;
    let mut char_amt = 0u64;
    let res = unsafe {
        OCILobWrite2(
            svc, env.err_ptr(), loc, &mut byte_amt, &mut char_amt, offset + 1,
            data.as_ptr() as *mut c_void, data.len() as u64, OCI_ONE_PIECE,
            ptr::null_mut(), ptr::null_mut(), charset_id(vtype), vtype.charset_form()
        )
    };
    env.check_status(res, "LobWrite")?;
    let units = if is_char_lob(vtype) { char_amt } else { byte_amt };
    Ok( (byte_amt as usize, units) )
}

/// Reads into `buf` from the 0-based `offset`. Returns bytes read and the
/// LOB units (characters or bytes) consumed. Both are 0 at the end of the LOB.
fn read_pieces(svc: *mut OCISvcCtx, env: &Environment, vtype: VariableType, loc: *mut OCILobLocator, buf: &mut [u8], offset: u64) -> Result<(usize, u64)> {
    let mut num_bytes = 0usize;
    let mut num_units = 0u64;
    while num_bytes < buf.len() {
        let piece = &mut buf[num_bytes..];
        let mut byte_amt = piece.len() as u64;
        let mut char_amt = 0u64;
        let res = unsafe {
            OCILobRead2(
                svc, env.err_ptr(), loc, &mut byte_amt, &mut char_amt, offset + num_units + 1,
                piece.as_mut_ptr() as *mut c_void, piece.len() as u64, OCI_ONE_PIECE,
                ptr::null_mut(), ptr::null_mut(), charset_id(vtype), vtype.charset_form()
            )
        };
        match res {
            OCI_NO_DATA => break,
            OCI_NEED_DATA => {}
            _ => env.check_status(res, "LobRead")?,
        }
        num_bytes += byte_amt as usize;
        num_units += if is_char_lob(vtype) { char_amt } else { byte_amt };
        if res != OCI_NEED_DATA || byte_amt == 0 {
            break;
        }
    }
    Ok( (num_bytes, num_units) )
}

fn read(var: &VarBuffer, loc: *mut OCILobLocator, buf: &mut [u8], offset: u64) -> Result<(usize, u64)> {
    let vtype = var.vtype;
    var.conn.with_session(|svc, env| {
        let err = env.err_ptr();
        if vtype == VariableType::BFile {
            let res = unsafe { OCILobFileOpen(svc, err, loc, OCI_FILE_READONLY) };
            env.check_status(res, "LobFileOpen")?;
        }
        let read = read_pieces(svc, env, vtype, loc, buf, offset);
        if vtype == VariableType::BFile {
            let res = unsafe { OCILobFileClose(svc, err, loc) };
            let closed = env.check_status(res, "LobFileClose");
            if read.is_ok() {
                closed?;
            }
        }
        read
    })
}

/// LOB length in characters for CLOB and NCLOB and in bytes otherwise.
fn length(var: &VarBuffer, loc: *mut OCILobLocator) -> Result<u64> {
    var.conn.with_session(|svc, env| {
        let mut len = 0u64;
        let res = unsafe { OCILobGetLength2(svc, env.err_ptr(), loc, &mut len) };
        env.check_status(res, "LobGetLength")?;
        Ok(len)
    })
}

/// Upper bound of the LOB size in bytes.
fn byte_size(var: &VarBuffer, loc: *mut OCILobLocator) -> Result<u64> {
    let len = length(var, loc)?;
    let size = match var.vtype {
        VariableType::Clob  => len * var.env.max_bytes_per_character() as u64,
        VariableType::NClob => len * 2,
        _ => len,
    };
    Ok(size)
}

/**
A view of one LOB locator held by a variable.

The view is only valid until the variable fetches the next batch of rows,
after which every operation fails with "LOB variable no longer valid after
subsequent fetch". Positions are in characters for CLOB and NCLOB and in bytes
for BLOB and BFILE.

The view also implements `std::io::Read`, `Write` and `Seek` over its own
stream position.

# Example

```no_run
# fn main() -> Result<(), Box<dyn std::error::Error>> {
use std::io::Read;
let conn = goracle::Connection::open("scott/tiger@orcl")?;
let mut cursor = conn.new_cursor();
cursor.execute("SELECT TO_CLOB('hello') FROM dual", &mut [])?;
let row = cursor.fetch_one()?;
if let Some(goracle::Value::Lob(mut lob)) = row.into_iter().flatten().next() {
    let mut text = String::new();
    lob.read_to_string(&mut text)?;
    assert_eq!(text, "hello");
}
# Ok(())
# }
```
*/
#[derive(Clone)]
pub struct ExternalLobVar {
    var: Weak<Mutex<VarBuffer>>,
    pos: usize,
    internal_fetch_num: u64,
    vtype: VariableType,
    offset: u64,
}

impl ExternalLobVar {
    pub(crate) fn new(var: Weak<Mutex<VarBuffer>>, pos: usize, internal_fetch_num: u64, vtype: VariableType) -> Self {
        Self { var, pos, internal_fetch_num, vtype, offset: 0 }
    }

    fn with_var<R>(&self, f: impl FnOnce(&mut VarBuffer, *mut OCILobLocator) -> Result<R>) -> Result<R> {
        let var = self.var.upgrade().ok_or_else(|| Error::new(msg::LOB_NO_LONGER_VALID))?;
        let mut var = var.lock();
        if var.internal_fetch_num != self.internal_fetch_num {
            return Err( Error::new(msg::LOB_NO_LONGER_VALID) );
        }
        let loc = var.ptrs()?
            .get(self.pos)
            .copied()
            .ok_or_else(|| Error::new(msg::ARRAY_SIZE_EXCEEDED))?;
        f(&mut *var, loc as *mut OCILobLocator)
    }

    /// Type of the variable the locator belongs to.
    pub fn var_type(&self) -> VariableType {
        self.vtype
    }

    pub fn is_file(&self) -> bool {
        self.vtype == VariableType::BFile
    }

    /// Checks that the locator is still valid.
    pub fn verify(&self) -> Result<()> {
        self.with_var(|_, _| Ok(()))
    }

    /**
    Returns the size of the LOB. When `in_chars` is false the size of a CLOB
    or NCLOB is the maximum number of bytes its characters may take.
    */
    pub fn size(&self, in_chars: bool) -> Result<u64> {
        self.with_var(|var, loc| {
            if in_chars {
                length(var, loc)
            } else {
                byte_size(var, loc)
            }
        })
    }

    /**
    Reads from `offset` into `buf`. Returns the number of bytes read, which
    is 0 at the end of the LOB.
    */
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let (num_bytes, _) = self.with_var(|var, loc| read(var, loc, buf, offset))?;
        Ok(num_bytes)
    }

    /// Reads the entire content of the LOB.
    pub fn read_all(&self) -> Result<Vec<u8>> {
        self.with_var(|var, loc| {
            let size = byte_size(var, loc)? as usize;
            let mut data = vec![0u8; size.max(1)];
            let mut num_bytes = 0;
            let mut offset = 0;
            loop {
                if num_bytes == data.len() {
                    data.resize(data.len() * 2, 0);
                }
                let (bytes, units) = read(var, loc, &mut data[num_bytes..], offset)?;
                if bytes == 0 {
                    break;
                }
                num_bytes += bytes;
                offset += units;
            }
            data.truncate(num_bytes);
            tracing::debug!(vtype = var.vtype.name(), size, read = num_bytes, "read LOB");
            Ok(data)
        })
    }

    /// Writes `data` at `offset` and returns the number of bytes written.
    pub fn write_at(&self, data: &[u8], offset: u64) -> Result<usize> {
        let (num_bytes, _) = self.write_units(data, offset)?;
        Ok(num_bytes)
    }

    fn write_units(&self, data: &[u8], offset: u64) -> Result<(usize, u64)> {
        self.with_var(|var, loc| {
            let vtype = var.vtype;
            if vtype == VariableType::BFile {
                return Err( Error::new(msg::BFILE_READ_ONLY) );
            }
            var.conn.with_session(|svc, env| write_piece(svc, env, vtype, loc, data, offset))
        })
    }

    /// Truncates the LOB to `new_size` characters or bytes.
    pub fn trim(&self, new_size: u64) -> Result<()> {
        self.with_var(|var, loc| {
            var.conn.with_session(|svc, env| {
                let res = unsafe { OCILobTrim2(svc, env.err_ptr(), loc, new_size) };
                env.check_status(res, "LobTrim")
            })
        })
    }

    /// Returns the chunk size the server uses to store this LOB.
    pub fn chunk_size(&self) -> Result<u32> {
        self.with_var(|var, loc| {
            var.conn.with_session(|svc, env| {
                let mut size = 0u32;
                let res = unsafe { OCILobGetChunkSize(svc, env.err_ptr(), loc, &mut size) };
                env.check_status(res, "LobGetChunkSize")?;
                Ok(size)
            })
        })
    }

    pub fn is_open(&self) -> Result<bool> {
        self.with_var(|var, loc| {
            var.conn.with_session(|svc, env| {
                let mut flag = 0i32;
                let res = unsafe { OCILobIsOpen(svc, env.err_ptr(), loc, &mut flag) };
                env.check_status(res, "LobIsOpen")?;
                Ok( flag != 0 )
            })
        })
    }

    /// Opens the LOB for read-write access, which speeds up a series of accesses.
    pub fn open(&self) -> Result<()> {
        self.with_var(|var, loc| {
            var.conn.with_session(|svc, env| {
                let res = unsafe { OCILobOpen(svc, env.err_ptr(), loc, OCI_LOB_READWRITE) };
                env.check_status(res, "LobOpen")
            })
        })
    }

    pub fn close(&self) -> Result<()> {
        self.with_var(|var, loc| {
            var.conn.with_session(|svc, env| {
                let res = unsafe { OCILobClose(svc, env.err_ptr(), loc) };
                env.check_status(res, "LobClose")
            })
        })
    }

    /// Reports whether the file a BFILE locator points to exists.
    pub fn file_exists(&self) -> Result<bool> {
        self.with_var(|var, loc| {
            var.conn.with_session(|svc, env| {
                let mut flag = 0i32;
                let res = unsafe { OCILobFileExists(svc, env.err_ptr(), loc, &mut flag) };
                env.check_status(res, "LobFileExists")?;
                Ok( flag != 0 )
            })
        })
    }

    /// Returns the directory alias and the file name of a BFILE.
    pub fn file_name(&self) -> Result<(String, String)> {
        self.with_var(|var, loc| {
            let mut dir = [0u8; MAX_DIR_ALIAS_LEN];
            let mut dir_len = dir.len() as u16;
            let mut name = [0u8; MAX_FILE_NAME_LEN];
            let mut name_len = name.len() as u16;
            let res = unsafe {
                OCILobFileGetName(
                    var.env.env_ptr(), var.env.err_ptr(), loc,
                    dir.as_mut_ptr(), &mut dir_len, name.as_mut_ptr(), &mut name_len
                )
            };
            var.env.check_status(res, "LobFileGetName")?;
            let dir = String::from_utf8_lossy(&dir[..(dir_len as usize).min(dir.len())]).into_owned();
            let name = String::from_utf8_lossy(&name[..(name_len as usize).min(name.len())]).into_owned();
            Ok( (dir, name) )
        })
    }

    /// Points a BFILE locator to another file.
    pub fn set_file_name(&self, dir_alias: &str, name: &str) -> Result<()> {
        let pos = self.pos;
        self.with_var(|var, _| {
            let env = var.env.clone();
            let slot = var.ptrs_mut()?
                .get_mut(pos)
                .ok_or_else(|| Error::new(msg::ARRAY_SIZE_EXCEEDED))?;
            let res = unsafe {
                OCILobFileSetName(
                    env.env_ptr(), env.err_ptr(), slot as *mut *mut c_void as *mut *mut OCILobLocator,
                    dir_alias.as_ptr(), dir_alias.len() as u16, name.as_ptr(), name.len() as u16
                )
            };
            env.check_status(res, "LobFileSetName")
        })
    }
}

impl io::Read for ExternalLobVar {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let offset = self.offset;
        let (num_bytes, units) = self.with_var(|var, loc| read(var, loc, buf, offset))?;
        self.offset += units;
        Ok(num_bytes)
    }
}

impl io::Write for ExternalLobVar {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let (num_bytes, units) = self.write_units(buf, self.offset)?;
        self.offset += units;
        Ok(num_bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Seek for ExternalLobVar {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let (base, delta) = match pos {
            io::SeekFrom::Start(offset) => {
                self.offset = offset;
                return Ok(offset);
            }
            io::SeekFrom::Current(delta) => (self.offset, delta),
            io::SeekFrom::End(delta) => (self.with_var(|var, loc| length(var, loc))?, delta),
        };
        let offset = if delta < 0 {
            base.checked_sub(delta.unsigned_abs())
        } else {
            base.checked_add(delta as u64)
        };
        match offset {
            Some(offset) => {
                self.offset = offset;
                Ok(offset)
            }
            None => Err( io::Error::new(io::ErrorKind::InvalidInput, "invalid seek to a negative or overflowing position") ),
        }
    }
}

impl fmt::Debug for ExternalLobVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalLobVar")
            .field("type", &self.vtype)
            .field("pos", &self.pos)
            .field("fetch", &self.internal_fetch_num)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Seek;

    fn detached(vtype: VariableType) -> ExternalLobVar {
        ExternalLobVar::new(Weak::new(), 0, 0, vtype)
    }

    #[test]
    fn stale_views() {
        let lob = detached(VariableType::Clob);
        assert_eq!(lob.verify().unwrap_err().to_string(), msg::LOB_NO_LONGER_VALID);
        assert_eq!(lob.size(true).unwrap_err().to_string(), msg::LOB_NO_LONGER_VALID);
        assert!(lob.read_all().is_err());
        assert!(lob.write_at(b"x", 0).is_err());
    }

    #[test]
    fn seeking() {
        let mut lob = detached(VariableType::Blob);
        assert_eq!(lob.seek(io::SeekFrom::Start(10)).unwrap(), 10);
        assert_eq!(lob.seek(io::SeekFrom::Current(-4)).unwrap(), 6);
        assert_eq!(lob.seek(io::SeekFrom::Current(4)).unwrap(), 10);
        assert!(lob.seek(io::SeekFrom::Current(-11)).is_err());
        assert!(lob.seek(io::SeekFrom::End(0)).is_err());
    }

    #[test]
    fn kinds() {
        assert!(detached(VariableType::BFile).is_file());
        assert!(!detached(VariableType::Blob).is_file());
        assert_eq!(charset_id(VariableType::NClob), AL32UTF8);
        assert_eq!(charset_id(VariableType::Clob), 0);
        assert!(is_char_lob(VariableType::NClob));
        assert!(!is_char_lob(VariableType::BFile));
    }
}
