//! OCI entry points used by the driver.

use super::*;
use super::dylib::LibHandle;
use crate::{Error, Result};
use libc::{c_void, size_t};
use once_cell::sync::OnceCell;

static API: OnceCell<std::result::Result<Api, String>> = OnceCell::new();

/// Loads the Oracle client library and resolves the entry points.
/// The outcome of the first attempt is shared by the whole process.
pub(crate) fn load() -> Result<()> {
    let api = API.get_or_init(|| {
        let lib = LibHandle::open().ok_or_else(|| String::from("cannot load the Oracle client library (libclntsh)"))?;
        unsafe { Api::load(lib) }.map_err(|name| format!("the Oracle client library does not export {}", name))
    });
    match api {
        Ok(_) => Ok(()),
        Err(msg) => Err(Error::new(msg)),
    }
}

pub(crate) fn is_loaded() -> bool {
    matches!(API.get(), Some(Ok(_)))
}

oci_api! {
    // https://docs.oracle.com/en/database/oracle/oracle-database/19/lnoci/connect-authorize-and-initialize-functions.html
    fn OCIEnvNlsCreate(
        envhpp: *mut *mut OCIEnv, mode: u32, ctxp: *mut c_void,
        malocfp: *const c_void, ralocfp: *const c_void, mfreefp: *const c_void,
        xtramemsz: size_t, usrmempp: *mut *mut c_void, charset: u16, ncharset: u16
    ) -> i32 = OCI_INVALID_HANDLE;

    fn OCIServerAttach(srvhp: *mut OCIServer, errhp: *mut OCIError, dblink: *const u8, dblink_len: i32, mode: u32) -> i32 = OCI_INVALID_HANDLE;
    fn OCIServerDetach(srvhp: *mut OCIServer, errhp: *mut OCIError, mode: u32) -> i32 = OCI_INVALID_HANDLE;
    fn OCISessionBegin(svchp: *mut OCISvcCtx, errhp: *mut OCIError, usrhp: *mut OCISession, credt: u32, mode: u32) -> i32 = OCI_INVALID_HANDLE;
    fn OCISessionEnd(svchp: *mut OCISvcCtx, errhp: *mut OCIError, usrhp: *mut OCISession, mode: u32) -> i32 = OCI_INVALID_HANDLE;

    // https://docs.oracle.com/en/database/oracle/oracle-database/19/lnoci/handle-and-descriptor-functions.html
    fn OCIHandleAlloc(parenth: *const c_void, hndlpp: *mut *mut c_void, hndl_type: u32, xtramem_sz: size_t, usrmempp: *const c_void) -> i32 = OCI_INVALID_HANDLE;
    fn OCIHandleFree(hndlp: *mut c_void, hnd_type: u32) -> i32 = OCI_INVALID_HANDLE;
    fn OCIDescriptorAlloc(parenth: *const c_void, descpp: *mut *mut c_void, desc_type: u32, xtramem_sz: size_t, usrmempp: *const c_void) -> i32 = OCI_INVALID_HANDLE;
    fn OCIDescriptorFree(descp: *mut c_void, desc_type: u32) -> i32 = OCI_INVALID_HANDLE;
    fn OCIAttrGet(trgthndlp: *const c_void, trghndltyp: u32, attributep: *mut c_void, sizep: *mut u32, attrtype: u32, errhp: *mut OCIError) -> i32 = OCI_INVALID_HANDLE;
    fn OCIAttrSet(trgthndlp: *mut c_void, trghndltyp: u32, attributep: *const c_void, size: u32, attrtype: u32, errhp: *mut OCIError) -> i32 = OCI_INVALID_HANDLE;
    fn OCIParamGet(hndlp: *const c_void, htype: u32, errhp: *mut OCIError, descr: *mut *mut c_void, pos: u32) -> i32 = OCI_INVALID_HANDLE;

    // https://docs.oracle.com/en/database/oracle/oracle-database/19/lnoci/miscellaneous-functions.html
    fn OCIErrorGet(hndlp: *const c_void, recordno: u32, sqlstate: *mut u8, errcodep: *mut i32, bufp: *mut u8, bufsiz: u32, hnd_type: u32) -> i32 = OCI_INVALID_HANDLE;
    fn OCIBreak(hndlp: *mut c_void, errhp: *mut OCIError) -> i32 = OCI_INVALID_HANDLE;
    fn OCIPing(svchp: *mut OCISvcCtx, errhp: *mut OCIError, mode: u32) -> i32 = OCI_INVALID_HANDLE;
    fn OCIServerVersion(hndlp: *mut c_void, errhp: *mut OCIError, bufp: *mut u8, bufsz: u32, hndltype: u8) -> i32 = OCI_INVALID_HANDLE;
    fn OCIClientVersion(major: *mut i32, minor: *mut i32, update: *mut i32, patch: *mut i32, port_update: *mut i32) -> () = ();

    // https://docs.oracle.com/en/database/oracle/oracle-database/19/lnoci/transaction-functions.html
    fn OCITransCommit(svchp: *mut OCISvcCtx, errhp: *mut OCIError, flags: u32) -> i32 = OCI_INVALID_HANDLE;
    fn OCITransRollback(svchp: *mut OCISvcCtx, errhp: *mut OCIError, flags: u32) -> i32 = OCI_INVALID_HANDLE;

    // https://docs.oracle.com/en/database/oracle/oracle-database/19/lnoci/statement-functions.html
    fn OCIStmtPrepare2(
        svchp: *mut OCISvcCtx, stmthp: *mut *mut OCIStmt, errhp: *mut OCIError,
        stmttext: *const u8, stmt_len: u32, key: *const u8, keylen: u32,
        language: u32, mode: u32
    ) -> i32 = OCI_INVALID_HANDLE;
    fn OCIStmtRelease(stmtp: *mut OCIStmt, errhp: *mut OCIError, key: *const u8, keylen: u32, mode: u32) -> i32 = OCI_INVALID_HANDLE;
    fn OCIStmtExecute(
        svchp: *mut OCISvcCtx, stmtp: *mut OCIStmt, errhp: *mut OCIError,
        iters: u32, rowoff: u32, snap_in: *const OCISnapshot, snap_out: *mut OCISnapshot,
        mode: u32
    ) -> i32 = OCI_INVALID_HANDLE;
    fn OCIStmtFetch2(stmtp: *mut OCIStmt, errhp: *mut OCIError, nrows: u32, orient: u16, offset: i32, mode: u32) -> i32 = OCI_INVALID_HANDLE;
    fn OCIStmtGetBindInfo(
        stmtp: *mut OCIStmt, errhp: *mut OCIError, size: u32, startloc: u32, found: *mut i32,
        bvnp: *mut *mut u8, bvnl: *mut u8, invp: *mut *mut u8, inpl: *mut u8,
        dupl: *mut u8, hndl: *mut *mut OCIBind
    ) -> i32 = OCI_INVALID_HANDLE;

    // https://docs.oracle.com/en/database/oracle/oracle-database/19/lnoci/bind-define-describe-functions.html
    fn OCIBindByPos(
        stmtp: *mut OCIStmt, bindpp: *mut *mut OCIBind, errhp: *mut OCIError,
        position: u32, valuep: *mut c_void, value_sz: i32, dty: u16,
        indp: *mut c_void, alenp: *mut u16, rcodep: *mut u16,
        maxarr_len: u32, curelep: *mut u32, mode: u32
    ) -> i32 = OCI_INVALID_HANDLE;
    fn OCIBindByName(
        stmtp: *mut OCIStmt, bindpp: *mut *mut OCIBind, errhp: *mut OCIError,
        placeholder: *const u8, placeh_len: i32, valuep: *mut c_void, value_sz: i32, dty: u16,
        indp: *mut c_void, alenp: *mut u16, rcodep: *mut u16,
        maxarr_len: u32, curelep: *mut u32, mode: u32
    ) -> i32 = OCI_INVALID_HANDLE;
    fn OCIDefineByPos(
        stmtp: *mut OCIStmt, defnpp: *mut *mut OCIDefine, errhp: *mut OCIError,
        position: u32, valuep: *mut c_void, value_sz: i32, dty: u16,
        indp: *mut c_void, rlenp: *mut u16, rcodep: *mut u16, mode: u32
    ) -> i32 = OCI_INVALID_HANDLE;

    // https://docs.oracle.com/en/database/oracle/oracle-database/19/lnoci/oci-globalization-support-functions.html
    fn OCINlsCharSetNameToId(envhp: *mut c_void, name: *const u8) -> u16 = 0;
    fn OCINlsCharSetIdToName(envhp: *mut c_void, buf: *mut u8, buflen: size_t, id: u16) -> i32 = OCI_INVALID_HANDLE;
    fn OCINlsNameMap(envhp: *mut c_void, buf: *mut u8, buflen: size_t, srcbuf: *const u8, flag: u32) -> i32 = OCI_INVALID_HANDLE;
    fn OCINlsNumericInfoGet(envhp: *mut c_void, errhp: *mut OCIError, val: *mut i32, item: u16) -> i32 = OCI_INVALID_HANDLE;

    // https://docs.oracle.com/en/database/oracle/oracle-database/19/lnoci/oci-NUMBER-functions.html
    fn OCINumberFromInt(errhp: *mut OCIError, inum: *const c_void, inum_length: u32, inum_s_flag: u32, number: *mut OCINumber) -> i32 = OCI_INVALID_HANDLE;
    fn OCINumberFromReal(errhp: *mut OCIError, rnum: *const c_void, rnum_length: u32, number: *mut OCINumber) -> i32 = OCI_INVALID_HANDLE;
    fn OCINumberToReal(errhp: *mut OCIError, number: *const OCINumber, rsl_length: u32, rsl: *mut c_void) -> i32 = OCI_INVALID_HANDLE;
    fn OCINumberFromText(
        errhp: *mut OCIError, txt: *const u8, txt_len: u32, fmt: *const u8, fmt_len: u32,
        nls_params: *const u8, nls_p_len: u32, number: *mut OCINumber
    ) -> i32 = OCI_INVALID_HANDLE;
    fn OCINumberToText(
        errhp: *mut OCIError, number: *const OCINumber, fmt: *const u8, fmt_len: u32,
        nls_params: *const u8, nls_p_len: u32, buf_size: *mut u32, buf: *mut u8
    ) -> i32 = OCI_INVALID_HANDLE;

    // https://docs.oracle.com/en/database/oracle/oracle-database/19/lnoci/oci-date-datetime-and-interval-functions.html
    fn OCIIntervalGetDaySecond(
        hndl: *mut c_void, errhp: *mut OCIError, dy: *mut i32, hr: *mut i32, mm: *mut i32, ss: *mut i32, fsec: *mut i32,
        interval: *const OCIInterval
    ) -> i32 = OCI_INVALID_HANDLE;
    fn OCIIntervalSetDaySecond(
        hndl: *mut c_void, errhp: *mut OCIError, dy: i32, hr: i32, mm: i32, ss: i32, fsec: i32,
        result: *mut OCIInterval
    ) -> i32 = OCI_INVALID_HANDLE;

    // https://docs.oracle.com/en/database/oracle/oracle-database/19/lnoci/lob-functions.html
    fn OCILobRead2(
        svchp: *mut OCISvcCtx, errhp: *mut OCIError, locp: *mut OCILobLocator,
        byte_amtp: *mut u64, char_amtp: *mut u64, offset: u64, bufp: *mut c_void, bufl: u64,
        piece: u8, ctxp: *mut c_void, cbfp: OCICallbackLobRW, csid: u16, csfrm: u8
    ) -> i32 = OCI_INVALID_HANDLE;
    fn OCILobWrite2(
        svchp: *mut OCISvcCtx, errhp: *mut OCIError, locp: *mut OCILobLocator,
        byte_amtp: *mut u64, char_amtp: *mut u64, offset: u64, bufp: *mut c_void, buflen: u64,
        piece: u8, ctxp: *mut c_void, cbfp: OCICallbackLobRW, csid: u16, csfrm: u8
    ) -> i32 = OCI_INVALID_HANDLE;
    fn OCILobGetLength2(svchp: *mut OCISvcCtx, errhp: *mut OCIError, locp: *mut OCILobLocator, lenp: *mut u64) -> i32 = OCI_INVALID_HANDLE;
    fn OCILobTrim2(svchp: *mut OCISvcCtx, errhp: *mut OCIError, locp: *mut OCILobLocator, newlen: u64) -> i32 = OCI_INVALID_HANDLE;
    fn OCILobFileOpen(svchp: *mut OCISvcCtx, errhp: *mut OCIError, filep: *mut OCILobLocator, mode: u8) -> i32 = OCI_INVALID_HANDLE;
    fn OCILobFileClose(svchp: *mut OCISvcCtx, errhp: *mut OCIError, filep: *mut OCILobLocator) -> i32 = OCI_INVALID_HANDLE;
    fn OCILobFileGetName(
        envhp: *mut OCIEnv, errhp: *mut OCIError, filep: *const OCILobLocator,
        dir_alias: *mut u8, d_length: *mut u16, filename: *mut u8, f_length: *mut u16
    ) -> i32 = OCI_INVALID_HANDLE;
    fn OCILobFileExists(svchp: *mut OCISvcCtx, errhp: *mut OCIError, filep: *mut OCILobLocator, flag: *mut i32) -> i32 = OCI_INVALID_HANDLE;
    fn OCILobOpen(svchp: *mut OCISvcCtx, errhp: *mut OCIError, locp: *mut OCILobLocator, mode: u8) -> i32 = OCI_INVALID_HANDLE;
    fn OCILobClose(svchp: *mut OCISvcCtx, errhp: *mut OCIError, locp: *mut OCILobLocator) -> i32 = OCI_INVALID_HANDLE;
    fn OCILobIsOpen(svchp: *mut OCISvcCtx, errhp: *mut OCIError, locp: *mut OCILobLocator, flag: *mut i32) -> i32 = OCI_INVALID_HANDLE;
    fn OCILobGetChunkSize(svchp: *mut OCISvcCtx, errhp: *mut OCIError, locp: *mut OCILobLocator, chunk_size: *mut u32) -> i32 = OCI_INVALID_HANDLE;
    fn OCILobFileSetName(
        envhp: *mut OCIEnv, errhp: *mut OCIError, filepp: *mut *mut OCILobLocator,
        dir_alias: *const u8, d_length: u16, filename: *const u8, f_length: u16
    ) -> i32 = OCI_INVALID_HANDLE;
    fn OCILobIsTemporary(envhp: *mut OCIEnv, errhp: *mut OCIError, locp: *mut OCILobLocator, is_temporary: *mut i32) -> i32 = OCI_INVALID_HANDLE;
    fn OCILobCreateTemporary(
        svchp: *mut OCISvcCtx, errhp: *mut OCIError, locp: *mut OCILobLocator,
        csid: u16, csfrm: u8, lobtype: u8, cache: i32, duration: u16
    ) -> i32 = OCI_INVALID_HANDLE;
    fn OCILobFreeTemporary(svchp: *mut OCISvcCtx, errhp: *mut OCIError, locp: *mut OCILobLocator) -> i32 = OCI_INVALID_HANDLE;

    // https://docs.oracle.com/en/database/oracle/oracle-database/19/lnoci/oci-raw-functions.html
    fn OCIRawAssignBytes(envhp: *mut OCIEnv, errhp: *mut OCIError, rhs: *const u8, rhs_len: u32, lhs: *mut *mut OCIRaw) -> i32 = OCI_INVALID_HANDLE;
    fn OCIRawPtr(envhp: *mut OCIEnv, raw: *const OCIRaw) -> *mut u8 = std::ptr::null_mut();
    fn OCIRawSize(envhp: *mut OCIEnv, raw: *const OCIRaw) -> u32 = 0;
    fn OCIRawResize(envhp: *mut OCIEnv, errhp: *mut OCIError, new_size: u32, raw: *mut *mut OCIRaw) -> i32 = OCI_INVALID_HANDLE;

    // https://docs.oracle.com/en/database/oracle/oracle-database/19/lnoci/oci-type-information-accessor-functions.html
    fn OCITypeByName(
        envhp: *mut OCIEnv, errhp: *mut OCIError, svchp: *const OCISvcCtx,
        schema_name: *const u8, s_length: u32, type_name: *const u8, t_length: u32,
        version_name: *const u8, v_length: u32, pin_duration: u16, get_option: u32,
        tdo: *mut *mut OCIType
    ) -> i32 = OCI_INVALID_HANDLE;

    // https://docs.oracle.com/en/database/oracle/oracle-database/19/lnoci/advanced-queuing-and-publish-subscribe-functions.html
    fn OCIAQEnq(
        svchp: *mut OCISvcCtx, errhp: *mut OCIError, queue_name: *const u8,
        enqopt: *mut OCIAQEnqOptions, msgprop: *mut OCIAQMsgProperties, payload_tdo: *mut OCIType,
        payload: *mut *mut c_void, payload_ind: *mut *mut c_void, msgid: *mut *mut OCIRaw, flags: u32
    ) -> i32 = OCI_INVALID_HANDLE;
    fn OCIAQDeq(
        svchp: *mut OCISvcCtx, errhp: *mut OCIError, queue_name: *const u8,
        deqopt: *mut OCIAQDeqOptions, msgprop: *mut OCIAQMsgProperties, payload_tdo: *mut OCIType,
        payload: *mut *mut c_void, payload_ind: *mut *mut c_void, msgid: *mut *mut OCIRaw, flags: u32
    ) -> i32 = OCI_INVALID_HANDLE;
}
