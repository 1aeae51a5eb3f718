//! Oracle Call Interface: constants, opaque types and the dynamically resolved API

#![allow(dead_code)]

#[macro_use]
mod dylib;
mod api;
pub(crate) mod ptr;
pub(crate) mod handle;
pub(crate) mod desc;
pub(crate) mod attr;

pub(crate) use api::*;
pub(crate) use ptr::Ptr;
pub(crate) use handle::Handle;
pub(crate) use desc::Descriptor;

use libc::c_void;

// Return Values
pub(crate) const OCI_SUCCESS             : i32 = 0;
pub(crate) const OCI_SUCCESS_WITH_INFO   : i32 = 1;
pub(crate) const OCI_NEED_DATA           : i32 = 99;
pub(crate) const OCI_NO_DATA             : i32 = 100;
pub(crate) const OCI_ERROR               : i32 = -1;
pub(crate) const OCI_INVALID_HANDLE      : i32 = -2;
pub(crate) const OCI_STILL_EXECUTING     : i32 = -3123;
pub(crate) const OCI_CONTINUE            : i32 = -24200;

// Handle Types
pub(crate) const OCI_HTYPE_ENV           : u32 = 1;
pub(crate) const OCI_HTYPE_ERROR         : u32 = 2;
pub(crate) const OCI_HTYPE_SVCCTX        : u32 = 3;
pub(crate) const OCI_HTYPE_STMT          : u32 = 4;
pub(crate) const OCI_HTYPE_BIND          : u32 = 5;
pub(crate) const OCI_HTYPE_DEFINE        : u32 = 6;
pub(crate) const OCI_HTYPE_DESCRIBE      : u32 = 7;
pub(crate) const OCI_HTYPE_SERVER        : u32 = 8;
pub(crate) const OCI_HTYPE_SESSION       : u32 = 9;

// Descriptor Types
pub(crate) const OCI_DTYPE_LOB           : u32 = 50;
pub(crate) const OCI_DTYPE_PARAM         : u32 = 53;
pub(crate) const OCI_DTYPE_FILE          : u32 = 56;
pub(crate) const OCI_DTYPE_AQENQ_OPTIONS : u32 = 57;
pub(crate) const OCI_DTYPE_AQDEQ_OPTIONS : u32 = 58;
pub(crate) const OCI_DTYPE_AQMSG_PROPERTIES : u32 = 59;
pub(crate) const OCI_DTYPE_INTERVAL_DS   : u32 = 63;

// Attribute Types
pub(crate) const OCI_ATTR_DATA_SIZE      : u32 = 1;
pub(crate) const OCI_ATTR_DATA_TYPE      : u32 = 2;
pub(crate) const OCI_ATTR_NAME           : u32 = 4;
pub(crate) const OCI_ATTR_PRECISION      : u32 = 5;
pub(crate) const OCI_ATTR_SCALE          : u32 = 6;
pub(crate) const OCI_ATTR_IS_NULL        : u32 = 7;
pub(crate) const OCI_ATTR_SERVER         : u32 = 6;
pub(crate) const OCI_ATTR_SESSION        : u32 = 7;
pub(crate) const OCI_ATTR_ROW_COUNT      : u32 = 9;
pub(crate) const OCI_ATTR_PARAM_COUNT    : u32 = 18;
pub(crate) const OCI_ATTR_USERNAME       : u32 = 22;
pub(crate) const OCI_ATTR_PASSWORD       : u32 = 23;
pub(crate) const OCI_ATTR_STMT_TYPE      : u32 = 24;
pub(crate) const OCI_ATTR_INTERNAL_NAME  : u32 = 25;
pub(crate) const OCI_ATTR_EXTERNAL_NAME  : u32 = 26;
pub(crate) const OCI_ATTR_CHARSET_ID     : u32 = 31;
pub(crate) const OCI_ATTR_CHARSET_FORM   : u32 = 32;
pub(crate) const OCI_ATTR_MAXDATA_SIZE   : u32 = 33;
pub(crate) const OCI_ATTR_VISIBILITY     : u32 = 47;
pub(crate) const OCI_ATTR_RELATIVE_MSGID : u32 = 48;
pub(crate) const OCI_ATTR_SEQUENCE_DEVIATION : u32 = 49;
pub(crate) const OCI_ATTR_CONSUMER_NAME  : u32 = 50;
pub(crate) const OCI_ATTR_DEQ_MODE       : u32 = 51;
pub(crate) const OCI_ATTR_NAVIGATION     : u32 = 52;
pub(crate) const OCI_ATTR_WAIT           : u32 = 53;
pub(crate) const OCI_ATTR_DEQ_MSGID      : u32 = 54;
pub(crate) const OCI_ATTR_PRIORITY       : u32 = 55;
pub(crate) const OCI_ATTR_DELAY          : u32 = 56;
pub(crate) const OCI_ATTR_EXPIRATION     : u32 = 57;
pub(crate) const OCI_ATTR_CORRELATION    : u32 = 58;
pub(crate) const OCI_ATTR_ATTEMPTS       : u32 = 59;
pub(crate) const OCI_ATTR_EXCEPTION_QUEUE : u32 = 61;
pub(crate) const OCI_ATTR_PARSE_ERROR_OFFSET : u32 = 129;
pub(crate) const OCI_ATTR_NCHARSET_ID    : u32 = 262;
pub(crate) const OCI_ATTR_CHAR_SIZE      : u32 = 286;
pub(crate) const OCI_ATTR_DRIVER_NAME    : u32 = 424;

// Charset
pub(crate) const AL32UTF8                : u16 = 873;
pub(crate) const UTF8                    : u16 = 871;

// Character Set Forms
pub(crate) const SQLCS_IMPLICIT          : u8 = 1;
pub(crate) const SQLCS_NCHAR             : u8 = 2;

// Indicator values
pub(crate) const OCI_IND_NOTNULL         : i16 = 0;
pub(crate) const OCI_IND_NULL            : i16 = -1;

// Modes
pub(crate) const OCI_DEFAULT             : u32 = 0;
pub(crate) const OCI_THREADED            : u32 = 0x00000001;
pub(crate) const OCI_OBJECT              : u32 = 0x00000002;
pub(crate) const OCI_SYSDBA              : u32 = 0x00000002;
pub(crate) const OCI_SYSOPER             : u32 = 0x00000004;
pub(crate) const OCI_STMT_CACHE          : u32 = 0x00000040;
pub(crate) const OCI_DATA_AT_EXEC        : u32 = 0x00000002;

// Execution Modes
pub(crate) const OCI_DESCRIBE_ONLY       : u32 = 0x00000010;
pub(crate) const OCI_COMMIT_ON_SUCCESS   : u32 = 0x00000020;
pub(crate) const OCI_PARSE_ONLY          : u32 = 0x00000100;

// Fetch orientation
pub(crate) const OCI_FETCH_NEXT          : u16 = 0x00000002;

// Credentials
pub(crate) const OCI_CRED_RDBMS          : u32 = 1;
pub(crate) const OCI_CRED_EXT            : u32 = 2;

// Statement language
pub(crate) const OCI_NTV_SYNTAX          : u32 = 1;

// Statement Types
pub(crate) const OCI_STMT_SELECT         : u16 = 1;
pub(crate) const OCI_STMT_UPDATE         : u16 = 2;
pub(crate) const OCI_STMT_DELETE         : u16 = 3;
pub(crate) const OCI_STMT_INSERT         : u16 = 4;
pub(crate) const OCI_STMT_CREATE         : u16 = 5;
pub(crate) const OCI_STMT_DROP           : u16 = 6;
pub(crate) const OCI_STMT_ALTER          : u16 = 7;
pub(crate) const OCI_STMT_BEGIN          : u16 = 8;
pub(crate) const OCI_STMT_DECLARE        : u16 = 9;
pub(crate) const OCI_STMT_CALL           : u16 = 10;
pub(crate) const OCI_STMT_MERGE          : u16 = 16;

// NLS
pub(crate) const OCI_NLS_CHARSET_FIXEDWIDTH : u16 = 90;
pub(crate) const OCI_NLS_CHARSET_MAXBYTESZ  : u16 = 91;
pub(crate) const OCI_NLS_CS_ORA_TO_IANA     : u32 = 1;
pub(crate) const OCI_NLS_MAXBUFSZ           : usize = 100;

// LOBs
pub(crate) const OCI_TEMP_BLOB           : u8 = 1;
pub(crate) const OCI_TEMP_CLOB           : u8 = 2;
pub(crate) const OCI_FILE_READONLY       : u8 = 1;
pub(crate) const OCI_LOB_READONLY        : u8 = 1;
pub(crate) const OCI_LOB_READWRITE       : u8 = 2;
pub(crate) const OCI_ONE_PIECE           : u8 = 0;

// Number sign flags
pub(crate) const OCI_NUMBER_SIGNED       : u32 = 2;

// Durations
pub(crate) const OCI_DURATION_SESSION    : u16 = 10;

// Type pin options
pub(crate) const OCI_TYPEGET_HEADER      : u32 = 0;

// Advanced queuing
pub(crate) const OCI_DEQ_BROWSE          : u32 = 1;
pub(crate) const OCI_DEQ_LOCKED          : u32 = 2;
pub(crate) const OCI_DEQ_REMOVE          : u32 = 3;
pub(crate) const OCI_DEQ_REMOVE_NODATA   : u32 = 4;
pub(crate) const OCI_DEQ_FIRST_MSG       : u32 = 1;
pub(crate) const OCI_DEQ_NEXT_TRANSACTION : u32 = 2;
pub(crate) const OCI_DEQ_NEXT_MSG        : u32 = 3;
pub(crate) const OCI_DEQ_WAIT_FOREVER    : i32 = -1;
pub(crate) const OCI_DEQ_NO_WAIT         : i32 = 0;
pub(crate) const OCI_ENQ_IMMEDIATE       : u32 = 1;
pub(crate) const OCI_ENQ_ON_COMMIT       : u32 = 2;

// Server version handle kinds
pub(crate) const OCI_HTYPE_SVCCTX_UB1    : u8 = 3;

// Data Types
pub(crate) const SQLT_CHR                : u16 = 1;
pub(crate) const SQLT_NUM                : u16 = 2;
pub(crate) const SQLT_INT                : u16 = 3;
pub(crate) const SQLT_VNU                : u16 = 6;
pub(crate) const SQLT_LNG                : u16 = 8;
pub(crate) const SQLT_DAT                : u16 = 12;
pub(crate) const SQLT_BFLOAT             : u16 = 21;
pub(crate) const SQLT_BDOUBLE            : u16 = 22;
pub(crate) const SQLT_BIN                : u16 = 23;
pub(crate) const SQLT_LBI                : u16 = 24;
pub(crate) const SQLT_LVC                : u16 = 94;
pub(crate) const SQLT_LVB                : u16 = 95;
pub(crate) const SQLT_AFC                : u16 = 96;
pub(crate) const SQLT_IBFLOAT            : u16 = 100;
pub(crate) const SQLT_IBDOUBLE           : u16 = 101;
pub(crate) const SQLT_RDD                : u16 = 104;
pub(crate) const SQLT_CLOB               : u16 = 112;
pub(crate) const SQLT_BLOB               : u16 = 113;
pub(crate) const SQLT_BFILE              : u16 = 114;
pub(crate) const SQLT_RSET               : u16 = 116;
pub(crate) const SQLT_ODT                : u16 = 156;
pub(crate) const SQLT_DATE               : u16 = 184;
pub(crate) const SQLT_TIMESTAMP          : u16 = 187;
pub(crate) const SQLT_TIMESTAMP_TZ       : u16 = 188;
pub(crate) const SQLT_INTERVAL_DS        : u16 = 190;
pub(crate) const SQLT_TIMESTAMP_LTZ      : u16 = 232;

// Error codes the driver inspects
pub(crate) const ORA_NOT_ALL_VARIABLES_BOUND : i32 = 1008;
pub(crate) const ORA_NO_MESSAGE_AVAILABLE    : i32 = 25228;

macro_rules! opaque {
    ($($name:ident),+) => {
        $(
            #[repr(C)] pub struct $name { _private: [u8; 0] }
        )+
    };
}

opaque!(
    OCIEnv, OCIError, OCISvcCtx, OCIStmt, OCIBind, OCIDefine, OCIServer, OCISession,
    OCIParam, OCILobLocator, OCIInterval, OCISnapshot, OCIType, OCIRaw,
    OCIAQEnqOptions, OCIAQDeqOptions, OCIAQMsgProperties
);

/// C mapping of the Oracle NUMBER
#[repr(C)]
#[derive(Clone, Copy)]
pub struct OCINumber {
    pub(crate) bytes: [u8; 22],
}

impl OCINumber {
    pub(crate) fn new() -> Self {
        Self { bytes: [0; 22] }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct OCITime {
    pub(crate) hh: u8,
    pub(crate) mi: u8,
    pub(crate) ss: u8,
}

/// C mapping of the Oracle DATE type (SQLT_ODT)
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct OCIDate {
    pub(crate) year: i16,
    pub(crate) month: u8,
    pub(crate) day: u8,
    pub(crate) time: OCITime,
}

pub(crate) type OCICallbackLobRW = *mut c_void;
