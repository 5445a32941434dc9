use std::io;

use crate::{
    cql::{ReadCql, ShortBytes},
    extensions::ProtocolExtensions,
    utils::invalid_data,
    LegacyConsistency,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, strum::FromRepr)]
#[repr(u32)]
#[non_exhaustive]
pub enum ErrorCode {
    ServerError = 0x0000,
    ProtocolError = 0x000A,
    AuthenticationError = 0x0100,
    Unavailable = 0x1000,
    Overloaded = 0x1001,
    IsBootstrapping = 0x1002,
    TruncateError = 0x1003,
    WriteTimeout = 0x1100,
    ReadTimeout = 0x1200,
    ReadFailure = 0x1300,
    FunctionFailure = 0x1400,
    WriteFailure = 0x1500,
    CdcWriteFailure = 0x1600,
    CasWriteUnknown = 0x1700,
    SyntaxError = 0x2000,
    Unauthorized = 0x2100,
    Invalid = 0x2200,
    ConfigError = 0x2300,
    AlreadyExists = 0x2400,
    Unprepared = 0x2500,
}

#[derive(Debug, thiserror::Error)]
#[error("{message} ({kind})")]
pub struct Error {
    pub code: Result<ErrorCode, u32>,
    pub message: String,
    pub kind: ErrorKind,
}

impl Error {
    pub fn deserialize(
        extensions: Option<&ProtocolExtensions>,
        mut slice: &[u8],
    ) -> io::Result<Self> {
        let error_code = u32::read_cql(&mut slice)?;
        let code = ErrorCode::from_repr(error_code).ok_or(error_code);
        let message = String::read_cql(&mut slice)?;
        let kind = ErrorKind::deserialize(extensions, code, slice)?;
        Ok(Self {
            code,
            message,
            kind,
        })
    }
}

/// Error details the driver branches on; other codes keep their raw trailing bytes.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    #[error("Already existing keyspace {keyspace:?} (table: {table:?})")]
    AlreadyExists { keyspace: String, table: String },
    #[error("Not enough alive nodes for {consistency} (required: {required}, alive: {alive})")]
    Unavailable {
        consistency: LegacyConsistency,
        required: u32,
        alive: u32,
    },
    #[error("Statement is not prepared on this node")]
    Unprepared { statement_id: Box<[u8]> },
    #[error("Partition rate limit reached (rejected by coordinator: {rejected_by_coordinator})")]
    RateLimitReached {
        is_write: bool,
        rejected_by_coordinator: bool,
    },
    #[error("Error code {code:#06x}")]
    Other { code: u32, details: Box<[u8]> },
}

impl ErrorKind {
    pub fn deserialize(
        extensions: Option<&ProtocolExtensions>,
        code: Result<ErrorCode, u32>,
        mut slice: &[u8],
    ) -> io::Result<Self> {
        let buf = &mut slice;
        Ok(match code {
            Ok(ErrorCode::AlreadyExists) => Self::AlreadyExists {
                keyspace: String::read_cql(buf)?,
                table: String::read_cql(buf)?,
            },
            Ok(ErrorCode::Unavailable) => Self::Unavailable {
                consistency: LegacyConsistency::read_cql(buf)?,
                required: u32::read_cql(buf)?,
                alive: u32::read_cql(buf)?,
            },
            Ok(ErrorCode::Unprepared) => Self::Unprepared {
                statement_id: ShortBytes::read_cql(buf)?.0.into(),
            },
            Err(code) if Some(code) == extensions.and_then(|ext| ext.rate_limit_error_code) => {
                let is_write = match u8::read_cql(buf)? {
                    0 => false,
                    1 => true,
                    op => return Err(invalid_data(format!("Invalid rate limit operation {op}"))),
                };
                Self::RateLimitReached {
                    is_write,
                    rejected_by_coordinator: bool::read_cql(buf)?,
                }
            }
            code => Self::Other {
                code: code.map_or_else(|code| code, |code| code as u32),
                details: (*buf).into(),
            },
        })
    }
}
