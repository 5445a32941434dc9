#![warn(missing_debug_implementations)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod cql;
pub mod cql_type;
pub mod error;
pub mod extensions;
pub mod frame;
pub mod options;
#[cfg(feature = "protocol")]
pub mod protocol;
pub mod registry;
pub mod request;
pub mod response;
pub mod serialize;
mod utils;
pub mod value;

pub use crate::{
    cql::{Consistency, LegacyConsistency, SerialConsistency},
    cql_type::{CqlType, TypeCode},
    value::{CqlValue, MaybeValue},
};

pub const CLIENT_V4: u8 = 0x04;
pub const SERVER_V4: u8 = 0x84;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[non_exhaustive]
pub enum ProtocolVersion {
    #[default]
    V4,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VersionByte(pub u8);

impl ProtocolVersion {
    pub fn client(self) -> VersionByte {
        VersionByte(match self {
            Self::V4 => CLIENT_V4,
        })
    }

    pub fn server(self) -> VersionByte {
        VersionByte(match self {
            Self::V4 => SERVER_V4,
        })
    }
}
