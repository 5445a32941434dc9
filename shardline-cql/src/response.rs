use std::{collections::HashMap, io, result::Result as StdResult};

use bytes::Bytes;
use uuid::Uuid;

use crate::{
    cql::ReadCql,
    cql_type::TypeParser,
    error::DatabaseError,
    extensions::ProtocolExtensions,
    frame::{Envelope, EnvelopeHeaderFlag, OpCode},
    response::{error::Error, result::Result, supported::Supported},
    utils::invalid_data,
};

pub mod error;
pub mod result;
pub mod supported;

#[derive(Debug)]
pub struct Response {
    pub tracing_id: Option<Uuid>,
    pub custom_payload: HashMap<String, Vec<u8>>,
    pub warnings: Vec<String>,
    pub body: ResponseBody,
}

impl Response {
    pub fn deserialize(
        extensions: Option<&ProtocolExtensions>,
        parser: &TypeParser,
        envelope: Envelope,
    ) -> io::Result<Self> {
        if envelope.flags.contains(EnvelopeHeaderFlag::Compression) {
            return Err(invalid_data("Compressed envelope, but no compression was negotiated"));
        }
        let bytes = envelope.body;
        let buf = &mut &bytes[..];
        let tracing_id = envelope
            .flags
            .contains(EnvelopeHeaderFlag::Tracing)
            .then(|| ReadCql::read_cql(buf))
            .transpose()?;
        let warnings = envelope
            .flags
            .contains(EnvelopeHeaderFlag::Warnings)
            .then(|| ReadCql::read_cql(buf))
            .transpose()?
            .unwrap_or_default();
        let custom_payload = envelope
            .flags
            .contains(EnvelopeHeaderFlag::CustomPayload)
            .then(|| ReadCql::read_cql(buf))
            .transpose()?
            .unwrap_or_default();
        let offset = bytes.len() - buf.len();
        let body = ResponseBody::deserialize(extensions, parser, envelope.opcode, bytes, offset)?;
        Ok(Response {
            tracing_id,
            custom_payload,
            warnings,
            body,
        })
    }

    pub fn ok(self) -> StdResult<Self, Box<DatabaseError>> {
        match self.body {
            ResponseBody::Error(error) => Err(Box::new(DatabaseError {
                error,
                tracing_id: self.tracing_id,
                custom_payload: self.custom_payload,
                warnings: self.warnings,
            })),
            body => Ok(Self { body, ..self }),
        }
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum ResponseBody {
    Error(Error),
    Ready,
    Result(Result),
    /// Only the authenticator name is kept, authentication is not supported.
    Authenticate(String),
    Supported(Supported),
}

impl ResponseBody {
    pub fn deserialize(
        extensions: Option<&ProtocolExtensions>,
        parser: &TypeParser,
        opcode: OpCode,
        envelope: Bytes,
        offset: usize,
    ) -> io::Result<ResponseBody> {
        let mut slice = &envelope[offset..];
        Ok(match opcode {
            OpCode::Error => ResponseBody::Error(Error::deserialize(extensions, slice)?),
            OpCode::Ready => ResponseBody::Ready,
            OpCode::Result => {
                ResponseBody::Result(Result::deserialize(extensions, parser, envelope, offset)?)
            }
            OpCode::Authenticate => ResponseBody::Authenticate(String::read_cql(&mut slice)?),
            OpCode::Supported => ResponseBody::Supported(Supported::deserialize(slice)?),
            opcode => return Err(format!("Unexpected opcode {opcode:?}")).map_err(invalid_data),
        })
    }
}
