//! Protocol v4 envelopes: a 9-byte header followed by the body.
use std::io;

use bytes::Bytes;
use enumflags2::{bitflags, BitFlags};

use crate::{
    cql::{ReadCql, WriteCql},
    utils::invalid_data,
    VersionByte,
};

pub const ENVELOPE_HEADER_SIZE: usize = 9;
pub const ENVELOPE_MAX_LENGTH: usize = (1 << 28) - 1;

#[derive(Debug, Copy, Clone, PartialEq, Eq, strum::FromRepr)]
#[repr(u8)]
#[non_exhaustive]
pub enum OpCode {
    Error = 0x00,
    Startup = 0x01,
    Ready = 0x02,
    Authenticate = 0x03,
    Options = 0x05,
    Supported = 0x06,
    Query = 0x07,
    Result = 0x08,
    Prepare = 0x09,
    Execute = 0x0A,
    Register = 0x0B,
    Event = 0x0C,
    Batch = 0x0D,
    AuthChallenge = 0x0E,
    AuthResponse = 0x0F,
    AuthSuccess = 0x10,
}

#[bitflags]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
#[non_exhaustive]
pub enum EnvelopeHeaderFlag {
    Compression = 0x01,
    Tracing = 0x02,
    CustomPayload = 0x04,
    Warnings = 0x08,
    UseBeta = 0x10,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct EnvelopeHeader {
    pub version: VersionByte,
    pub flags: BitFlags<EnvelopeHeaderFlag>,
    pub stream: i16,
    pub opcode: OpCode,
    pub length: u32,
}

impl EnvelopeHeader {
    pub fn serialize(self) -> [u8; ENVELOPE_HEADER_SIZE] {
        let mut buffer = [0; ENVELOPE_HEADER_SIZE];
        let buf = &mut &mut buffer[..];
        self.version.0.write_cql(buf);
        self.flags.write_cql(buf);
        self.stream.write_cql(buf);
        (self.opcode as u8).write_cql(buf);
        self.length.write_cql(buf);
        buffer
    }

    pub fn deserialize(buf: [u8; ENVELOPE_HEADER_SIZE]) -> io::Result<Self> {
        let buf = &mut &buf[..];
        let version = VersionByte(u8::read_cql(buf)?);
        // unknown flags are ignored
        let flags = BitFlags::from_bits_truncate(u8::read_cql(buf)?);
        let stream = i16::read_cql(buf)?;
        let raw_opcode = u8::read_cql(buf)?;
        let opcode = OpCode::from_repr(raw_opcode)
            .ok_or_else(|| invalid_data(format!("Invalid opcode {raw_opcode:#04x}")))?;
        let length = u32::read_cql(buf)?;
        if length as usize > ENVELOPE_MAX_LENGTH {
            return Err(invalid_data(format!("Envelope too big ({length} bytes)")));
        }
        Ok(Self {
            version,
            flags,
            stream,
            opcode,
            length,
        })
    }
}

/// A received envelope, which body is shared with the values decoded from it.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub version: VersionByte,
    pub flags: BitFlags<EnvelopeHeaderFlag>,
    pub stream: i16,
    pub opcode: OpCode,
    pub body: Bytes,
}

impl Envelope {
    pub fn from_parts(header: EnvelopeHeader, body: Bytes) -> io::Result<Self> {
        if body.len() != header.length as usize {
            return Err(invalid_data(format!(
                "Envelope body is {} bytes, header announced {}",
                body.len(),
                header.length
            )));
        }
        Ok(Self {
            version: header.version,
            flags: header.flags,
            stream: header.stream,
            opcode: header.opcode,
            body,
        })
    }

    /// Parses a complete envelope, header included.
    pub fn from_bytes(mut bytes: Bytes) -> io::Result<Self> {
        if bytes.len() < ENVELOPE_HEADER_SIZE {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        let body = bytes.split_off(ENVELOPE_HEADER_SIZE);
        let mut header = [0; ENVELOPE_HEADER_SIZE];
        header.copy_from_slice(&bytes);
        Self::from_parts(EnvelopeHeader::deserialize(header)?, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SERVER_V4, CLIENT_V4};

    #[test]
    fn header_layout() {
        let header = EnvelopeHeader {
            version: VersionByte(CLIENT_V4),
            flags: EnvelopeHeaderFlag::Tracing.into(),
            stream: 0x0102,
            opcode: OpCode::Query,
            length: 0x0A0B0C0D,
        };
        let bytes = header.serialize();
        assert_eq!(bytes, [0x04, 0x02, 0x01, 0x02, 0x07, 0x0A, 0x0B, 0x0C, 0x0D]);
        assert_eq!(EnvelopeHeader::deserialize(bytes).unwrap(), header);
    }

    #[test]
    fn invalid_opcode() {
        let bytes = [SERVER_V4, 0, 0, 0, 0x04, 0, 0, 0, 0];
        assert!(EnvelopeHeader::deserialize(bytes).is_err());
    }

    #[test]
    fn oversized_envelope() {
        let bytes = [SERVER_V4, 0, 0, 0, 0x02, 0x10, 0, 0, 0];
        assert!(EnvelopeHeader::deserialize(bytes).is_err());
    }

    #[test]
    fn body_length_must_match() {
        let mut bytes = vec![SERVER_V4, 0, 0, 1, 0x02, 0, 0, 0, 1];
        assert!(Envelope::from_bytes(Bytes::from(bytes.clone())).is_err());
        bytes.push(0);
        let envelope = Envelope::from_bytes(Bytes::from(bytes)).unwrap();
        assert_eq!(envelope.stream, 1);
        assert_eq!(envelope.opcode, OpCode::Ready);
        assert_eq!(&envelope.body[..], [0]);
    }
}
