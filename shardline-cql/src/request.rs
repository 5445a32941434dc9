//! Request bodies and their envelope serialization.
use bytes::BufMut;

use crate::{
    error::{FrameTooBig, InvalidRequest, ValueTooLarge},
    frame::{EnvelopeHeader, EnvelopeHeaderFlag, OpCode, ENVELOPE_HEADER_SIZE, ENVELOPE_MAX_LENGTH},
    utils::flags,
    ProtocolVersion,
};

pub mod execute;
pub mod options;
pub mod prepare;
pub mod query;
pub mod startup;

pub trait Request {
    fn opcode(&self) -> OpCode;
    fn serialized_size(&self) -> Result<usize, ValueTooLarge>;
    fn serialize(&self, slice: &mut [u8]);
}

impl<T> Request for &T
where
    T: ?Sized + Request,
{
    fn opcode(&self) -> OpCode {
        T::opcode(self)
    }

    fn serialized_size(&self) -> Result<usize, ValueTooLarge> {
        T::serialized_size(self)
    }

    fn serialize(&self, slice: &mut [u8]) {
        T::serialize(self, slice);
    }
}

pub trait RequestExt: Request {
    fn serialized_envelope_size(&self) -> Result<usize, ValueTooLarge> {
        Ok(ENVELOPE_HEADER_SIZE + self.serialized_size()?)
    }

    /// `slice` must be exactly [`serialized_envelope_size`](Self::serialized_envelope_size)
    /// long.
    fn serialize_envelope(
        &self,
        version: ProtocolVersion,
        tracing: bool,
        stream: i16,
        mut slice: &mut [u8],
    ) {
        let header = EnvelopeHeader {
            version: version.client(),
            flags: flags!(EnvelopeHeaderFlag::Tracing: tracing),
            stream,
            opcode: self.opcode(),
            length: (slice.len() - ENVELOPE_HEADER_SIZE) as u32,
        };
        slice.put_slice(&header.serialize());
        self.serialize(slice);
    }

    fn serialize_envelope_owned(
        &self,
        version: ProtocolVersion,
        tracing: bool,
        stream: i16,
    ) -> Result<Vec<u8>, InvalidRequest> {
        let size = self.serialized_envelope_size()?;
        if size - ENVELOPE_HEADER_SIZE > ENVELOPE_MAX_LENGTH {
            return Err(FrameTooBig(size).into());
        }
        let mut vec = vec![0; size];
        self.serialize_envelope(version, tracing, stream, &mut vec);
        Ok(vec)
    }
}

impl<T> RequestExt for T where T: Request {}
