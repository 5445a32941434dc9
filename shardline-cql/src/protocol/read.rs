use std::io;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{
    error::ReadLoopError,
    frame::{Envelope, EnvelopeHeader, OpCode, ENVELOPE_HEADER_SIZE},
};

pub async fn read_envelope(mut reader: impl AsyncRead + Unpin) -> io::Result<Envelope> {
    let mut header_buf = [0u8; ENVELOPE_HEADER_SIZE];
    reader.read_exact(&mut header_buf).await?;
    let header = EnvelopeHeader::deserialize(header_buf)?;
    const VOID: [u8; 4] = 0x0001i32.to_be_bytes();
    // Void results are frequent enough to avoid the allocation
    let body = if header.opcode == OpCode::Result && header.length as usize == VOID.len() {
        let mut buffer = [0; VOID.len()];
        reader.read_exact(&mut buffer).await?;
        if buffer == VOID {
            Bytes::from_static(&VOID)
        } else {
            Bytes::copy_from_slice(&buffer)
        }
    } else {
        let mut buffer = vec![0u8; header.length as usize];
        reader.read_exact(&mut buffer).await?;
        buffer.into()
    };
    Envelope::from_parts(header, body)
}

/// Reads envelopes until the reader fails or the callback returns an error.
pub async fn read_envelope_loop<E>(
    mut reader: impl AsyncRead + Unpin,
    mut callback: impl FnMut(Envelope) -> Result<(), E>,
) -> Result<(), ReadLoopError<E>> {
    loop {
        callback(read_envelope(&mut reader).await?).map_err(ReadLoopError::Callback)?;
    }
}
