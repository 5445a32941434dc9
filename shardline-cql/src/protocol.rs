//! Connection handshake, run before the connection is split into read and write halves.
use std::collections::HashMap;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::{
    cql_type::TypeParser,
    error::ConnectionError,
    protocol::read::read_envelope,
    request::{options::Options, startup::Startup, Request, RequestExt},
    response::{supported::Supported, Response, ResponseBody},
    utils::invalid_data,
    ProtocolVersion,
};

pub mod read;

fn invalid_response(body: ResponseBody) -> ConnectionError {
    invalid_data(format!("invalid response: {body:?}")).into()
}

async fn execute_v4(
    mut connection: impl AsyncWrite + AsyncRead + Unpin,
    version: ProtocolVersion,
    request: impl Request,
) -> Result<ResponseBody, ConnectionError> {
    let buffer = request.serialize_envelope_owned(version, false, 0)?;
    connection.write_all(&buffer).await?;
    connection.flush().await?;
    let envelope = read_envelope(connection).await?;
    if envelope.stream != 0 {
        return Err(invalid_data("stream mismatch").into());
    }
    let response = Response::deserialize(None, &TypeParser::default(), envelope)?;
    Ok(response.ok()?.body)
}

pub async fn get_supported(
    mut connection: impl AsyncWrite + AsyncRead + Unpin,
    version: ProtocolVersion,
) -> Result<Supported, ConnectionError> {
    match execute_v4(&mut connection, version, Options).await? {
        ResponseBody::Supported(supported) => Ok(supported),
        other => Err(invalid_response(other)),
    }
}

pub async fn startup(
    mut connection: impl AsyncWrite + AsyncRead + Unpin,
    version: ProtocolVersion,
    options: &HashMap<String, String>,
) -> Result<(), ConnectionError> {
    match execute_v4(&mut connection, version, Startup { options }).await? {
        ResponseBody::Ready => Ok(()),
        ResponseBody::Authenticate(authenticator) => {
            Err(ConnectionError::AuthenticationRequired(authenticator))
        }
        other => Err(invalid_response(other)),
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{duplex, AsyncReadExt};

    use super::*;
    use crate::{
        frame::{EnvelopeHeader, OpCode, ENVELOPE_HEADER_SIZE},
        VersionByte, SERVER_V4,
    };

    async fn reply(peer: &mut tokio::io::DuplexStream, opcode: OpCode, body: &[u8]) {
        let mut header = [0; ENVELOPE_HEADER_SIZE];
        peer.read_exact(&mut header).await.unwrap();
        let request = EnvelopeHeader::deserialize(header).unwrap();
        let mut request_body = vec![0; request.length as usize];
        peer.read_exact(&mut request_body).await.unwrap();
        let header = EnvelopeHeader {
            version: VersionByte(SERVER_V4),
            flags: Default::default(),
            stream: request.stream,
            opcode,
            length: body.len() as u32,
        };
        peer.write_all(&header.serialize()).await.unwrap();
        peer.write_all(body).await.unwrap();
    }

    #[tokio::test]
    async fn options_then_startup() {
        let (mut client, mut peer) = duplex(1024);
        let server = tokio::spawn(async move {
            let mut supported = vec![0, 1, 0, 12];
            supported.extend_from_slice(b"SCYLLA_SHARD");
            supported.extend_from_slice(&[0, 1, 0, 1, b'2']);
            reply(&mut peer, OpCode::Supported, &supported).await;
            reply(&mut peer, OpCode::Ready, &[]).await;
        });
        let supported = get_supported(&mut client, ProtocolVersion::V4).await.unwrap();
        assert_eq!(supported.get::<u16>("SCYLLA_SHARD"), Some(2));
        startup(&mut client, ProtocolVersion::V4, &HashMap::new())
            .await
            .unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn authentication_is_not_supported() {
        let (mut client, mut peer) = duplex(1024);
        let server = tokio::spawn(async move {
            let mut body = vec![0, 9];
            body.extend_from_slice(b"PasswordA");
            reply(&mut peer, OpCode::Authenticate, &body).await;
        });
        let error = startup(&mut client, ProtocolVersion::V4, &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(error, ConnectionError::AuthenticationRequired(name) if name == "PasswordA"));
        server.await.unwrap();
    }
}
