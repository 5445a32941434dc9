#![allow(unused)]
//! In-process node speaking the v4 framing over a tokio duplex stream.
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use bytes::{Buf, BufMut};
use shardline::{
    cql::{
        frame::{EnvelopeHeader, OpCode, ENVELOPE_HEADER_SIZE},
        VersionByte, SERVER_V4,
    },
    Session, SessionConfig,
};
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

pub const INT: u16 = 0x0009;
pub const TEXT: u16 = 0x000D;

pub fn init_tracing() {
    tracing_subscriber::fmt::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .try_init()
        .ok();
}

#[derive(Debug, Clone)]
pub struct Request {
    pub stream: i16,
    pub opcode: OpCode,
    pub body: Vec<u8>,
}

/// Parsed QUERY or EXECUTE body.
#[derive(Debug, Clone, Default)]
pub struct Statement {
    /// Query string, or prepared id for EXECUTE.
    pub statement: Vec<u8>,
    pub consistency: u16,
    pub skip_metadata: bool,
    pub values: Vec<Option<Vec<u8>>>,
    pub page_size: Option<i32>,
    pub paging_state: Option<Vec<u8>>,
}

impl Statement {
    pub fn text(&self) -> &str {
        std::str::from_utf8(&self.statement).unwrap()
    }

    /// Offset encoded in the paging state by [`paged_rows`].
    pub fn offset(&self) -> usize {
        self.paging_state
            .as_deref()
            .map_or(0, |mut state| state.get_u32() as usize)
    }
}

impl Request {
    pub fn statement(&self) -> Statement {
        let buf = &mut &self.body[..];
        let statement = match self.opcode {
            OpCode::Query => {
                let len = buf.get_i32() as usize;
                let statement = buf[..len].to_vec();
                buf.advance(len);
                statement
            }
            OpCode::Execute => {
                let len = buf.get_u16() as usize;
                let id = buf[..len].to_vec();
                buf.advance(len);
                id
            }
            opcode => panic!("unexpected {opcode:?}"),
        };
        let consistency = buf.get_u16();
        let flags = buf.get_u8();
        let mut values = Vec::new();
        if flags & 0x01 != 0 {
            for _ in 0..buf.get_u16() {
                let len = buf.get_i32();
                if len < 0 {
                    values.push(None);
                } else {
                    values.push(Some(buf[..len as usize].to_vec()));
                    buf.advance(len as usize);
                }
            }
        }
        let page_size = (flags & 0x04 != 0).then(|| buf.get_i32());
        let paging_state = (flags & 0x08 != 0).then(|| {
            let len = buf.get_i32() as usize;
            let state = buf[..len].to_vec();
            buf.advance(len);
            state
        });
        Statement {
            statement,
            consistency,
            skip_metadata: flags & 0x02 != 0,
            values,
            page_size,
            paging_state,
        }
    }

    pub fn reply(&self, opcode: OpCode, body: Vec<u8>) -> Reply {
        Reply::Envelope {
            stream: self.stream,
            opcode,
            body,
        }
    }

    pub fn result(&self, body: Vec<u8>) -> Reply {
        self.reply(OpCode::Result, body)
    }

    /// Database error reply, the AlreadyExists code carrying keyspace `ks`.
    pub fn error(&self, code: u32, message: &str) -> Reply {
        let mut body = code.to_be_bytes().to_vec();
        put_string(&mut body, message);
        if code == 0x2400 {
            put_string(&mut body, "ks");
            put_string(&mut body, "");
        }
        self.reply(OpCode::Error, body)
    }
}

#[derive(Debug)]
pub enum Reply {
    Envelope {
        stream: i16,
        opcode: OpCode,
        body: Vec<u8>,
    },
    /// Closes the transport.
    Close,
}

fn put_string(buf: &mut Vec<u8>, s: &str) {
    buf.put_u16(s.len() as u16);
    buf.put_slice(s.as_bytes());
}

pub fn void() -> Vec<u8> {
    vec![0, 0, 0, 1]
}

pub fn set_keyspace(keyspace: &str) -> Vec<u8> {
    let mut body = vec![0, 0, 0, 3];
    put_string(&mut body, keyspace);
    body
}

fn put_metadata(
    body: &mut Vec<u8>,
    columns: Option<&[(&str, u16)]>,
    count: usize,
    paging_state: Option<&[u8]>,
) {
    let mut flags = 0u32;
    if columns.is_some() {
        flags |= 0x0001;
    } else {
        flags |= 0x0004;
    }
    if paging_state.is_some() {
        flags |= 0x0002;
    }
    body.put_u32(flags);
    body.put_u32(count as u32);
    if let Some(state) = paging_state {
        body.put_i32(state.len() as i32);
        body.put_slice(state);
    }
    if let Some(columns) = columns {
        put_string(body, "ks");
        put_string(body, "tb");
        for (name, r#type) in columns {
            put_string(body, name);
            body.put_u16(*r#type);
        }
    }
}

/// Rows result; `columns` is `None` for a response without metadata.
pub fn rows(
    columns: Option<&[(&str, u16)]>,
    count: usize,
    rows: &[Vec<Option<Vec<u8>>>],
    paging_state: Option<&[u8]>,
) -> Vec<u8> {
    let mut body = vec![0, 0, 0, 2];
    put_metadata(&mut body, columns, count, paging_state);
    body.put_u32(rows.len() as u32);
    for row in rows {
        for cell in row {
            match cell {
                Some(bytes) => {
                    body.put_i32(bytes.len() as i32);
                    body.put_slice(bytes);
                }
                None => body.put_i32(-1),
            }
        }
    }
    body
}

pub fn int_rows(values: impl IntoIterator<Item = i32>, paging_state: Option<&[u8]>) -> Vec<u8> {
    let rows: Vec<_> = values
        .into_iter()
        .map(|value| vec![Some(value.to_be_bytes().to_vec())])
        .collect();
    self::rows(Some(&[("v", INT)]), 1, &rows, paging_state)
}

/// Page of `0..total`, starting from the offset in the request paging state.
pub fn paged_rows(statement: &Statement, total: i32) -> Vec<u8> {
    let offset = statement.offset() as i32;
    let page_size = statement.page_size.unwrap_or(i32::MAX);
    let end = offset.saturating_add(page_size).min(total);
    let paging_state = (end < total).then(|| (end as u32).to_be_bytes());
    int_rows(offset..end, paging_state.as_ref().map(|state| &state[..]))
}

pub fn prepared(id: &[u8], bind: &[(&str, u16)], result: Option<&[(&str, u16)]>) -> Vec<u8> {
    let mut body = vec![0, 0, 0, 4];
    body.put_u16(id.len() as u16);
    body.put_slice(id);
    body.put_u32(0x0001);
    body.put_u32(bind.len() as u32);
    body.put_i32(1);
    body.put_u16(0);
    put_string(&mut body, "ks");
    put_string(&mut body, "tb");
    for (name, r#type) in bind {
        put_string(&mut body, name);
        body.put_u16(*r#type);
    }
    match result {
        Some(columns) => put_metadata(&mut body, Some(columns), columns.len(), None),
        None => put_metadata(&mut body, None, 0, None),
    }
    body
}

async fn read_request(transport: &mut DuplexStream) -> Option<Request> {
    let mut header = [0; ENVELOPE_HEADER_SIZE];
    transport.read_exact(&mut header).await.ok()?;
    let header = EnvelopeHeader::deserialize(header).ok()?;
    let mut body = vec![0; header.length as usize];
    transport.read_exact(&mut body).await.ok()?;
    Some(Request {
        stream: header.stream,
        opcode: header.opcode,
        body,
    })
}

async fn write_envelope(
    transport: &mut DuplexStream,
    stream: i16,
    opcode: OpCode,
    body: &[u8],
) -> std::io::Result<()> {
    let header = EnvelopeHeader {
        version: VersionByte(SERVER_V4),
        flags: Default::default(),
        stream,
        opcode,
        length: body.len() as u32,
    };
    transport.write_all(&header.serialize()).await?;
    transport.write_all(body).await?;
    transport.flush().await
}

fn supported_body(options: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    body.put_u16(options.len() as u16);
    for (key, value) in options {
        put_string(&mut body, key);
        body.put_u16(1);
        put_string(&mut body, value);
    }
    body
}

/// Spawns the node task, returning the client side of the transport and the count of
/// requests received after the handshake.
pub fn spawn_peer<H>(supported: &[(&str, &str)], mut handler: H) -> (DuplexStream, Arc<AtomicUsize>)
where
    H: FnMut(Request) -> Vec<Reply> + Send + 'static,
{
    let (client, mut transport) = duplex(1 << 16);
    let supported = supported_body(supported);
    let requests = Arc::new(AtomicUsize::new(0));
    let counter = requests.clone();
    tokio::spawn(async move {
        let Some(options) = read_request(&mut transport).await else {
            return;
        };
        assert_eq!(options.opcode, OpCode::Options);
        write_envelope(&mut transport, options.stream, OpCode::Supported, &supported)
            .await
            .unwrap();
        let Some(startup) = read_request(&mut transport).await else {
            return;
        };
        assert_eq!(startup.opcode, OpCode::Startup);
        write_envelope(&mut transport, startup.stream, OpCode::Ready, &[])
            .await
            .unwrap();
        while let Some(request) = read_request(&mut transport).await {
            counter.fetch_add(1, Ordering::SeqCst);
            for reply in handler(request) {
                match reply {
                    Reply::Envelope {
                        stream,
                        opcode,
                        body,
                    } => {
                        if write_envelope(&mut transport, stream, opcode, &body)
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                    Reply::Close => return,
                }
            }
        }
    });
    (client, requests)
}

pub async fn mock_session_with<H>(
    config: SessionConfig,
    supported: &[(&str, &str)],
    handler: H,
) -> (Session, Arc<AtomicUsize>)
where
    H: FnMut(Request) -> Vec<Reply> + Send + 'static,
{
    init_tracing();
    let (transport, requests) = spawn_peer(supported, handler);
    let session = config.connect_with_transport(transport).await.unwrap();
    (session, requests)
}

pub async fn mock_session<H>(handler: H) -> (Session, Arc<AtomicUsize>)
where
    H: FnMut(Request) -> Vec<Reply> + Send + 'static,
{
    mock_session_with(SessionConfig::new(), &[], handler).await
}
