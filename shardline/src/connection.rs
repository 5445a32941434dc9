use std::{
    collections::HashMap,
    fmt, io,
    net::SocketAddr,
    sync::{Arc, Mutex, PoisonError},
};

use shardline_cql::{
    cql_type::TypeParser,
    extensions::ProtocolExtensions,
    protocol::{get_supported, read::read_envelope_loop, startup},
    request::{Request, RequestExt},
    response::Response,
    ProtocolVersion,
};
use tokio::{
    io::{AsyncRead, AsyncWrite, BufReader},
    sync::{mpsc, Notify},
    task::JoinHandle,
};

use crate::{
    connection::{config::ConnectionConfig, stream::StreamPool},
    error::{ConnectionError, ProtocolViolation, RequestError},
    sharding::ShardingInfo,
};

pub mod config;
mod stream;
pub(crate) mod tcp;
mod write;

/// A started connection, multiplexing requests over protocol streams.
///
/// Envelopes are written by a dedicated task, and responses are dispatched to their pending
/// request by a read task.
pub struct Connection {
    address: Option<SocketAddr>,
    version: ProtocolVersion,
    extensions: ProtocolExtensions,
    parser: TypeParser,
    sharding: Option<ShardingInfo>,
    stream_pool: Arc<StreamPool>,
    write_queue: mpsc::Sender<Vec<u8>>,
    shutdown: Arc<Notify>,
    read_task: JoinHandle<()>,
    write_task: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.address)
            .field("version", &self.version)
            .field("extensions", &self.extensions)
            .field("sharding", &self.sharding)
            .field("closed", &self.stream_pool.is_closed())
            .finish()
    }
}

impl Connection {
    pub(crate) async fn open_tcp(
        address: SocketAddr,
        shard: Option<&ShardingInfo>,
        config: &ConnectionConfig,
        parser: TypeParser,
    ) -> Result<Self, ConnectionError> {
        let open = async {
            let stream = tcp::connect(address, shard, config).await?;
            Self::open(stream, Some(address), config, parser).await
        };
        tokio::time::timeout(config.connect_timeout, open).await?
    }

    /// Runs the startup handshake on `transport`, then spawns the read and write tasks.
    pub(crate) async fn open<T>(
        mut transport: T,
        address: Option<SocketAddr>,
        config: &ConnectionConfig,
        parser: TypeParser,
    ) -> Result<Self, ConnectionError>
    where
        T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let version = ProtocolVersion::V4;
        let supported = get_supported(&mut transport, version).await?;
        let extensions = ProtocolExtensions::from_supported(&supported);
        let sharding = ShardingInfo::from_supported(&supported);
        let mut options: HashMap<String, String> = config.startup_options.clone();
        options.extend(
            extensions
                .startup_options()
                .map(|(key, value)| (key.to_string(), value)),
        );
        #[cfg(feature = "tracing")]
        tracing::debug!(?options, "startup");
        startup(&mut transport, version, &options).await?;
        #[cfg(feature = "tracing")]
        tracing::debug!(?address, shard = sharding.as_ref().map(|s| s.shard), "connection opened");
        let stream_pool = Arc::new(StreamPool::new(config.max_streams));
        let (reader, writer) = tokio::io::split(transport);
        let (write_queue, queue) = mpsc::channel(config.write_queue_capacity);
        let shutdown = Arc::new(Notify::new());
        let read_task = tokio::spawn(read_task(
            BufReader::with_capacity(config.buffer_size, reader),
            stream_pool.clone(),
        ));
        let write_task = tokio::spawn(write::write_task(
            writer,
            config.buffer_size,
            queue,
            shutdown.clone(),
            stream_pool.clone(),
        ));
        Ok(Self {
            address,
            version,
            extensions,
            parser,
            sharding,
            stream_pool,
            write_queue,
            shutdown,
            read_task,
            write_task: Mutex::new(Some(write_task)),
        })
    }

    pub fn address(&self) -> Option<SocketAddr> {
        self.address
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn extensions(&self) -> &ProtocolExtensions {
        &self.extensions
    }

    pub fn sharding(&self) -> Option<&ShardingInfo> {
        self.sharding.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.stream_pool.is_closed()
    }

    pub(crate) async fn execute(
        &self,
        request: impl Request,
        with_tracing: bool,
    ) -> Result<Response, RequestError> {
        let mut stream = self.stream_pool.allocate()?;
        let envelope = request.serialize_envelope_owned(self.version, with_tracing, stream.id())?;
        #[cfg(feature = "tracing")]
        tracing::trace!(
            stream = stream.id(),
            opcode = ?request.opcode(),
            length = envelope.len(),
            "send envelope"
        );
        self.write_queue
            .send(envelope)
            .await
            .map_err(|_| RequestError::ConnectionClosed)?;
        stream.set_sent();
        let envelope = stream.response().await?;
        Response::deserialize(Some(&self.extensions), &self.parser, envelope)
            .map_err(|err| ProtocolViolation::from(err).into())
    }

    /// Fails every pending request, then releases the transport.
    pub async fn close(&self) {
        self.stream_pool.close(|| RequestError::ConnectionClosed);
        self.shutdown.notify_one();
        let write_task = self
            .write_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(write_task) = write_task {
            write_task.await.ok();
        }
        self.read_task.abort();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.read_task.abort();
    }
}

/// Dispatches responses until the transport fails, then fails every pending request.
async fn read_task(reader: impl AsyncRead + Unpin, stream_pool: Arc<StreamPool>) {
    let result = read_envelope_loop(reader, |envelope| {
        #[cfg(feature = "tracing")]
        tracing::trace!(
            stream = envelope.stream,
            opcode = ?envelope.opcode,
            length = envelope.body.len(),
            "receive envelope"
        );
        // a completion that can't be matched is dropped, the connection stays usable
        if let Err(_error) = stream_pool.complete(envelope) {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_error, "dropped completion");
        }
        Ok::<_, io::Error>(())
    })
    .await;
    let error = match result {
        Ok(()) => io::Error::from(io::ErrorKind::UnexpectedEof),
        Err(error) => error.into_inner(),
    };
    #[cfg(feature = "tracing")]
    if !stream_pool.is_closed() {
        tracing::warn!(%error, "connection read failed");
    }
    stream_pool.close(|| RequestError::TransportFailure(io::Error::new(error.kind(), error.to_string())));
}
