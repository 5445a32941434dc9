use std::{collections::HashMap, io, sync::Arc, time::Duration};

use shardline_cql::options::ConnectionOptions;
use socket2::Socket;

use crate::connection::stream::MAX_STREAMS;

#[derive(derivative::Derivative, Clone)]
#[derivative(Debug)]
#[non_exhaustive]
pub struct ConnectionConfig {
    pub buffer_size: usize,
    pub connect_timeout: Duration,
    #[derivative(Debug = "ignore")]
    pub init_socket: Arc<dyn InitSocket>,
    /// Maximum number of requests in flight, at most 32768.
    pub max_streams: usize,
    pub startup_options: HashMap<String, String>,
    /// Shard to reach through the shard-aware port, when the node advertises one.
    pub target_shard: Option<u16>,
    pub tcp_keepalive: bool,
    pub tcp_nodelay: bool,
    pub write_queue_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        let mut startup_options = HashMap::new();
        startup_options.insert(ConnectionOptions::CqlVersion.to_string(), "3.0.0".into());
        if let Some(name) = option_env!("CARGO_PKG_NAME") {
            startup_options.insert(ConnectionOptions::DriverName.to_string(), name.into());
        }
        if let Some(version) = option_env!("CARGO_PKG_VERSION") {
            startup_options.insert(ConnectionOptions::DriverVersion.to_string(), version.into());
        }
        Self {
            buffer_size: 1 << 13,
            connect_timeout: Duration::from_secs(5),
            init_socket: Arc::new(|_: &mut Socket| -> io::Result<()> { Ok(()) }),
            max_streams: 1024,
            startup_options,
            target_shard: None,
            tcp_keepalive: true,
            tcp_nodelay: true,
            write_queue_capacity: 1024,
        }
    }
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn init_socket(mut self, init_socket: impl InitSocket + 'static) -> Self {
        self.init_socket = Arc::new(init_socket);
        self
    }

    pub fn max_streams(mut self, max_streams: usize) -> Self {
        self.max_streams = max_streams.clamp(1, MAX_STREAMS);
        self
    }

    pub fn startup_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.startup_options.insert(key.into(), value.into());
        self
    }

    pub fn target_shard(mut self, shard: u16) -> Self {
        self.target_shard = Some(shard);
        self
    }

    pub fn tcp_keepalive(mut self, keepalive: bool) -> Self {
        self.tcp_keepalive = keepalive;
        self
    }

    pub fn tcp_nodelay(mut self, nodelay: bool) -> Self {
        self.tcp_nodelay = nodelay;
        self
    }

    pub fn write_queue_capacity(mut self, capacity: usize) -> Self {
        self.write_queue_capacity = capacity.max(1);
        self
    }

    pub(crate) fn configure_socket(&self, socket: &mut Socket) -> io::Result<()> {
        socket.set_nodelay(self.tcp_nodelay)?;
        socket.set_keepalive(self.tcp_keepalive)?;
        self.init_socket.initialize_socket(socket)
    }
}

/// Additional socket setup, run before connecting.
pub trait InitSocket: Send + Sync {
    fn initialize_socket(&self, socket: &mut Socket) -> io::Result<()>;
}

impl<F> InitSocket for F
where
    F: Send + Sync + Fn(&mut Socket) -> io::Result<()>,
{
    fn initialize_socket(&self, socket: &mut Socket) -> io::Result<()> {
        self(socket)
    }
}
