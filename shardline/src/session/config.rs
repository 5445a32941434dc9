use std::sync::Arc;

use shardline_cql::{cql_type::TypeParser, registry::Registry, Consistency};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{
    connection::config::ConnectionConfig, error::SessionError, session::Session,
    statement::options::QueryOptions,
};

#[derive(Debug)]
#[non_exhaustive]
pub struct SessionConfig {
    /// `host:port`, `host` or `ip`; the port defaults to 9042.
    pub contact_point: Option<String>,
    pub connection: ConnectionConfig,
    /// Maximum nesting of the type descriptors sent by the node.
    pub max_type_depth: usize,
    pub query_options: QueryOptions,
    pub registry: Arc<Registry>,
    /// Keyspace to use once the connection is started.
    pub use_keyspace: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            contact_point: None,
            connection: ConnectionConfig::default(),
            max_type_depth: TypeParser::DEFAULT_MAX_DEPTH,
            query_options: QueryOptions::default(),
            registry: Arc::new(Registry::standard()),
            use_keyspace: None,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Default::default()
    }

    pub async fn connect(self) -> Result<Session, SessionError> {
        Session::connect(self).await
    }

    /// Opens the session over an already established transport, e.g. a TLS stream or an
    /// in-process peer.
    pub async fn connect_with_transport<T>(self, transport: T) -> Result<Session, SessionError>
    where
        T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        Session::with_transport(transport, self).await
    }

    pub fn contact_point(mut self, contact_point: impl Into<String>) -> Self {
        self.contact_point = Some(contact_point.into());
        self
    }

    pub fn connection(mut self, config: ConnectionConfig) -> Self {
        self.connection = config;
        self
    }

    pub fn max_type_depth(mut self, depth: usize) -> Self {
        self.max_type_depth = depth;
        self
    }

    pub fn query_options(mut self, options: QueryOptions) -> Self {
        self.query_options = options;
        self
    }

    pub fn consistency(mut self, consistency: Consistency) -> Self {
        self.query_options.consistency = consistency;
        self
    }

    pub fn page_size(mut self, page_size: i32) -> Self {
        self.query_options.page_size = Some(page_size);
        self
    }

    pub fn registry(mut self, registry: impl Into<Arc<Registry>>) -> Self {
        self.registry = registry.into();
        self
    }

    pub fn use_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.use_keyspace = Some(keyspace.into());
        self
    }
}
