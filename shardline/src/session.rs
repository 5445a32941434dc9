use std::{
    fmt,
    net::SocketAddr,
    sync::{Arc, PoisonError, RwLock},
};

use shardline_cql::{
    cql_type::TypeParser,
    registry::Registry,
    request::prepare::Prepare,
    response::result::CqlResult,
    serialize::SerializedRow,
};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{
    connection::{config::ConnectionConfig, Connection},
    error::{
        DatabaseErrorCode, ExecutionError, KeyspaceError, ProtocolViolation, SessionError,
    },
    keyspace::{drop_keyspace_cql, use_keyspace_cql, KeyspaceBuilder},
    result_set::{into_result, PageFetcher, ResultKind, ResultSet, Statement},
    session::config::SessionConfig,
    sharding::ShardingInfo,
    statement::{options::QueryOptions, prepared::PreparedStatement, values::IntoValues},
    utils::{resolve_hostname, DEFAULT_PORT},
};

pub mod config;

struct SessionInner {
    connection: Arc<Connection>,
    registry: Arc<Registry>,
    options: QueryOptions,
    keyspace: RwLock<Option<Arc<str>>>,
}

/// Session over one connection, multiplexing concurrent requests.
///
/// The session is cheap to clone, clones sharing the same connection.
#[derive(Clone)]
pub struct Session(Arc<SessionInner>);

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("connection", &self.0.connection)
            .field("keyspace", &self.keyspace())
            .field("options", &self.0.options)
            .finish()
    }
}

impl Session {
    /// Connects to the contact point, then reconnects to the target shard if one is
    /// configured and the node is shard-aware.
    pub async fn connect(config: SessionConfig) -> Result<Self, SessionError> {
        let contact_point = config
            .contact_point
            .as_deref()
            .ok_or(SessionError::NoContactPoint)?;
        let address = match contact_point.parse::<SocketAddr>() {
            Ok(address) => address,
            Err(_) => match contact_point.parse() {
                Ok(ip) => SocketAddr::new(ip, DEFAULT_PORT),
                Err(_) => resolve_hostname(contact_point).await?,
            },
        };
        let parser = TypeParser::new(config.max_type_depth);
        let mut connection =
            Connection::open_tcp(address, None, &config.connection, parser).await?;
        if let Some(shard) = config.connection.target_shard {
            connection =
                connect_to_shard(connection, address, shard, &config.connection, parser).await;
        }
        Self::start(connection, config).await
    }

    /// Opens the session over an already established transport.
    pub async fn with_transport<T>(transport: T, config: SessionConfig) -> Result<Self, SessionError>
    where
        T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let parser = TypeParser::new(config.max_type_depth);
        let connection = Connection::open(transport, None, &config.connection, parser).await?;
        Self::start(connection, config).await
    }

    async fn start(connection: Connection, config: SessionConfig) -> Result<Self, SessionError> {
        let session = Self(Arc::new(SessionInner {
            connection: Arc::new(connection),
            registry: config.registry,
            options: config.query_options,
            keyspace: RwLock::new(None),
        }));
        if let Some(keyspace) = config.use_keyspace {
            if let Err(error) = session.use_keyspace(&keyspace).await {
                session.close().await;
                return Err(error.into());
            }
        }
        Ok(session)
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.0.registry
    }

    pub fn query_options(&self) -> &QueryOptions {
        &self.0.options
    }

    pub fn connection(&self) -> &Connection {
        &self.0.connection
    }

    /// Sharding of the connection, `None` if the node is not shard-aware.
    pub fn sharding(&self) -> Option<&ShardingInfo> {
        self.0.connection.sharding()
    }

    /// Keyspace set by the last `USE` statement.
    pub fn keyspace(&self) -> Option<Arc<str>> {
        self.0
            .keyspace
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn query(
        &self,
        statement: &str,
        values: impl IntoValues,
    ) -> Result<ResultSet, ExecutionError> {
        self.query_with(statement, values, self.0.options.clone())
            .await
    }

    pub async fn query_with(
        &self,
        statement: &str,
        values: impl IntoValues,
        options: QueryOptions,
    ) -> Result<ResultSet, ExecutionError> {
        let values = SerializedRow::from_values(&self.0.registry, &values.into_values())?;
        self.run(Statement::Query(statement.into()), values, options)
            .await
    }

    pub async fn prepare(&self, statement: &str) -> Result<PreparedStatement, ExecutionError> {
        let response = self
            .0
            .connection
            .execute(Prepare { statement }, false)
            .await?
            .ok()?;
        match into_result(response.body)? {
            CqlResult::Prepared(prepared) => Ok(PreparedStatement::new(statement, prepared)),
            other => Err(ProtocolViolation::UnexpectedResponse(format!("{other:?}")).into()),
        }
    }

    pub async fn execute(
        &self,
        prepared: &PreparedStatement,
        values: impl IntoValues,
    ) -> Result<ResultSet, ExecutionError> {
        self.execute_with(prepared, values, self.0.options.clone())
            .await
    }

    /// Binds the values against the prepared bind markers, then executes the statement.
    ///
    /// Nothing is sent if the values cannot be bound.
    pub async fn execute_with(
        &self,
        prepared: &PreparedStatement,
        values: impl IntoValues,
        options: QueryOptions,
    ) -> Result<ResultSet, ExecutionError> {
        let values = prepared.bind(&self.0.registry, &values.into_values())?;
        self.run(Statement::Prepared(prepared.clone()), values, options)
            .await
    }

    async fn run(
        &self,
        statement: Statement,
        values: SerializedRow,
        options: QueryOptions,
    ) -> Result<ResultSet, ExecutionError> {
        let fetcher = PageFetcher {
            connection: self.0.connection.clone(),
            statement,
            values,
            options,
        };
        let result = ResultSet::execute(fetcher, self.0.registry.clone()).await?;
        if let ResultKind::SetKeyspace(keyspace) = result.kind() {
            *self
                .0
                .keyspace
                .write()
                .unwrap_or_else(PoisonError::into_inner) = Some(keyspace.as_str().into());
        }
        Ok(result)
    }

    /// `DoesNotExist` is returned when the node rejects the keyspace as invalid.
    pub async fn use_keyspace(&self, keyspace: &str) -> Result<(), KeyspaceError> {
        let query = use_keyspace_cql(keyspace)?;
        self.keyspace_statement(&query, keyspace, Some(DatabaseErrorCode::Invalid))
            .await
    }

    pub async fn create_keyspace(&self, keyspace: &KeyspaceBuilder) -> Result<(), KeyspaceError> {
        let query = keyspace.to_cql()?;
        self.keyspace_statement(&query, keyspace.name(), None).await
    }

    pub async fn drop_keyspace(&self, keyspace: &str, if_exists: bool) -> Result<(), KeyspaceError> {
        let query = drop_keyspace_cql(keyspace, if_exists)?;
        self.keyspace_statement(&query, keyspace, Some(DatabaseErrorCode::ConfigError))
            .await
    }

    async fn keyspace_statement(
        &self,
        query: &str,
        keyspace: &str,
        does_not_exist: Option<DatabaseErrorCode>,
    ) -> Result<(), KeyspaceError> {
        #[cfg(feature = "tracing")]
        tracing::debug!(query, "keyspace statement");
        match self.query(query, ()).await {
            Ok(_) => Ok(()),
            Err(ExecutionError::Database(source)) => Err(match source.error.code {
                Ok(DatabaseErrorCode::AlreadyExists) => KeyspaceError::AlreadyExists {
                    keyspace: keyspace.into(),
                    source,
                },
                Ok(code) if Some(code) == does_not_exist => KeyspaceError::DoesNotExist {
                    keyspace: keyspace.into(),
                    source,
                },
                _ => KeyspaceError::Other(ExecutionError::Database(source)),
            }),
            Err(error) => Err(error.into()),
        }
    }

    /// Fails every pending request, then releases the connection.
    ///
    /// Result sets still being iterated fail on their next page fetch.
    pub async fn close(&self) {
        self.0.connection.close().await;
    }
}

/// Falls back to `connection` when the shard cannot be reached.
async fn connect_to_shard(
    connection: Connection,
    address: SocketAddr,
    shard: u16,
    config: &ConnectionConfig,
    parser: TypeParser,
) -> Connection {
    let Some(sharding) = connection.sharding() else {
        #[cfg(feature = "tracing")]
        tracing::warn!(shard, "node is not shard-aware");
        return connection;
    };
    if sharding.shard == shard {
        return connection;
    }
    let (Some(target), Some(port)) = (sharding.with_shard(shard), sharding.shard_aware_port)
    else {
        #[cfg(feature = "tracing")]
        tracing::warn!(shard, nr_shards = sharding.nr_shards.get(), "shard is not reachable");
        return connection;
    };
    let shard_address = SocketAddr::new(address.ip(), port);
    match Connection::open_tcp(shard_address, Some(&target), config, parser).await {
        Ok(sharded) if sharded.sharding().map(|s| s.shard) == Some(shard) => {
            connection.close().await;
            sharded
        }
        Ok(_sharded) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                shard,
                serving = ?_sharded.sharding().map(|s| s.shard),
                "connected to another shard"
            );
            _sharded.close().await;
            connection
        }
        Err(_error) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(shard, error = %_error, "shard-aware connection failed");
            connection
        }
    }
}
