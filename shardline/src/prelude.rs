pub use shardline_cql as cql;

pub use crate::{
    blocking::{BlockingResultSet, BlockingSession},
    connection::config::ConnectionConfig,
    error::{ErrorCategory, ExecutionError, KeyspaceError, SessionError},
    keyspace::{KeyspaceBuilder, ReplicationStrategy},
    result_set::{ResultKind, ResultSet},
    session::{config::SessionConfig, Session},
    sharding::ShardingInfo,
    statement::{options::QueryOptions, prepared::PreparedStatement, values::IntoValues},
};
