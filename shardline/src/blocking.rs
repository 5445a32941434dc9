//! Synchronous facade, driving the async API on a runtime owned by the session.
//!
//! Calls block the current thread until the underlying operation completes; they must not
//! be made from inside an async context.
use std::sync::Arc;

use shardline_cql::response::result::rows::{DecodedRow, PagingState};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    runtime::Runtime,
};

use crate::{
    error::{ExecutionError, KeyspaceError, SessionError},
    keyspace::KeyspaceBuilder,
    result_set::{ResultKind, ResultSet},
    session::{config::SessionConfig, Session},
    sharding::ShardingInfo,
    statement::{options::QueryOptions, prepared::PreparedStatement, values::IntoValues},
};

fn runtime() -> Result<Arc<Runtime>, SessionError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("shardline")
        .build()?;
    Ok(Arc::new(runtime))
}

#[derive(Debug, Clone)]
pub struct BlockingSession {
    runtime: Arc<Runtime>,
    session: Session,
}

impl BlockingSession {
    pub fn connect(config: SessionConfig) -> Result<Self, SessionError> {
        let runtime = runtime()?;
        let session = runtime.block_on(Session::connect(config))?;
        Ok(Self { runtime, session })
    }

    /// The transport is created inside the session runtime, which its IO resources are
    /// bound to.
    pub fn with_transport<T, F>(make_transport: F, config: SessionConfig) -> Result<Self, SessionError>
    where
        F: FnOnce() -> T,
        T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let runtime = runtime()?;
        let transport = {
            let _guard = runtime.enter();
            make_transport()
        };
        let session = runtime.block_on(Session::with_transport(transport, config))?;
        Ok(Self { runtime, session })
    }

    /// Async session sharing the same connection.
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    pub fn sharding(&self) -> Option<&ShardingInfo> {
        self.session.sharding()
    }

    pub fn keyspace(&self) -> Option<Arc<str>> {
        self.session.keyspace()
    }

    fn result_set(
        &self,
        result: Result<ResultSet, ExecutionError>,
    ) -> Result<BlockingResultSet, ExecutionError> {
        Ok(BlockingResultSet {
            runtime: self.runtime.clone(),
            inner: result?,
        })
    }

    pub fn query(
        &self,
        statement: &str,
        values: impl IntoValues,
    ) -> Result<BlockingResultSet, ExecutionError> {
        self.result_set(self.runtime.block_on(self.session.query(statement, values)))
    }

    pub fn query_with(
        &self,
        statement: &str,
        values: impl IntoValues,
        options: QueryOptions,
    ) -> Result<BlockingResultSet, ExecutionError> {
        let result = self
            .runtime
            .block_on(self.session.query_with(statement, values, options));
        self.result_set(result)
    }

    pub fn prepare(&self, statement: &str) -> Result<PreparedStatement, ExecutionError> {
        self.runtime.block_on(self.session.prepare(statement))
    }

    pub fn execute(
        &self,
        prepared: &PreparedStatement,
        values: impl IntoValues,
    ) -> Result<BlockingResultSet, ExecutionError> {
        self.result_set(self.runtime.block_on(self.session.execute(prepared, values)))
    }

    pub fn execute_with(
        &self,
        prepared: &PreparedStatement,
        values: impl IntoValues,
        options: QueryOptions,
    ) -> Result<BlockingResultSet, ExecutionError> {
        let result = self
            .runtime
            .block_on(self.session.execute_with(prepared, values, options));
        self.result_set(result)
    }

    pub fn use_keyspace(&self, keyspace: &str) -> Result<(), KeyspaceError> {
        self.runtime.block_on(self.session.use_keyspace(keyspace))
    }

    pub fn create_keyspace(&self, keyspace: &KeyspaceBuilder) -> Result<(), KeyspaceError> {
        self.runtime.block_on(self.session.create_keyspace(keyspace))
    }

    pub fn drop_keyspace(&self, keyspace: &str, if_exists: bool) -> Result<(), KeyspaceError> {
        self.runtime
            .block_on(self.session.drop_keyspace(keyspace, if_exists))
    }

    pub fn close(&self) {
        self.runtime.block_on(self.session.close());
    }
}

/// Iterator over the rows of a result set, fetching the pages synchronously.
#[derive(Debug)]
pub struct BlockingResultSet {
    runtime: Arc<Runtime>,
    inner: ResultSet,
}

impl BlockingResultSet {
    pub fn kind(&self) -> &ResultKind {
        self.inner.kind()
    }

    pub fn is_exhausted(&self) -> bool {
        self.inner.is_exhausted()
    }

    pub fn try_take_next(&self) -> Result<Option<DecodedRow>, ExecutionError> {
        self.inner.try_take_next()
    }

    pub fn fetch_more_results(&self) -> Result<bool, ExecutionError> {
        self.runtime.block_on(self.inner.fetch_more_results())
    }

    pub fn paging_state(&self) -> Option<PagingState> {
        self.runtime.block_on(self.inner.paging_state())
    }

    pub fn into_inner(self) -> ResultSet {
        self.inner
    }
}

impl Iterator for BlockingResultSet {
    type Item = Result<DecodedRow, ExecutionError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.runtime.block_on(self.inner.next()).transpose()
    }
}
