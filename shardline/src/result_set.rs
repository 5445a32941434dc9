//! Paged, forward-only cursor over the rows of a result.
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use bytes::Bytes;
use futures::Stream;
use shardline_cql::{
    registry::Registry,
    request::{execute::Execute, query::Query},
    response::{
        result::{
            column_spec::RowSchema,
            rows::{decode_row, DecodedRow, PagingState, Rows},
            schema_change::SchemaChange,
            CqlResult,
        },
        Response, ResponseBody,
    },
    serialize::SerializedRow,
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    connection::Connection,
    error::{ExecutionError, ProtocolViolation},
    statement::{options::QueryOptions, prepared::PreparedStatement},
};

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResultKind {
    Void,
    Rows,
    SetKeyspace(String),
    SchemaChange(SchemaChange),
}

#[derive(Debug, Clone)]
pub(crate) enum Statement {
    Query(Arc<str>),
    Prepared(PreparedStatement),
}

/// Everything needed to request a page of a statement again.
#[derive(Debug)]
pub(crate) struct PageFetcher {
    pub(crate) connection: Arc<Connection>,
    pub(crate) statement: Statement,
    pub(crate) values: SerializedRow,
    pub(crate) options: QueryOptions,
}

impl PageFetcher {
    /// Sends the statement, starting from `paging_state` or from the configured one.
    pub(crate) async fn fetch(
        &self,
        paging_state: Option<&PagingState>,
    ) -> Result<Response, ExecutionError> {
        let tracing = self.options.tracing;
        let response = match &self.statement {
            Statement::Query(query) => {
                let parameters = self
                    .options
                    .to_query_parameters(&self.values, paging_state, false);
                let request = Query { query, parameters };
                self.connection.execute(request, tracing).await?
            }
            Statement::Prepared(prepared) => {
                let skip_metadata =
                    self.options.skip_metadata && prepared.result_schema().is_some();
                let parameters =
                    self.options
                        .to_query_parameters(&self.values, paging_state, skip_metadata);
                let request = Execute {
                    id: prepared.id(),
                    parameters,
                };
                self.connection.execute(request, tracing).await?
            }
        };
        Ok(response.ok()?)
    }

    fn result_schema(&self) -> Option<&Arc<RowSchema>> {
        match &self.statement {
            Statement::Query(_) => None,
            Statement::Prepared(prepared) => prepared.result_schema(),
        }
    }
}

pub(crate) fn into_result(body: ResponseBody) -> Result<CqlResult, ExecutionError> {
    match body {
        ResponseBody::Result(result) => Ok(result),
        other => Err(ProtocolViolation::UnexpectedResponse(format!("{other:?}")).into()),
    }
}

/// Raw rows of a page, decoded one at a time.
#[derive(Debug)]
struct Page {
    body: Bytes,
    offset: usize,
    remaining: usize,
    schema: Arc<RowSchema>,
}

impl Page {
    fn new(
        rows: Rows,
        fallback: Option<&Arc<RowSchema>>,
    ) -> Result<(Self, Option<PagingState>), ExecutionError> {
        let schema = match (rows.metadata.schema, fallback) {
            (Some(schema), _) => schema,
            (None, Some(schema)) => schema.clone(),
            (None, None) if rows.rows_count == 0 => Default::default(),
            (None, None) => {
                return Err(ProtocolViolation::UnexpectedResponse(
                    "rows without metadata".into(),
                )
                .into())
            }
        };
        let page = Self {
            body: rows.envelope,
            offset: rows.rows_offset,
            remaining: rows.rows_count,
            schema,
        };
        Ok((page, rows.metadata.paging_state))
    }

    fn take(&mut self, registry: &Registry) -> Option<Result<DecodedRow, ExecutionError>> {
        if self.remaining == 0 {
            return None;
        }
        let mut buf = &self.body[self.offset..];
        let row = decode_row(registry, &self.schema, &mut buf);
        self.offset = self.body.len() - buf.len();
        self.remaining -= 1;
        Some(match row {
            Err(error) => {
                self.remaining = 0;
                Err(error.into())
            }
            Ok(_) if self.remaining == 0 && self.offset != self.body.len() => {
                Err(ProtocolViolation::TrailingRowBytes(self.body.len() - self.offset).into())
            }
            Ok(row) => Ok(row),
        })
    }
}

#[derive(Debug)]
struct Cursor {
    pages: VecDeque<Page>,
    paging_state: Option<PagingState>,
    fetcher: Option<PageFetcher>,
}

impl Cursor {
    fn take_buffered(&mut self, registry: &Registry) -> Option<Result<DecodedRow, ExecutionError>> {
        loop {
            match self.pages.front_mut()?.take(registry) {
                Some(row) => return Some(row),
                None => {
                    self.pages.pop_front();
                }
            }
        }
    }

    fn is_exhausted(&self) -> bool {
        self.paging_state.is_none() && self.pages.iter().all(|page| page.remaining == 0)
    }

    /// The position in the result is lost.
    fn abort(&mut self) {
        self.pages.clear();
        self.paging_state = None;
    }

    async fn fetch(&mut self, fallback: Option<&Arc<RowSchema>>) -> Result<bool, ExecutionError> {
        let (Some(fetcher), Some(paging_state)) = (&self.fetcher, &self.paging_state) else {
            return Ok(false);
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(pages = self.pages.len(), "fetch next page");
        let response = fetcher.fetch(Some(paging_state)).await?;
        let rows = match into_result(response.body)? {
            CqlResult::Rows(rows) => rows,
            other => {
                return Err(ProtocolViolation::UnexpectedResponse(format!("{other:?}")).into())
            }
        };
        let (page, paging_state) = Page::new(rows, fetcher.result_schema().or(fallback))?;
        self.pages.push_back(page);
        self.paging_state = paging_state;
        Ok(true)
    }
}

/// Rows of a statement result, fetched page by page.
///
/// Consuming rows is destructive: each row is yielded once, even when the result set is
/// shared between several consumers, which then observe disjoint parts of the rows.
/// Page fetches are serialized by an internal lock; an exhausted result set never contacts
/// the node again.
#[derive(Debug)]
pub struct ResultSet {
    kind: ResultKind,
    tracing_id: Option<Uuid>,
    warnings: Vec<String>,
    schema: Option<Arc<RowSchema>>,
    registry: Arc<Registry>,
    auto_page: bool,
    exhausted: AtomicBool,
    cursor: Mutex<Cursor>,
}

impl ResultSet {
    pub(crate) async fn execute(
        fetcher: PageFetcher,
        registry: Arc<Registry>,
    ) -> Result<Self, ExecutionError> {
        let response = fetcher.fetch(None).await?;
        let result = into_result(response.body)?;
        Self::from_result(
            result,
            response.tracing_id,
            response.warnings,
            fetcher,
            registry,
        )
    }

    fn from_result(
        result: CqlResult,
        tracing_id: Option<Uuid>,
        warnings: Vec<String>,
        fetcher: PageFetcher,
        registry: Arc<Registry>,
    ) -> Result<Self, ExecutionError> {
        let auto_page = fetcher.options.auto_page;
        let mut cursor = Cursor {
            pages: VecDeque::new(),
            paging_state: None,
            fetcher: None,
        };
        let mut schema = None;
        let kind = match result {
            CqlResult::Void => ResultKind::Void,
            CqlResult::Rows(rows) => {
                let (page, paging_state) = Page::new(rows, fetcher.result_schema())?;
                schema = Some(page.schema.clone());
                cursor.pages.push_back(page);
                cursor.paging_state = paging_state;
                cursor.fetcher = Some(fetcher);
                ResultKind::Rows
            }
            CqlResult::SetKeyspace(set_keyspace) => {
                ResultKind::SetKeyspace(set_keyspace.keyspace_name)
            }
            CqlResult::SchemaChange(schema_change) => ResultKind::SchemaChange(schema_change),
            CqlResult::Prepared(_) => {
                return Err(ProtocolViolation::UnexpectedResponse("prepared result".into()).into())
            }
        };
        Ok(Self {
            kind,
            tracing_id,
            warnings,
            schema,
            registry,
            auto_page,
            exhausted: AtomicBool::new(cursor.is_exhausted()),
            cursor: Mutex::new(cursor),
        })
    }

    pub fn kind(&self) -> &ResultKind {
        &self.kind
    }

    pub fn tracing_id(&self) -> Option<Uuid> {
        self.tracing_id
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Columns of the rows, `None` if the result has no rows.
    pub fn schema(&self) -> Option<&Arc<RowSchema>> {
        self.schema.as_ref()
    }

    /// No row is buffered and no page remains to be fetched.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::Acquire)
    }

    /// Paging state of the next page to fetch, to resume the iteration in another query.
    pub async fn paging_state(&self) -> Option<PagingState> {
        self.cursor.lock().await.paging_state.clone()
    }

    fn update_exhausted(&self, cursor: &Cursor) {
        self.exhausted.store(cursor.is_exhausted(), Ordering::Release);
    }

    /// Returns the next row, fetching the next page when the buffered rows are consumed
    /// and auto-paging is enabled.
    ///
    /// A decoding error aborts the iteration. A failed page fetch can be retried by
    /// calling again.
    pub async fn next(&self) -> Result<Option<DecodedRow>, ExecutionError> {
        if self.is_exhausted() {
            return Ok(None);
        }
        let mut cursor = self.cursor.lock().await;
        loop {
            match cursor.take_buffered(&self.registry) {
                Some(Ok(row)) => {
                    self.update_exhausted(&cursor);
                    return Ok(Some(row));
                }
                Some(Err(error)) => {
                    cursor.abort();
                    self.update_exhausted(&cursor);
                    return Err(error);
                }
                None => {
                    if !self.auto_page || !cursor.fetch(self.schema.as_ref()).await? {
                        self.update_exhausted(&cursor);
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Returns a buffered row without fetching; `None` when no row is buffered, or when
    /// another consumer is fetching a page.
    pub fn try_take_next(&self) -> Result<Option<DecodedRow>, ExecutionError> {
        let Ok(mut cursor) = self.cursor.try_lock() else {
            return Ok(None);
        };
        let row = match cursor.take_buffered(&self.registry) {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(error)) => {
                cursor.abort();
                Err(error)
            }
            None => Ok(None),
        };
        self.update_exhausted(&cursor);
        row
    }

    /// Fetches the next page, whatever the auto-paging setting.
    ///
    /// Returns `false` if there is no page left. Concurrent calls are serialized, each one
    /// fetching its own page.
    pub async fn fetch_more_results(&self) -> Result<bool, ExecutionError> {
        let mut cursor = self.cursor.lock().await;
        let fetched = cursor.fetch(self.schema.as_ref()).await?;
        self.update_exhausted(&cursor);
        Ok(fetched)
    }

    /// Consumes every remaining row.
    pub async fn remaining_rows(&self) -> Result<Vec<DecodedRow>, ExecutionError> {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    pub fn rows(&self) -> impl Stream<Item = Result<DecodedRow, ExecutionError>> + '_ {
        futures::stream::unfold(self, |result_set| async move {
            let row = result_set.next().await.transpose()?;
            Some((row, result_set))
        })
    }

    pub fn into_rows(self) -> impl Stream<Item = Result<DecodedRow, ExecutionError>> {
        futures::stream::unfold(self, |result_set| async move {
            let row = result_set.next().await.transpose()?;
            Some((row, result_set))
        })
    }
}
