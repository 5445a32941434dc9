use shardline_cql::{
    request::query::parameters::QueryParameters, response::result::rows::PagingState,
    serialize::SerializedRow, Consistency, SerialConsistency,
};

pub const DEFAULT_PAGE_SIZE: i32 = 5000;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct QueryOptions {
    /// Fetch the next pages on demand while iterating a result set.
    pub auto_page: bool,
    pub consistency: Consistency,
    pub page_size: Option<i32>,
    /// Page to start from, taken from a previous result set.
    pub paging_state: Option<PagingState>,
    pub serial_consistency: Option<SerialConsistency>,
    /// Don't request result metadata when executing a prepared statement which already has it.
    pub skip_metadata: bool,
    pub timestamp: Option<i64>,
    pub tracing: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            auto_page: true,
            consistency: Consistency::default(),
            page_size: Some(DEFAULT_PAGE_SIZE),
            paging_state: None,
            serial_consistency: None,
            skip_metadata: true,
            timestamp: None,
            tracing: false,
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_page(mut self, auto_page: bool) -> Self {
        self.auto_page = auto_page;
        self
    }

    pub fn consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = consistency;
        self
    }

    pub fn page_size(mut self, page_size: i32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn no_paging(mut self) -> Self {
        self.page_size = None;
        self
    }

    pub fn paging_state(mut self, paging_state: PagingState) -> Self {
        self.paging_state = Some(paging_state);
        self
    }

    pub fn serial_consistency(mut self, serial_consistency: SerialConsistency) -> Self {
        self.serial_consistency = Some(serial_consistency);
        self
    }

    pub fn skip_metadata(mut self, skip_metadata: bool) -> Self {
        self.skip_metadata = skip_metadata;
        self
    }

    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn tracing(mut self, tracing: bool) -> Self {
        self.tracing = tracing;
        self
    }

    pub(crate) fn to_query_parameters<'a>(
        &'a self,
        values: &'a SerializedRow,
        paging_state: Option<&'a PagingState>,
        skip_metadata: bool,
    ) -> QueryParameters<'a> {
        QueryParameters {
            consistency: self.consistency,
            values: Some(values),
            skip_metadata,
            page_size: self.page_size,
            paging_state: paging_state.or(self.paging_state.as_ref()),
            serial_consistency: self.serial_consistency,
            timestamp: self.timestamp,
        }
    }
}
