use std::io;

#[rustfmt::skip]
pub use shardline_cql::error::*;

#[derive(Debug, thiserror::Error)]
#[error("Keyspace must match `[a-zA-Z_0-9]{{1, 48}}`, found `{0}`")]
pub struct InvalidKeyspace(pub String);

/// Broad classification of a failed operation, for callers that branch on the kind of
/// failure rather than on its details.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection lost, write failed or connection closed; never retried.
    Transport,
    /// The peer sent something that does not follow the protocol.
    Protocol,
    /// No codec is registered for an encountered type.
    UnsupportedType,
    /// A value or a request exceeds the protocol limits; nothing was sent.
    ValueTooLarge,
    AlreadyExists,
    DoesNotExist,
    /// Local misuse of the API, like binding the wrong number of values.
    ApiMisuse,
    /// Any other error returned by the database.
    Database,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No contact point has been provided")]
    NoContactPoint,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Keyspace(#[from] KeyspaceError),
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolViolation {
    #[error("Stream {0} has been completed twice")]
    DoubleCompletion(i16),
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(#[source] io::Error),
    #[error(transparent)]
    MalformedSchema(#[from] MalformedSchema),
    #[error("{0} trailing bytes after the last row of the page")]
    TrailingRowBytes(usize),
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl From<io::Error> for ProtocolViolation {
    fn from(value: io::Error) -> Self {
        match MalformedSchema::from_io(value) {
            Ok(schema) => Self::MalformedSchema(schema),
            Err(error) => Self::MalformedEnvelope(error),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error(transparent)]
    InvalidRequest(#[from] InvalidRequest),
    #[error("No stream is available, request has not been sent")]
    NoStreamAvailable,
    #[error("Connection is closed")]
    ConnectionClosed,
    #[error("Transport failure: {0}")]
    TransportFailure(#[source] io::Error),
    #[error(transparent)]
    ProtocolViolation(#[from] ProtocolViolation),
}

impl RequestError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NoStreamAvailable | Self::ConnectionClosed | Self::TransportFailure(_) => {
                ErrorCategory::Transport
            }
            Self::ProtocolViolation(_) => ErrorCategory::Protocol,
            Self::InvalidRequest(InvalidRequest::ValueTooLarge(_) | InvalidRequest::FrameTooBig(_)) => {
                ErrorCategory::ValueTooLarge
            }
            Self::InvalidRequest(InvalidRequest::Values(error)) => values_category(error),
        }
    }
}

fn values_category(error: &SerializeValuesError) -> ErrorCategory {
    match error {
        SerializeValuesError::Encode { source, .. } => match source {
            EncodeError::Registry(_) => ErrorCategory::UnsupportedType,
            EncodeError::ValueTooLarge(_)
            | EncodeError::CellWriter(CellWriterError::ValueTooLarge(_)) => {
                ErrorCategory::ValueTooLarge
            }
            _ => ErrorCategory::ApiMisuse,
        },
        SerializeValuesError::WrongValueCount { .. } | SerializeValuesError::Row(_) => {
            ErrorCategory::ApiMisuse
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("Database error: {0}")]
    Database(#[from] Box<DatabaseError>),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    InvalidKeyspace(#[from] InvalidKeyspace),
}

impl ExecutionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Request(error) => error.category(),
            Self::Database(error) => match error.code {
                Ok(DatabaseErrorCode::AlreadyExists) => ErrorCategory::AlreadyExists,
                _ => ErrorCategory::Database,
            },
            Self::Decode(error) => match error.source {
                ValueDecodeError::Registry(_) => ErrorCategory::UnsupportedType,
                _ => ErrorCategory::Protocol,
            },
            Self::InvalidKeyspace(_) => ErrorCategory::ApiMisuse,
        }
    }

    pub fn as_database_error(&self) -> Option<&DatabaseError> {
        match self {
            Self::Database(error) => Some(error),
            _ => None,
        }
    }

    pub fn as_database_error_kind(&self) -> Result<&DatabaseErrorKind, &ExecutionError> {
        match self {
            Self::Database(error) => Ok(&error.kind),
            other => Err(other),
        }
    }
}

impl From<SerializeValuesError> for ExecutionError {
    fn from(value: SerializeValuesError) -> Self {
        RequestError::InvalidRequest(value.into()).into()
    }
}

impl From<ProtocolViolation> for ExecutionError {
    fn from(value: ProtocolViolation) -> Self {
        RequestError::ProtocolViolation(value).into()
    }
}

/// Outcome of the keyspace helpers; the richer error is kept for anything that is not
/// the expected DDL outcome.
#[derive(Debug, thiserror::Error)]
pub enum KeyspaceError {
    #[error("Keyspace `{keyspace}` already exists")]
    AlreadyExists {
        keyspace: String,
        #[source]
        source: Box<DatabaseError>,
    },
    #[error("Keyspace `{keyspace}` does not exist")]
    DoesNotExist {
        keyspace: String,
        #[source]
        source: Box<DatabaseError>,
    },
    #[error(transparent)]
    Other(#[from] ExecutionError),
}

impl KeyspaceError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AlreadyExists { .. } => ErrorCategory::AlreadyExists,
            Self::DoesNotExist { .. } => ErrorCategory::DoesNotExist,
            Self::Other(error) => error.category(),
        }
    }
}

impl From<InvalidKeyspace> for KeyspaceError {
    fn from(value: InvalidKeyspace) -> Self {
        Self::Other(value.into())
    }
}
