use std::{collections::HashMap, io, ops::Deref};

use uuid::Uuid;

pub use crate::response::error::{ErrorCode as DatabaseErrorCode, ErrorKind as DatabaseErrorKind};
use crate::{cql_type::CqlType, response::error::Error, utils::invalid_data, TypeCode};

pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Value too large to be serialized ({0} bytes), maximum is 2GiB")]
pub struct ValueTooLarge(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Frame too big to be sent ({0} bytes), maximum is 256MiB")]
pub struct FrameTooBig(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CellWriterError {
    #[error("Cell has already been written")]
    AlreadyConsumed,
    #[error(transparent)]
    ValueTooLarge(#[from] ValueTooLarge),
    #[error("Cell value declared {declared} bytes but {written} were appended")]
    SizeMismatch { declared: usize, written: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowWriterError {
    #[error("Row finalized with {pending} cell writer(s) never written")]
    RowNotFullyWritten { pending: usize },
    #[error("Too many values in a row ({0}), maximum is 65535")]
    TooManyValues(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("No codec registered for type {0}")]
    UnsupportedType(String),
    #[error("Type {0:?} cannot be decoded without its type descriptor")]
    MissingTypeDescriptor(TypeCode),
}

/// Column metadata that cannot be turned into a row schema.
#[derive(Debug, thiserror::Error)]
pub enum MalformedSchema {
    #[error("Type nesting exceeds the maximum depth of {0}")]
    DepthExceeded(usize),
    #[error("Unknown type code {0:#06x}")]
    UnknownTypeCode(u16),
    #[error("Invalid custom type `{0}`")]
    InvalidCustomType(String),
    #[error("Truncated or invalid metadata: {0}")]
    Truncated(#[source] io::Error),
}

impl From<io::Error> for MalformedSchema {
    fn from(value: io::Error) -> Self {
        Self::Truncated(value)
    }
}

impl From<MalformedSchema> for io::Error {
    fn from(value: MalformedSchema) -> Self {
        invalid_data(value)
    }
}

impl MalformedSchema {
    /// Recovers a schema error that went through an `io::Error` while parsing a response.
    pub fn from_io(error: io::Error) -> Result<Self, io::Error> {
        match error.get_ref().map(|inner| inner.is::<MalformedSchema>()) {
            Some(true) => {
                let inner = error.into_inner().ok_or_else(|| invalid_data("empty error"))?;
                Ok(*inner
                    .downcast::<MalformedSchema>()
                    .map_err(|err| invalid_data(err.to_string()))?)
            }
            _ => Err(error),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValueDecodeError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("Invalid value: {0}")]
    Invalid(#[from] io::Error),
    #[error("Unexpected null value in a collection")]
    NullInCollection,
}

/// A row that could not be decoded, attributed to the failing column.
#[derive(Debug, thiserror::Error)]
#[error("Cannot decode column {index} `{name}` of type {r#type}: {source}")]
pub struct DecodeError {
    pub index: usize,
    pub name: String,
    pub r#type: CqlType,
    #[source]
    pub source: ValueDecodeError,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    ValueTooLarge(#[from] ValueTooLarge),
    #[error("Cannot encode a {found} value as {expected:?}")]
    TypeMismatch {
        expected: TypeCode,
        found: &'static str,
    },
    #[error("Expected {expected} elements, found {found}")]
    WrongElementCount { expected: usize, found: usize },
    #[error("Null is not allowed inside a {0:?}")]
    NullInCollection(TypeCode),
    #[error("Unknown field {field} for udt {type_name}")]
    UnknownUdtField { type_name: String, field: String },
    #[error(transparent)]
    CellWriter(#[from] CellWriterError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SerializeValuesError {
    #[error("Expected {expected} bound values, found {found}")]
    WrongValueCount { expected: usize, found: usize },
    #[error("Cannot serialize value {index}: {source}")]
    Encode {
        index: usize,
        #[source]
        source: EncodeError,
    },
    #[error(transparent)]
    Row(#[from] RowWriterError),
}

#[derive(Debug, thiserror::Error)]
pub enum InvalidRequest {
    #[error(transparent)]
    ValueTooLarge(#[from] ValueTooLarge),
    #[error(transparent)]
    FrameTooBig(#[from] FrameTooBig),
    #[error(transparent)]
    Values(#[from] SerializeValuesError),
}

#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct DatabaseError {
    pub tracing_id: Option<Uuid>,
    pub custom_payload: HashMap<String, Vec<u8>>,
    pub warnings: Vec<String>,
    pub error: Error,
}

impl Deref for DatabaseError {
    type Target = Error;
    fn deref(&self) -> &Self::Target {
        &self.error
    }
}

#[cfg(feature = "protocol")]
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Authentication is required with authenticator {0}, which is not supported")]
    AuthenticationRequired(String),
    #[error(transparent)]
    InvalidRequest(#[from] InvalidRequest),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Database error: {0}")]
    Database(#[from] Box<DatabaseError>),
}

#[cfg(feature = "protocol")]
impl From<tokio::time::error::Elapsed> for ConnectionError {
    fn from(value: tokio::time::error::Elapsed) -> Self {
        Self::Io(value.into())
    }
}

#[cfg(feature = "protocol")]
#[derive(Debug, thiserror::Error)]
pub enum ReadLoopError<E> {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Callback error: {0:?}")]
    Callback(E),
}

#[cfg(feature = "protocol")]
impl ReadLoopError<io::Error> {
    pub fn into_inner(self) -> io::Error {
        match self {
            Self::Io(error) | Self::Callback(error) => error,
        }
    }
}

/// A decoded value that cannot be converted into the requested Rust type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("Unexpected null value")]
    Null,
    #[error("Cannot convert a {found} value into {expected}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("Value out of range for {0}")]
    OutOfRange(&'static str),
    #[error("Expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },
    #[error("No column named `{0}`")]
    NoSuchColumn(String),
    #[error("No column at index {0}")]
    NoSuchIndex(usize),
}
