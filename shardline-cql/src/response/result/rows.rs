use std::{io, iter::FusedIterator, sync::Arc};

use bytes::Bytes;
use enumflags2::{bitflags, BitFlags};

use crate::{
    cql::{read_and_advance, ReadCql},
    cql_type::TypeParser,
    error::{ConversionError, DecodeError, ValueDecodeError},
    registry::Registry,
    response::result::column_spec::RowSchema,
    value::{CqlValue, FromCqlValue, FromRow},
};

#[derive(Debug)]
pub struct Rows {
    pub envelope: Bytes,
    pub metadata: Metadata,
    pub rows_count: usize,
    pub rows_offset: usize,
}

impl Rows {
    pub fn deserialize(parser: &TypeParser, envelope: Bytes, offset: usize) -> io::Result<Self> {
        let buf = &mut &envelope[offset..];
        let metadata = Metadata::deserialize(parser, buf)?;
        let rows_count = u32::read_cql(buf)? as usize;
        let rows_offset = envelope.len() - buf.len();
        Ok(Rows {
            envelope,
            metadata,
            rows_count,
            rows_offset,
        })
    }

    pub fn rows_slice(&self) -> &[u8] {
        &self.envelope[self.rows_offset..]
    }

    /// Rows of the page, decoded with `schema` when the response carries no metadata.
    pub fn iter<'a>(
        &'a self,
        registry: &'a Registry,
        schema: Option<&'a Arc<RowSchema>>,
    ) -> Option<RowIterator<'a>> {
        let schema = self.metadata.schema.as_ref().or(schema)?;
        Some(RowIterator {
            registry,
            schema,
            rows_count: self.rows_count,
            bytes: self.rows_slice(),
        })
    }
}

// PagingState is allocated to avoid keeping a reference on previous payload,
// because it would be kept in memory during the next request otherwise
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingState(Arc<[u8]>);

impl PagingState {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for PagingState {
    fn from(value: &[u8]) -> Self {
        Self(value.into())
    }
}

impl AsRef<[u8]> for PagingState {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

#[bitflags]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
#[non_exhaustive]
pub enum RowsFlag {
    GlobalTableSpec = 0x0001,
    HasMorePages = 0x0002,
    NoMetadata = 0x0004,
}

#[derive(Debug)]
pub struct Metadata {
    pub columns_count: u32,
    pub paging_state: Option<PagingState>,
    pub schema: Option<Arc<RowSchema>>,
}

impl Metadata {
    pub fn deserialize(parser: &TypeParser, buf: &mut &[u8]) -> io::Result<Self> {
        let flags = BitFlags::<RowsFlag>::from_bits_truncate(u32::read_cql(buf)?);
        let columns_count = u32::read_cql(buf)?;
        let paging_state = if flags.contains(RowsFlag::HasMorePages) {
            Option::<&[u8]>::read_cql(buf)?.map(PagingState::from)
        } else {
            None
        };
        let schema = if flags.contains(RowsFlag::NoMetadata) {
            None
        } else {
            let global_table_spec = if flags.contains(RowsFlag::GlobalTableSpec) {
                let keyspace = <&str>::read_cql(buf)?;
                let table = <&str>::read_cql(buf)?;
                Some((keyspace, table))
            } else {
                None
            };
            Some(Arc::new(RowSchema::deserialize(
                parser,
                columns_count,
                global_table_spec,
                buf,
            )?))
        };
        Ok(Self {
            columns_count,
            paging_state,
            schema,
        })
    }
}

/// One decoded row, aligned with its schema.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRow {
    values: Vec<Option<CqlValue>>,
    schema: Arc<RowSchema>,
}

impl DecodedRow {
    pub fn schema(&self) -> &Arc<RowSchema> {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Option<CqlValue>] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Option<CqlValue>> {
        self.values
    }

    /// `None` is an explicit null.
    pub fn value(&self, index: usize) -> Result<Option<&CqlValue>, ConversionError> {
        self.values
            .get(index)
            .map(Option::as_ref)
            .ok_or(ConversionError::NoSuchIndex(index))
    }

    pub fn get<T>(&self, index: usize) -> Result<T, ConversionError>
    where
        T: FromCqlValue,
    {
        T::from_cql(self.value(index)?.cloned())
    }

    pub fn get_by_name<T>(&self, name: &str) -> Result<T, ConversionError>
    where
        T: FromCqlValue,
    {
        let index = self
            .schema
            .index_of(name)
            .ok_or_else(|| ConversionError::NoSuchColumn(name.into()))?;
        self.get(index)
    }

    pub fn into_typed<R>(self) -> Result<R, ConversionError>
    where
        R: FromRow,
    {
        R::from_row(self.values)
    }
}

/// Decodes one row, advancing `buf` past it.
///
/// Every cell is framed before any value is decoded, so a truncated row is rejected as a
/// whole. The first failing column aborts the row. An empty cell of a type without empty
/// encoding, like an int written empty by a legacy client, is null.
pub fn decode_row(
    registry: &Registry,
    schema: &Arc<RowSchema>,
    buf: &mut &[u8],
) -> Result<DecodedRow, DecodeError> {
    let error = |index: usize, source: ValueDecodeError| {
        let column = &schema.columns()[index];
        DecodeError {
            index,
            name: column.name.clone(),
            r#type: column.r#type.clone(),
            source,
        }
    };
    let mut cells = Vec::with_capacity(schema.len());
    for index in 0..schema.len() {
        let cell = match i32::read_cql(buf) {
            // -2 is unset, which can only be echoed back as a null
            Ok(length) if length < 0 => None,
            Ok(length) => Some(read_and_advance(buf, length as usize)),
            Err(err) => Some(Err(err)),
        };
        cells.push(cell.transpose().map_err(|err| error(index, err.into()))?);
    }
    let values = cells
        .into_iter()
        .enumerate()
        .map(|(index, cell)| {
            let r#type = &schema.columns()[index].r#type;
            cell.filter(|bytes| !bytes.is_empty() || r#type.type_code().has_empty_encoding())
                .map(|bytes| registry.decode(r#type, bytes))
                .transpose()
                .map_err(|err| error(index, err))
        })
        .collect::<Result<_, _>>()?;
    Ok(DecodedRow {
        values,
        schema: schema.clone(),
    })
}

#[derive(Debug, Clone)]
pub struct RowIterator<'a> {
    registry: &'a Registry,
    schema: &'a Arc<RowSchema>,
    rows_count: usize,
    bytes: &'a [u8],
}

impl RowIterator<'_> {
    /// Bytes left after the last row, which should be empty.
    pub fn remaining_bytes(&self) -> usize {
        self.bytes.len()
    }
}

impl Iterator for RowIterator<'_> {
    type Item = Result<DecodedRow, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rows_count == 0 {
            return None;
        }
        self.rows_count -= 1;
        let row = decode_row(self.registry, self.schema, &mut self.bytes);
        if row.is_err() {
            // the position in the page is lost
            self.rows_count = 0;
        }
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.rows_count))
    }
}

impl FusedIterator for RowIterator<'_> {}
