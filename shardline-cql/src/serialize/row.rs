use bytes::Bytes;

use crate::{
    cql::{read_and_advance, ReadCql},
    cql_type::CqlType,
    error::SerializeValuesError,
    registry::Registry,
    serialize::RowWriter,
    value::{CqlValue, MaybeValue},
};

/// Finalized bound values, laid out as on the wire: a `[short]` count followed by the
/// `[value]` cells.
///
/// The buffer is immutable and cheap to clone, so the same row can be sent again when
/// fetching the next pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedRow {
    bytes: Bytes,
    value_count: u16,
}

impl Default for SerializedRow {
    fn default() -> Self {
        Self::empty()
    }
}

impl SerializedRow {
    pub(crate) fn new(bytes: Bytes, value_count: u16) -> Self {
        Self { bytes, value_count }
    }

    pub fn empty() -> Self {
        Self::new(Bytes::from_static(&[0, 0]), 0)
    }

    pub fn value_count(&self) -> u16 {
        self.value_count
    }

    pub fn is_empty(&self) -> bool {
        self.value_count == 0
    }

    /// Count and cells.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Cells only.
    pub fn values_bytes(&self) -> &[u8] {
        &self.bytes[2..]
    }

    pub fn iter(&self) -> SerializedRowIter<'_> {
        SerializedRowIter {
            buf: self.values_bytes(),
        }
    }

    /// Serializes values using the codec of their own type.
    pub fn from_values(
        registry: &Registry,
        values: &[MaybeValue<CqlValue>],
    ) -> Result<Self, SerializeValuesError> {
        let mut writer = RowWriter::new();
        for (index, value) in values.iter().enumerate() {
            writer
                .make_cell_writer()
                .write_cql_value(registry, value.as_ref(), None)
                .map_err(|source| SerializeValuesError::Encode { index, source })?;
        }
        Ok(writer.finalize()?)
    }

    /// Serializes values against the bind markers types of a prepared statement.
    pub fn bind<'a, I>(
        registry: &Registry,
        values: &[MaybeValue<CqlValue>],
        types: I,
    ) -> Result<Self, SerializeValuesError>
    where
        I: IntoIterator<Item = &'a CqlType>,
        I::IntoIter: ExactSizeIterator,
    {
        let types = types.into_iter();
        if types.len() != values.len() {
            return Err(SerializeValuesError::WrongValueCount {
                expected: types.len(),
                found: values.len(),
            });
        }
        let mut writer = RowWriter::new();
        for (index, (value, tp)) in values.iter().zip(types).enumerate() {
            writer
                .make_cell_writer()
                .write_cql_value(registry, value.as_ref(), Some(tp))
                .map_err(|source| SerializeValuesError::Encode { index, source })?;
        }
        Ok(writer.finalize()?)
    }
}

/// Cells of a [`SerializedRow`].
#[derive(Debug, Clone)]
pub struct SerializedRowIter<'a> {
    buf: &'a [u8],
}

impl<'a> Iterator for SerializedRowIter<'a> {
    type Item = MaybeValue<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buf.is_empty() {
            return None;
        }
        // cells were validated when written
        let length = i32::read_cql(&mut self.buf).ok()?;
        Some(match length {
            -2 => MaybeValue::Unset,
            length if length < 0 => MaybeValue::Null,
            length => MaybeValue::Value(read_and_advance(&mut self.buf, length as usize).ok()?),
        })
    }
}
