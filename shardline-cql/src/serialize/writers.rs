use crate::{
    cql::check_size,
    cql_type::CqlType,
    error::{CellWriterError, EncodeError, RowWriterError},
    registry::Registry,
    serialize::SerializedRow,
    value::{CqlValue, MaybeValue},
};

const NULL: i32 = -1;
const UNSET: i32 = -2;

#[derive(Debug)]
struct RowState {
    // starts with the placeholder of the value count
    buf: Vec<u8>,
    value_count: usize,
    pending: usize,
}

/// Accumulates the cells of a row of bound values.
///
/// Every cell is written through a [`CellWriter`]; a writer dropped without being written
/// emits nothing, but makes [`finalize`](RowWriter::finalize) fail.
#[derive(Debug)]
pub struct RowWriter {
    state: RowState,
}

impl Default for RowWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl RowWriter {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Capacity of the values, without the count.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut buf = Vec::with_capacity(capacity + 2);
        buf.extend_from_slice(&[0, 0]);
        Self {
            state: RowState {
                buf,
                value_count: 0,
                pending: 0,
            },
        }
    }

    /// Number of cells fully written so far.
    pub fn value_count(&self) -> usize {
        self.state.value_count
    }

    pub fn make_cell_writer(&mut self) -> CellWriter<'_> {
        CellWriter {
            row: &mut self.state,
            consumed: false,
        }
    }

    pub fn finalize(self) -> Result<SerializedRow, RowWriterError> {
        let RowState {
            mut buf,
            value_count,
            pending,
        } = self.state;
        if pending > 0 {
            return Err(RowWriterError::RowNotFullyWritten { pending });
        }
        let count =
            u16::try_from(value_count).map_err(|_| RowWriterError::TooManyValues(value_count))?;
        buf[..2].copy_from_slice(&count.to_be_bytes());
        Ok(SerializedRow::new(buf.into(), count))
    }
}

/// Handle to a single cell, written at most once.
#[derive(Debug)]
pub struct CellWriter<'row> {
    row: &'row mut RowState,
    consumed: bool,
}

impl CellWriter<'_> {
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    fn check_fresh(&self) -> Result<(), CellWriterError> {
        if self.consumed {
            return Err(CellWriterError::AlreadyConsumed);
        }
        Ok(())
    }

    fn write_length(&mut self, length: i32) {
        self.row.buf.extend_from_slice(&length.to_be_bytes());
        self.row.value_count += 1;
        self.consumed = true;
    }

    pub fn write_null(&mut self) -> Result<(), CellWriterError> {
        self.check_fresh()?;
        self.write_length(NULL);
        Ok(())
    }

    /// Unset cells leave the bound column untouched.
    pub fn write_unset(&mut self) -> Result<(), CellWriterError> {
        self.check_fresh()?;
        self.write_length(UNSET);
        Ok(())
    }

    /// Fails without writing anything if the value exceeds `i32::MAX` bytes.
    pub fn write_value(&mut self, value: &[u8]) -> Result<(), CellWriterError> {
        self.check_fresh()?;
        let length: i32 = check_size(value.len())?;
        self.write_length(length);
        self.row.buf.extend_from_slice(value);
        Ok(())
    }

    /// Starts a value whose content is appended piecewise.
    ///
    /// The cell is only written when [`CellValueBuilder::finish`] succeeds; dropping the
    /// builder discards everything appended.
    pub fn begin_incremental_value(&mut self) -> Result<CellValueBuilder<'_>, CellWriterError> {
        self.check_fresh()?;
        let start = self.row.buf.len();
        // invalid length, overwritten by finish or truncated on drop
        self.row.buf.extend_from_slice(&(-3i32).to_be_bytes());
        Ok(CellValueBuilder {
            row: &mut *self.row,
            consumed: &mut self.consumed,
            start,
            declared_size: None,
            finished: false,
        })
    }

    /// Writes a bound value with the codec of its column type, or of its own type when
    /// the column type is unknown.
    pub fn write_cql_value(
        &mut self,
        registry: &Registry,
        value: MaybeValue<&CqlValue>,
        tp: Option<&CqlType>,
    ) -> Result<(), EncodeError> {
        match value {
            MaybeValue::Null => self.write_null()?,
            MaybeValue::Unset => self.write_unset()?,
            MaybeValue::Value(value) => {
                let mut builder = self.begin_incremental_value()?;
                registry.encode(value, tp, builder.buffer())?;
                builder.finish()?;
            }
        }
        Ok(())
    }
}

impl Drop for CellWriter<'_> {
    fn drop(&mut self) {
        if !self.consumed {
            self.row.pending += 1;
        }
    }
}

/// Piecewise content of a non-null cell.
#[derive(Debug)]
pub struct CellValueBuilder<'cell> {
    row: &'cell mut RowState,
    consumed: &'cell mut bool,
    // position of the length placeholder
    start: usize,
    declared_size: Option<usize>,
    finished: bool,
}

impl CellValueBuilder<'_> {
    /// Bytes appended so far.
    pub fn written(&self) -> usize {
        self.row.buf.len() - self.start - 4
    }

    /// Declares the final size of the value, checked by [`finish`](Self::finish).
    pub fn set_size(&mut self, size: usize) -> Result<(), CellWriterError> {
        check_size::<i32>(size)?;
        self.declared_size = Some(size);
        self.row.buf.reserve(size.saturating_sub(self.written()));
        Ok(())
    }

    pub fn append_bytes(&mut self, bytes: &[u8]) -> Result<(), CellWriterError> {
        let size = self.written() + bytes.len();
        match self.declared_size {
            Some(declared) if size > declared => {
                return Err(CellWriterError::SizeMismatch {
                    declared,
                    written: size,
                })
            }
            _ => check_size::<i32>(size)?,
        };
        self.row.buf.extend_from_slice(bytes);
        Ok(())
    }

    pub(crate) fn buffer(&mut self) -> &mut Vec<u8> {
        &mut self.row.buf
    }

    pub fn finish(mut self) -> Result<(), CellWriterError> {
        let written = self.written();
        if let Some(declared) = self.declared_size.filter(|declared| *declared != written) {
            return Err(CellWriterError::SizeMismatch { declared, written });
        }
        let length: i32 = check_size(written)?;
        self.row.buf[self.start..self.start + 4].copy_from_slice(&length.to_be_bytes());
        self.row.value_count += 1;
        *self.consumed = true;
        self.finished = true;
        Ok(())
    }
}

impl Drop for CellValueBuilder<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.row.buf.truncate(self.start);
        }
    }
}
