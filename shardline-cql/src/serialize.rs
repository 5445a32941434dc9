//! Bound values serialization, one `[value]` cell at a time.
mod row;
mod writers;

pub use row::{SerializedRow, SerializedRowIter};
pub use writers::{CellValueBuilder, CellWriter, RowWriter};
