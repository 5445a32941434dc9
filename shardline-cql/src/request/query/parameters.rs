use bytes::BufMut;
use enumflags2::bitflags;

use crate::{
    cql::WriteCql, error::ValueTooLarge, response::result::rows::PagingState,
    serialize::SerializedRow, utils::flags, Consistency, SerialConsistency,
};

#[bitflags]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum QueryParametersFlag {
    Values = 0x01,
    SkipMetadata = 0x02,
    PageSize = 0x04,
    WithPagingState = 0x08,
    WithSerialConsistency = 0x10,
    WithDefaultTimestamp = 0x20,
    WithNamesForValues = 0x40,
}

/// `<query_parameters>` shared by QUERY and EXECUTE.
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryParameters<'a> {
    pub consistency: Consistency,
    pub values: Option<&'a SerializedRow>,
    pub skip_metadata: bool,
    pub page_size: Option<i32>,
    pub paging_state: Option<&'a PagingState>,
    pub serial_consistency: Option<SerialConsistency>,
    pub timestamp: Option<i64>,
}

fn opt_size(opt: Option<impl WriteCql>) -> Result<usize, ValueTooLarge> {
    opt.as_ref().map(WriteCql::cql_size).unwrap_or(Ok(0))
}

fn opt_write(opt: Option<impl WriteCql>, buf: &mut &mut [u8]) {
    if let Some(v) = opt {
        v.write_cql(buf)
    }
}

impl QueryParameters<'_> {
    fn values(&self) -> Option<&SerializedRow> {
        self.values.filter(|values| !values.is_empty())
    }

    pub(crate) fn serialized_size(&self) -> Result<usize, ValueTooLarge> {
        Ok(self.consistency.cql_size()?
            + 0u8.cql_size()?
            + self.values().map_or(0, |values| values.as_bytes().len())
            + opt_size(self.page_size)?
            + opt_size(self.paging_state.map(PagingState::as_bytes))?
            + opt_size(self.serial_consistency)?
            + opt_size(self.timestamp)?)
    }

    pub(crate) fn serialize(&self, mut slice: &mut [u8]) {
        self.consistency.write_cql(&mut slice);
        let flags = flags!(
            QueryParametersFlag::Values: self.values().is_some(),
            QueryParametersFlag::SkipMetadata: self.skip_metadata,
            QueryParametersFlag::PageSize: self.page_size.is_some(),
            QueryParametersFlag::WithPagingState: self.paging_state.is_some(),
            QueryParametersFlag::WithSerialConsistency: self.serial_consistency.is_some(),
            QueryParametersFlag::WithDefaultTimestamp: self.timestamp.is_some(),
        );
        flags.write_cql(&mut slice);
        if let Some(values) = self.values() {
            slice.put_slice(values.as_bytes());
        }
        opt_write(self.page_size, &mut slice);
        opt_write(self.paging_state.map(PagingState::as_bytes), &mut slice);
        opt_write(self.serial_consistency, &mut slice);
        opt_write(self.timestamp, &mut slice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{registry::registry, CqlValue, MaybeValue};

    fn serialize(parameters: QueryParameters) -> Vec<u8> {
        let mut buf = vec![0; parameters.serialized_size().unwrap()];
        parameters.serialize(&mut buf);
        buf
    }

    #[test]
    fn no_values_no_flags() {
        assert_eq!(serialize(QueryParameters::default()), [0, 6, 0]);
        let empty = SerializedRow::empty();
        let parameters = QueryParameters {
            values: Some(&empty),
            ..Default::default()
        };
        assert_eq!(serialize(parameters), [0, 6, 0]);
    }

    #[test]
    fn every_flag() {
        let values =
            SerializedRow::from_values(registry(), &[MaybeValue::Value(CqlValue::Int(7))])
                .unwrap();
        let paging_state = PagingState::from(&[0xAA][..]);
        let parameters = QueryParameters {
            consistency: Consistency::Quorum,
            values: Some(&values),
            skip_metadata: true,
            page_size: Some(100),
            paging_state: Some(&paging_state),
            serial_consistency: Some(SerialConsistency::LocalSerial),
            timestamp: Some(1),
        };
        assert_eq!(
            serialize(parameters),
            [
                0, 4, // consistency
                0x3F, // flags
                0, 1, 0, 0, 0, 4, 0, 0, 0, 7, // values
                0, 0, 0, 100, // page size
                0, 0, 0, 1, 0xAA, // paging state
                0, 9, // serial consistency
                0, 0, 0, 0, 0, 0, 0, 1, // timestamp
            ]
        );
    }
}
