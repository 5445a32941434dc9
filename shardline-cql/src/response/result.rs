use std::io;

use bytes::Bytes;

use crate::{
    cql::ReadCql,
    cql_type::TypeParser,
    extensions::ProtocolExtensions,
    response::result::{
        prepared::Prepared, rows::Rows, schema_change::SchemaChange, set_keyspace::SetKeyspace,
    },
    utils::invalid_data,
};

pub mod column_spec;
pub mod prepared;
pub mod rows;
pub mod schema_change;
pub mod set_keyspace;

#[derive(Debug)]
pub enum Result {
    Void,
    Rows(Rows),
    SetKeyspace(SetKeyspace),
    Prepared(Prepared),
    SchemaChange(SchemaChange),
}

pub type CqlResult = Result;

impl Result {
    pub fn deserialize(
        extensions: Option<&ProtocolExtensions>,
        parser: &TypeParser,
        envelope: Bytes,
        offset: usize,
    ) -> io::Result<Self> {
        let buf = &mut &envelope[offset..];
        Ok(match u32::read_cql(buf)? {
            0x0001 => Self::Void,
            0x0002 => Self::Rows(Rows::deserialize(parser, envelope, offset + 4)?),
            0x0003 => Self::SetKeyspace(SetKeyspace::deserialize(buf)?),
            0x0004 => Self::Prepared(Prepared::deserialize(extensions, parser, buf)?),
            0x0005 => Self::SchemaChange(SchemaChange::deserialize(buf)?),
            n => return Err(format!("Invalid result kind {n}")).map_err(invalid_data),
        })
    }
}
