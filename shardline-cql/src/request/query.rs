use crate::{
    cql::{LongString, WriteCql},
    error::ValueTooLarge,
    frame::OpCode,
    request::{query::parameters::QueryParameters, Request},
};

pub mod parameters;

#[derive(Debug, Clone, Copy)]
pub struct Query<'a> {
    pub query: &'a str,
    pub parameters: QueryParameters<'a>,
}

impl Request for Query<'_> {
    fn opcode(&self) -> OpCode {
        OpCode::Query
    }

    fn serialized_size(&self) -> Result<usize, ValueTooLarge> {
        Ok(LongString(self.query).cql_size()? + self.parameters.serialized_size()?)
    }

    fn serialize(&self, mut slice: &mut [u8]) {
        LongString(self.query).write_cql(&mut slice);
        self.parameters.serialize(slice);
    }
}
