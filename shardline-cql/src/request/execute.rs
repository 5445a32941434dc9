use crate::{
    cql::{ShortBytes, WriteCql},
    error::ValueTooLarge,
    frame::OpCode,
    request::{query::parameters::QueryParameters, Request},
};

#[derive(Debug, Clone, Copy)]
pub struct Execute<'a> {
    pub id: &'a [u8],
    pub parameters: QueryParameters<'a>,
}

impl Request for Execute<'_> {
    fn opcode(&self) -> OpCode {
        OpCode::Execute
    }

    fn serialized_size(&self) -> Result<usize, ValueTooLarge> {
        Ok(ShortBytes(self.id).cql_size()? + self.parameters.serialized_size()?)
    }

    fn serialize(&self, mut slice: &mut [u8]) {
        ShortBytes(self.id).write_cql(&mut slice);
        self.parameters.serialize(slice);
    }
}
