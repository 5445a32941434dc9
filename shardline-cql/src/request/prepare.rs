use crate::{
    cql::{LongString, WriteCql},
    error::ValueTooLarge,
    frame::OpCode,
    request::Request,
};

#[derive(Debug, Clone, Copy)]
pub struct Prepare<'a> {
    pub statement: &'a str,
}

impl Request for Prepare<'_> {
    fn opcode(&self) -> OpCode {
        OpCode::Prepare
    }

    fn serialized_size(&self) -> Result<usize, ValueTooLarge> {
        LongString(self.statement).cql_size()
    }

    fn serialize(&self, mut slice: &mut [u8]) {
        LongString(self.statement).write_cql(&mut slice);
    }
}
