use crate::{error::ValueTooLarge, frame::OpCode, request::Request};

#[derive(Debug)]
pub struct Options;

impl Request for Options {
    fn opcode(&self) -> OpCode {
        OpCode::Options
    }

    fn serialized_size(&self) -> Result<usize, ValueTooLarge> {
        Ok(0)
    }

    fn serialize(&self, _slice: &mut [u8]) {}
}
