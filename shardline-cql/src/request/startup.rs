use std::collections::HashMap;

use crate::{cql::WriteCql, error::ValueTooLarge, frame::OpCode, request::Request};

#[derive(Debug)]
pub struct Startup<'a> {
    pub options: &'a HashMap<String, String>,
}

impl Request for Startup<'_> {
    fn opcode(&self) -> OpCode {
        OpCode::Startup
    }

    fn serialized_size(&self) -> Result<usize, ValueTooLarge> {
        self.options.cql_size()
    }

    fn serialize(&self, mut slice: &mut [u8]) {
        self.options.write_cql(&mut slice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_body() {
        let options = HashMap::from([("CQL_VERSION".to_string(), "3.0.0".to_string())]);
        let startup = Startup { options: &options };
        let mut body = vec![0; startup.serialized_size().unwrap()];
        startup.serialize(&mut body);
        assert_eq!(&body[..4], [0, 1, 0, 11]);
        assert_eq!(&body[4..15], b"CQL_VERSION");
        assert_eq!(&body[15..], b"\x00\x053.0.0");
    }
}
