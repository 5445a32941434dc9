use std::io;

use crate::cql::ReadCql;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetKeyspace {
    pub keyspace_name: String,
}

impl SetKeyspace {
    pub fn deserialize(mut slice: &[u8]) -> io::Result<Self> {
        Ok(Self {
            keyspace_name: String::read_cql(&mut slice)?,
        })
    }
}
