use std::{io, str::FromStr};

use crate::{cql::ReadCql, utils::invalid_data};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SchemaChange {
    pub change_type: SchemaChangeType,
    pub keyspace: String,
    pub target: SchemaChangeTarget,
}

impl SchemaChange {
    pub fn deserialize(mut slice: &[u8]) -> io::Result<Self> {
        let change_type = SchemaChangeType::from_str(<&str>::read_cql(&mut slice)?)
            .map_err(|_| "Invalid schema change type")
            .map_err(invalid_data)?;
        let target = <&str>::read_cql(&mut slice)?;
        let keyspace = String::read_cql(&mut slice)?;
        Ok(SchemaChange {
            change_type,
            keyspace,
            target: match target {
                "KEYSPACE" => SchemaChangeTarget::Keyspace,
                "TABLE" => SchemaChangeTarget::Table {
                    name: String::read_cql(&mut slice)?,
                },
                "TYPE" => SchemaChangeTarget::Type {
                    name: String::read_cql(&mut slice)?,
                },
                "FUNCTION" => SchemaChangeTarget::Function {
                    name: String::read_cql(&mut slice)?,
                    arg_types: ReadCql::read_cql(&mut slice)?,
                },
                "AGGREGATE" => SchemaChangeTarget::Aggregate {
                    name: String::read_cql(&mut slice)?,
                    arg_types: ReadCql::read_cql(&mut slice)?,
                },
                _ => SchemaChangeTarget::Other(target.into()),
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum SchemaChangeType {
    Created,
    Updated,
    Dropped,
}

#[derive(Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum SchemaChangeTarget {
    Keyspace,
    Table { name: String },
    Type { name: String },
    Function { name: String, arg_types: Vec<String> },
    Aggregate { name: String, arg_types: Vec<String> },
    Other(String),
}
