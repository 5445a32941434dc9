use std::{collections::HashMap, io, str::FromStr};

use crate::cql::ReadCql;

#[derive(Debug, Clone, Default)]
pub struct Supported {
    pub options: HashMap<String, Vec<String>>,
}

impl Supported {
    pub fn deserialize(mut slice: &[u8]) -> io::Result<Self> {
        let options = HashMap::<String, Vec<String>>::read_cql(&mut slice)?;
        Ok(Self { options })
    }

    /// First value of an option, parsed.
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: FromStr,
    {
        self.options.get(key)?.first()?.parse().ok()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }
}
