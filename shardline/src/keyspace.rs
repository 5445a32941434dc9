//! CQL text of the keyspace DDL statements issued by the session helpers.
use std::{collections::BTreeMap, fmt::Write};

use crate::error::InvalidKeyspace;

pub(crate) const MAX_KEYSPACE_LENGTH: usize = 48;

pub(crate) fn check_keyspace(keyspace: &str) -> Result<(), InvalidKeyspace> {
    let valid = !keyspace.is_empty()
        && keyspace.len() <= MAX_KEYSPACE_LENGTH
        && keyspace
            .chars()
            .all(|c| matches!(c, 'a'..='z' | 'A'..='Z' | '_' | '0'..='9'));
    if !valid {
        return Err(InvalidKeyspace(keyspace.into()));
    }
    Ok(())
}

pub(crate) fn use_keyspace_cql(keyspace: &str) -> Result<String, InvalidKeyspace> {
    check_keyspace(keyspace)?;
    Ok(format!("USE \"{keyspace}\""))
}

pub(crate) fn drop_keyspace_cql(keyspace: &str, if_exists: bool) -> Result<String, InvalidKeyspace> {
    check_keyspace(keyspace)?;
    let if_exists = if if_exists { " IF EXISTS" } else { "" };
    Ok(format!("DROP KEYSPACE{if_exists} \"{keyspace}\""))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationStrategy {
    Simple { replication_factor: u32 },
    /// Replication factor per datacenter.
    NetworkTopology(BTreeMap<String, u32>),
}

impl Default for ReplicationStrategy {
    fn default() -> Self {
        Self::Simple {
            replication_factor: 1,
        }
    }
}

/// `CREATE KEYSPACE` statement builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyspaceBuilder {
    name: String,
    replication: ReplicationStrategy,
    if_not_exists: bool,
    durable_writes: Option<bool>,
}

impl KeyspaceBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            replication: Default::default(),
            if_not_exists: false,
            durable_writes: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn simple_strategy(mut self, replication_factor: u32) -> Self {
        self.replication = ReplicationStrategy::Simple { replication_factor };
        self
    }

    /// Switches to `NetworkTopologyStrategy` if needed, and sets the datacenter replication
    /// factor.
    pub fn datacenter(mut self, datacenter: impl Into<String>, replication_factor: u32) -> Self {
        if let ReplicationStrategy::Simple { .. } = self.replication {
            self.replication = ReplicationStrategy::NetworkTopology(BTreeMap::new());
        }
        if let ReplicationStrategy::NetworkTopology(ref mut datacenters) = self.replication {
            datacenters.insert(datacenter.into(), replication_factor);
        }
        self
    }

    pub fn replication(mut self, replication: ReplicationStrategy) -> Self {
        self.replication = replication;
        self
    }

    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    pub fn durable_writes(mut self, durable_writes: bool) -> Self {
        self.durable_writes = Some(durable_writes);
        self
    }

    pub fn to_cql(&self) -> Result<String, InvalidKeyspace> {
        check_keyspace(&self.name)?;
        let mut cql = String::from("CREATE KEYSPACE ");
        if self.if_not_exists {
            cql.push_str("IF NOT EXISTS ");
        }
        // writing into a String never fails
        let _ = write!(cql, "\"{}\" WITH replication = {{", self.name);
        match &self.replication {
            ReplicationStrategy::Simple { replication_factor } => {
                let _ = write!(
                    cql,
                    "'class': 'SimpleStrategy', 'replication_factor': {replication_factor}"
                );
            }
            ReplicationStrategy::NetworkTopology(datacenters) => {
                cql.push_str("'class': 'NetworkTopologyStrategy'");
                for (datacenter, replication_factor) in datacenters {
                    let datacenter = datacenter.replace('\'', "''");
                    let _ = write!(cql, ", '{datacenter}': {replication_factor}");
                }
            }
        }
        cql.push('}');
        if let Some(durable_writes) = self.durable_writes {
            let _ = write!(cql, " AND durable_writes = {durable_writes}");
        }
        Ok(cql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyspace_names() {
        assert!(check_keyspace("my_keyspace_1").is_ok());
        assert!(check_keyspace(&"k".repeat(48)).is_ok());
        assert!(check_keyspace(&"k".repeat(49)).is_err());
        assert!(check_keyspace("").is_err());
        assert!(check_keyspace("ks\"; DROP").is_err());
    }

    #[test]
    fn simple_strategy() {
        let cql = KeyspaceBuilder::new("ks")
            .if_not_exists()
            .simple_strategy(3)
            .to_cql()
            .unwrap();
        assert_eq!(
            cql,
            "CREATE KEYSPACE IF NOT EXISTS \"ks\" WITH replication = \
             {'class': 'SimpleStrategy', 'replication_factor': 3}"
        );
    }

    #[test]
    fn network_topology_strategy() {
        let cql = KeyspaceBuilder::new("ks")
            .datacenter("dc2", 2)
            .datacenter("dc1", 3)
            .durable_writes(false)
            .to_cql()
            .unwrap();
        assert_eq!(
            cql,
            "CREATE KEYSPACE \"ks\" WITH replication = \
             {'class': 'NetworkTopologyStrategy', 'dc1': 3, 'dc2': 2} AND durable_writes = false"
        );
    }

    #[test]
    fn drop_and_use() {
        assert_eq!(drop_keyspace_cql("ks", true).unwrap(), "DROP KEYSPACE IF EXISTS \"ks\"");
        assert_eq!(drop_keyspace_cql("ks", false).unwrap(), "DROP KEYSPACE \"ks\"");
        assert_eq!(use_keyspace_cql("ks").unwrap(), "USE \"ks\"");
        assert!(use_keyspace_cql("k s").is_err());
    }
}
