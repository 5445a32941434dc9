//! Shard-aware routing, advertised by Scylla nodes in SUPPORTED.
use std::num::NonZeroU16;

use shardline_cql::{
    options::{ConnectionOptions, ScyllaShardingAlgorithm},
    response::supported::Supported,
};

/// First port of the ephemeral range, where shard-aware source ports are picked.
const SOURCE_PORT_MIN: u16 = 49152;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardingInfo {
    /// Shard serving the connection.
    pub shard: u16,
    pub nr_shards: NonZeroU16,
    pub partitioner: Option<String>,
    pub algorithm: ScyllaShardingAlgorithm,
    pub ignore_msb: u8,
    pub shard_aware_port: Option<u16>,
    pub shard_aware_port_ssl: Option<u16>,
}

impl ShardingInfo {
    /// `None` if the node doesn't advertise sharding, or uses an unknown algorithm.
    pub fn from_supported(supported: &Supported) -> Option<Self> {
        let get = |option: ConnectionOptions| supported.options.get(option.as_ref())?.first();
        let shard = get(ConnectionOptions::ScyllaShard)?.parse().ok()?;
        let nr_shards = get(ConnectionOptions::ScyllaNrShards)?.parse().ok()?;
        let algorithm = get(ConnectionOptions::ScyllaShardingAlgorithm)?;
        let Ok(algorithm) = algorithm.parse::<ScyllaShardingAlgorithm>() else {
            #[cfg(feature = "tracing")]
            tracing::warn!(%algorithm, "unknown sharding algorithm");
            return None;
        };
        Some(Self {
            shard,
            nr_shards,
            partitioner: get(ConnectionOptions::ScyllaPartitioner).cloned(),
            algorithm,
            ignore_msb: supported
                .get(ConnectionOptions::ScyllaShardingIgnoreMsb.as_ref())
                .unwrap_or(0),
            shard_aware_port: supported.get(ConnectionOptions::ScyllaShardAwarePort.as_ref()),
            shard_aware_port_ssl: supported
                .get(ConnectionOptions::ScyllaShardAwarePortSsl.as_ref()),
        })
    }

    /// Same node, viewed from another of its shards; `None` if the shard doesn't exist.
    pub fn with_shard(&self, shard: u16) -> Option<Self> {
        (shard < self.nr_shards.get()).then(|| Self {
            shard,
            ..self.clone()
        })
    }

    pub fn shard_of(&self, token: i64) -> u16 {
        match self.algorithm {
            ScyllaShardingAlgorithm::BiasedTokenRoundRobin => {
                let biased = (token as u64).wrapping_add(1 << 63);
                let biased = biased.checked_shl(self.ignore_msb.into()).unwrap_or(0);
                ((biased as u128 * self.nr_shards.get() as u128) >> 64) as u16
            }
            // not parsed by `from_supported`
            _ => 0,
        }
    }

    /// Source ports for which [`Self::shard`] serves a connection to the shard-aware port,
    /// in increasing order.
    pub fn shard_aware_source_ports(&self) -> impl Iterator<Item = u16> {
        let nr_shards = u32::from(self.nr_shards.get());
        let min = u32::from(SOURCE_PORT_MIN);
        let first = min + (u32::from(self.shard) + nr_shards - min % nr_shards) % nr_shards;
        (first..=u32::from(u16::MAX))
            .step_by(nr_shards as usize)
            .map(|port| port as u16)
    }
}
