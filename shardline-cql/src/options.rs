//! Option keys exchanged in SUPPORTED and STARTUP.

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, strum::EnumString, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ConnectionOptions {
    Compression,
    CqlVersion,
    DriverName,
    DriverVersion,
    ScyllaShard,
    ScyllaNrShards,
    ScyllaPartitioner,
    ScyllaShardingAlgorithm,
    #[strum(serialize = "SCYLLA_SHARDING_IGNORE_MSB")]
    ScyllaShardingIgnoreMsb,
    ScyllaShardAwarePort,
    #[strum(serialize = "SCYLLA_SHARD_AWARE_PORT_SSL")]
    ScyllaShardAwarePortSsl,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "kebab-case")]
#[non_exhaustive]
pub enum ScyllaShardingAlgorithm {
    BiasedTokenRoundRobin,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn option_keys() {
        assert_eq!(ConnectionOptions::ScyllaNrShards.as_ref(), "SCYLLA_NR_SHARDS");
        assert_eq!(
            ConnectionOptions::ScyllaShardingIgnoreMsb.as_ref(),
            "SCYLLA_SHARDING_IGNORE_MSB"
        );
        assert_eq!(
            ConnectionOptions::ScyllaShardAwarePortSsl.as_ref(),
            "SCYLLA_SHARD_AWARE_PORT_SSL"
        );
        assert_eq!(ConnectionOptions::CqlVersion.to_string(), "CQL_VERSION");
        assert_eq!(
            ConnectionOptions::from_str("SCYLLA_SHARD"),
            Ok(ConnectionOptions::ScyllaShard)
        );
    }

    #[test]
    fn sharding_algorithm() {
        assert_eq!(
            ScyllaShardingAlgorithm::from_str("biased-token-round-robin"),
            Ok(ScyllaShardingAlgorithm::BiasedTokenRoundRobin)
        );
        assert!(ScyllaShardingAlgorithm::from_str("murmur3").is_err());
    }
}
