//! Scylla protocol extensions negotiated through SUPPORTED.
use crate::response::supported::Supported;

pub const SCYLLA_RATE_LIMIT_ERROR: &str = "SCYLLA_RATE_LIMIT_ERROR";
pub const SCYLLA_LWT_ADD_METADATA_MARK: &str = "SCYLLA_LWT_ADD_METADATA_MARK";
const ERROR_CODE_PREFIX: &str = "ERROR_CODE=";
const LWT_MASK_PREFIX: &str = "LWT_OPTIMIZATION_META_BIT_MASK=";

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct ProtocolExtensions {
    pub rate_limit_error_code: Option<u32>,
    /// Bit set in the prepared metadata flags of LWT statements.
    pub lwt_metadata_mask: Option<u32>,
}

fn find_prefixed(supported: &Supported, key: &str, prefix: &str) -> Option<u32> {
    let values = supported.options.get(key)?;
    let found = values
        .iter()
        .find_map(|s| s.strip_prefix(prefix)?.parse().ok());
    #[cfg(feature = "tracing")]
    if found.is_none() {
        tracing::warn!(key, ?values, "unrecognized extension values");
    }
    found
}

impl ProtocolExtensions {
    pub fn from_supported(supported: &Supported) -> Self {
        Self {
            rate_limit_error_code: find_prefixed(
                supported,
                SCYLLA_RATE_LIMIT_ERROR,
                ERROR_CODE_PREFIX,
            ),
            lwt_metadata_mask: find_prefixed(
                supported,
                SCYLLA_LWT_ADD_METADATA_MARK,
                LWT_MASK_PREFIX,
            ),
        }
    }

    /// Extensions the driver acknowledges in its STARTUP options.
    pub fn startup_options(&self) -> impl Iterator<Item = (&'static str, String)> {
        let rate_limit = self
            .rate_limit_error_code
            .map(|_| (SCYLLA_RATE_LIMIT_ERROR, String::new()));
        let lwt = self
            .lwt_metadata_mask
            .map(|mask| (SCYLLA_LWT_ADD_METADATA_MARK, format!("{LWT_MASK_PREFIX}{mask}")));
        rate_limit.into_iter().chain(lwt)
    }
}
