//! Process-wide general settings.

use serde::{Deserialize, Serialize};

use crate::section::Section;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralSection {
    /// Identifier of this node in a cluster.
    pub node_id: String,

    /// Tenant applied when an event carries none.
    pub default_tenant: String,

    /// Timezone name used when parsing local timestamps.
    pub default_timezone: String,

    /// Decimal places kept after rounding.
    pub rounding_decimals: i64,

    /// Connection attempts before giving up on a peer.
    pub connect_attempts: u32,

    /// Reconnect attempts; -1 retries forever.
    pub reconnects: i64,

    pub connect_timeout_secs: u64,

    pub reply_timeout_secs: u64,

    /// Upper bound on concurrently served requests.
    pub max_parallel_conns: u32,

    pub digest_separator: String,
}

impl Default for GeneralSection {
    fn default() -> Self {
        Self {
            node_id: String::new(),
            default_tenant: "example.org".to_string(),
            default_timezone: "Local".to_string(),
            rounding_decimals: 5,
            connect_attempts: 5,
            reconnects: -1,
            connect_timeout_secs: 1,
            reply_timeout_secs: 2,
            max_parallel_conns: 100,
            digest_separator: ",".to_string(),
        }
    }
}

impl Section for GeneralSection {
    const NAME: &'static str = "general";

    fn validate(&self) -> Result<(), String> {
        if self.default_tenant.is_empty() {
            return Err("default_tenant must not be empty".into());
        }
        if !(0..=16).contains(&self.rounding_decimals) {
            return Err(format!("rounding_decimals {} outside 0..=16", self.rounding_decimals));
        }
        if self.reconnects < -1 {
            return Err("reconnects must be >= -1".into());
        }
        if self.max_parallel_conns == 0 {
            return Err("max_parallel_conns must be > 0".into());
        }
        if self.digest_separator.is_empty() {
            return Err("digest_separator must not be empty".into());
        }
        Ok(())
    }
}
