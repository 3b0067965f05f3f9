use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::section::Section;

/// Addresses the RPC and HTTP front-ends bind to.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListenSection {
    pub rpc_json: String,
    pub http: String,
    pub rpc_json_tls: String,
    pub http_tls: String,
}

impl Default for ListenSection {
    fn default() -> Self {
        Self {
            rpc_json: "127.0.0.1:2012".to_string(),
            http: "127.0.0.1:2080".to_string(),
            rpc_json_tls: "127.0.0.1:2022".to_string(),
            http_tls: "127.0.0.1:2280".to_string(),
        }
    }
}

impl Section for ListenSection {
    const NAME: &'static str = "listen";

    fn validate(&self) -> Result<(), String> {
        for (field, addr) in [
            ("rpc_json", &self.rpc_json),
            ("http", &self.http),
            ("rpc_json_tls", &self.rpc_json_tls),
            ("http_tls", &self.http_tls),
        ] {
            // empty disables the listener
            if !addr.is_empty() && addr.parse::<SocketAddr>().is_err() {
                return Err(format!("{} is not a socket address: {}", field, addr));
            }
        }
        Ok(())
    }
}
