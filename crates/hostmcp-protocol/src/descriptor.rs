//! Shared gateway-level data model: the tenant identifier, the caller-chosen
//! key for one server within a request, and the descriptor the authorizer
//! hands back describing how to reach that server.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;

/// Workspace id if present on the request, else the unverified `sub` claim
/// of the bearer JWT. Never itself proof of authorization.
pub type TenantId = String;

/// The caller-supplied `serverId`, unique within one session manager.
pub type SessionKey = String;

/// The transport an authorized server descriptor names. `Stdio` is a real
/// variant specifically so its rejection is a typed match arm rather than a
/// string comparison against whatever the policy service happened to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorTransport {
    Http,
    HttpSse,
    Stdio,
}

/// What the Authorizer Client returns for one (workspace, server) pair: how
/// the gateway is to reach that MCP server for the lifetime of one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerDescriptor {
    pub transport: DescriptorTransport,
    #[serde(with = "url_serde")]
    pub url: Url,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(rename = "useOauth", default)]
    pub use_oauth: bool,
}

mod url_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use url::Url;

    pub fn serialize<S: Serializer>(url: &Url, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(url.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Url, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Url::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdio_descriptor_round_trips_as_a_typed_variant() {
        let json = serde_json::json!({
            "transport": "stdio",
            "url": "stdio://local",
            "headers": {},
        });
        let descriptor: ServerDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(descriptor.transport, DescriptorTransport::Stdio);
    }
}
