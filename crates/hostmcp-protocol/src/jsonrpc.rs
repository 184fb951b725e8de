//! JSON-RPC 2.0 framing used on the wire between a [`crate::types`] caller
//! and an MCP server, over either HTTP-streamable or HTTP-SSE.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// JSON-RPC version marker; serializes/deserializes as the literal `"2.0"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonRpcVersion;

const JSONRPC_VERSION: &str = "2.0";

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(JSONRPC_VERSION)
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let version = String::deserialize(deserializer)?;
        if version == JSONRPC_VERSION {
            Ok(JsonRpcVersion)
        } else {
            Err(serde::de::Error::custom(format!(
                "invalid JSON-RPC version: expected '{JSONRPC_VERSION}', got '{version}'"
            )))
        }
    }
}

/// A JSON-RPC request identifier — MCP uses either a string or a number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric identifier.
    Number(i64),
    /// String identifier.
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self::Number(id as i64)
    }
}

/// A JSON-RPC request message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: JsonRpcVersion,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    pub id: RequestId,
}

impl JsonRpcRequest {
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            method: method.into(),
            params,
            id,
        }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Mutually-exclusive success/error payload of a JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcResponsePayload {
    Success { result: Value },
    Error { error: JsonRpcError },
}

/// A JSON-RPC response message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: JsonRpcVersion,
    #[serde(flatten)]
    pub payload: JsonRpcResponsePayload,
    pub id: Option<RequestId>,
}

impl JsonRpcResponse {
    /// Extract the result, mapping a JSON-RPC error payload into a
    /// gateway-shaped [`crate::error::GatewayError`].
    pub fn into_result(self) -> crate::error::GatewayResult<Value> {
        match self.payload {
            JsonRpcResponsePayload::Success { result } => Ok(result),
            JsonRpcResponsePayload::Error { error } => {
                Err(crate::error::GatewayError::mcp_rpc(error.code, error.message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_round_trips() {
        let v = serde_json::to_string(&JsonRpcVersion).unwrap();
        assert_eq!(v, "\"2.0\"");
        let back: JsonRpcVersion = serde_json::from_str(&v).unwrap();
        assert_eq!(back, JsonRpcVersion);
    }

    #[test]
    fn wrong_version_rejected() {
        let err: Result<JsonRpcVersion, _> = serde_json::from_str("\"1.0\"");
        assert!(err.is_err());
    }

    #[test]
    fn request_omits_absent_params() {
        let req = JsonRpcRequest::new(RequestId::Number(1), "tools/list", None);
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("params").is_none());
    }

    #[test]
    fn response_error_maps_to_gateway_error() {
        let resp = JsonRpcResponse {
            jsonrpc: JsonRpcVersion,
            payload: JsonRpcResponsePayload::Error {
                error: JsonRpcError {
                    code: -32601,
                    message: "method not found".into(),
                    data: None,
                },
            },
            id: Some(RequestId::Number(1)),
        };
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InternalError);
    }
}
