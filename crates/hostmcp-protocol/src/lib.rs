//! JSON-RPC framing and MCP domain types shared by the transport, client, and
//! gateway crates, plus the gateway-wide error taxonomy.

pub mod descriptor;
pub mod error;
pub mod jsonrpc;
pub mod types;

pub use descriptor::{DescriptorTransport, ServerDescriptor, SessionKey, TenantId};
pub use error::{ErrorCode, ErrorReport, GatewayError, GatewayResult};
pub use jsonrpc::{JsonRpcRequest, JsonRpcResponse, JsonRpcResponsePayload, RequestId};
