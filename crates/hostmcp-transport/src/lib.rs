//! Client-side MCP transports available to the hosted gateway: HTTP
//! streamable and HTTP SSE. Hosted mode never spawns a child process, so
//! stdio is intentionally not represented here — see [`TransportKind`].

mod http_sse;
mod http_streamable;
mod sse_parser;
mod traits;

pub use http_sse::HttpSseTransport;
pub use http_streamable::HttpStreamableTransport;
pub use sse_parser::{SseEvent, SseParser};
pub use traits::{McpTransport, TransportKind};
