//! External authorization and the OAuth CORS proxy: the two places the
//! gateway talks to systems outside its own process boundary other than an
//! MCP server itself.

mod client;
mod proxy;
mod ssrf;

pub use client::{AuthorizerClient, ShareResolution};
pub use proxy::{forward_oauth_request, ProxyRequest, ProxyResponse};
pub use ssrf::{validate_https_url, SsrfError};
