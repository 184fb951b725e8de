//! Shared, cross-request gateway state: the HTTP client, the authorizer
//! client, and the rate limiter. This is the only state any two requests
//! ever touch concurrently — session managers are always request-scoped.

use std::sync::Arc;
use std::time::Duration;

use hostmcp_authz::AuthorizerClient;
use reqwest::Client;

use crate::config::GatewayConfig;
use crate::llm::{HttpLlmBackendClient, LlmBackendClient};
use crate::rate_limit::TenantRateLimiter;

#[derive(Clone)]
pub struct AppState(pub Arc<AppStateInner>);

pub struct AppStateInner {
    pub config: GatewayConfig,
    pub http_client: Client,
    pub authorizer: AuthorizerClient,
    pub rate_limiter: TenantRateLimiter,
    pub llm_backend: Arc<dyn LlmBackendClient>,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        let http_client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let authorizer = AuthorizerClient::new(http_client.clone(), config.policy_service_url.clone());
        let rate_limiter = TenantRateLimiter::new();
        let llm_backend = Arc::new(HttpLlmBackendClient::new(http_client.clone(), config.llm_backend_url.clone()));

        Ok(Self(Arc::new(AppStateInner {
            config,
            http_client,
            authorizer,
            rate_limiter,
            llm_backend,
        })))
    }
}

impl std::ops::Deref for AppState {
    type Target = AppStateInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
