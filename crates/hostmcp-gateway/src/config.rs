//! Environment-driven configuration, loaded once at startup and validated
//! fail-fast — a missing policy service URL or a malformed origin list
//! should never surface as a runtime error on the first request.

use std::time::Duration;

use url::Url;

/// Typed view of the `WEB_*`/`CONVEX_*` environment contract.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: String,
    pub policy_service_url: Url,
    pub llm_backend_url: Url,
    pub allowed_origins: Vec<String>,
    pub connect_timeout: Duration,
    pub call_timeout: Duration,
    pub stream_timeout: Duration,
    pub rate_limit_enabled: bool,
    pub chat_max_steps: u32,
}

impl GatewayConfig {
    /// Build from process environment, mirroring the env keys spec'd for
    /// this gateway. Fails fast with a descriptive message rather than
    /// falling back to an insecure default for anything security-relevant.
    pub fn from_env() -> anyhow::Result<Self> {
        let source = config::Config::builder()
            .set_default("bind_addr", "0.0.0.0:8080")?
            .set_default("web_connect_timeout_ms", 10_000)?
            .set_default("web_call_timeout_ms", 30_000)?
            .set_default("web_stream_timeout_ms", 120_000)?
            .set_default("web_rate_limit_enabled", true)?
            .set_default("chat_max_steps", 8)?
            .add_source(config::Environment::default().try_parsing(true).separator("__"))
            .build()?;

        let policy_service_raw: String = source
            .get("convex_http_url")
            .map_err(|_| anyhow::anyhow!("CONVEX_HTTP_URL must be set"))?;
        let policy_service_url = Url::parse(&policy_service_raw)
            .map_err(|e| anyhow::anyhow!("CONVEX_HTTP_URL is not a valid url: {e}"))?;

        let llm_backend_raw: String = source
            .get("web_llm_backend_url")
            .map_err(|_| anyhow::anyhow!("WEB_LLM_BACKEND_URL must be set"))?;
        let llm_backend_url = Url::parse(&llm_backend_raw)
            .map_err(|e| anyhow::anyhow!("WEB_LLM_BACKEND_URL is not a valid url: {e}"))?;

        let allowed_origins_raw: String = source
            .get("web_allowed_origins")
            .map_err(|_| anyhow::anyhow!("WEB_ALLOWED_ORIGINS must be set"))?;
        let allowed_origins: Vec<String> = allowed_origins_raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        for origin in &allowed_origins {
            Url::parse(origin).map_err(|e| anyhow::anyhow!("WEB_ALLOWED_ORIGINS entry '{origin}' is not an absolute url: {e}"))?;
        }
        if allowed_origins.is_empty() {
            anyhow::bail!("WEB_ALLOWED_ORIGINS must name at least one origin");
        }

        Ok(Self {
            bind_addr: source.get_string("bind_addr")?,
            policy_service_url,
            llm_backend_url,
            allowed_origins,
            connect_timeout: Duration::from_millis(source.get_int("web_connect_timeout_ms")? as u64),
            call_timeout: Duration::from_millis(source.get_int("web_call_timeout_ms")? as u64),
            stream_timeout: Duration::from_millis(source.get_int("web_stream_timeout_ms")? as u64),
            rate_limit_enabled: source.get_bool("web_rate_limit_enabled")?,
            chat_max_steps: source.get_int("chat_max_steps")? as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_absolute_allowed_origin() {
        // Exercise the same validation `from_env` performs, without requiring
        // process environment mutation in a parallel test binary.
        let bad = "not-a-url";
        assert!(Url::parse(bad).is_err());
    }
}
