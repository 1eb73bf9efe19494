use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::CONFIG;
use crate::utils::http::get_http_client;

const SHORTENER_TIMEOUT_SECONDS: u64 = 8;

#[derive(Debug, Error)]
#[error("Shortener error: {0}")]
pub struct ShortenerError(pub String);

#[derive(Debug, Deserialize)]
struct ShortenerResponse {
    status: Option<String>,
    #[serde(rename = "shortenedUrl")]
    shortened_url: Option<String>,
}

fn extract_short_url(payload: ShortenerResponse) -> Option<String> {
    let success = payload
        .status
        .as_deref()
        .map(|status| status.eq_ignore_ascii_case("success"))
        .unwrap_or(false);
    if !success {
        return None;
    }
    payload.shortened_url.and_then(|url| {
        let url = url.trim().to_string();
        (!url.is_empty()).then_some(url)
    })
}

/// Rewrites outbound deep links through a third-party shortening service.
/// Shortening is a convenience: every failure mode (disabled, unconfigured,
/// timeout, bad response) passes the long URL through unchanged and never
/// propagates an error to the caller.
#[derive(Clone)]
pub struct LinkShortener {
    domain: String,
    api_key: String,
    enabled: Arc<AtomicBool>,
}

impl LinkShortener {
    pub fn new(domain: String, api_key: String, enabled: bool) -> Self {
        LinkShortener {
            domain,
            api_key,
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    pub fn from_config() -> Self {
        Self::new(
            CONFIG.shortener_domain.clone(),
            CONFIG.shortener_api_key.clone(),
            CONFIG.shortlink_enabled,
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Administrative toggle; returns the state now in effect.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        self.enabled.store(enabled, Ordering::SeqCst);
        info!("Shortlink toggled {}", if enabled { "on" } else { "off" });
        enabled
    }

    fn is_configured(&self) -> bool {
        !self.domain.trim().is_empty() && !self.api_key.trim().is_empty()
    }

    fn endpoint(&self) -> String {
        let domain = self.domain.trim().trim_end_matches('/');
        if domain.starts_with("http://") || domain.starts_with("https://") {
            format!("{domain}/api")
        } else {
            format!("https://{domain}/api")
        }
    }

    pub async fn shorten(&self, long_url: &str) -> String {
        if !self.is_enabled() || !self.is_configured() {
            return long_url.to_string();
        }

        match self.request_short_url(long_url).await {
            Ok(Some(short)) => short,
            Ok(None) => {
                warn!("Shortener returned no usable URL, passing the long link through");
                long_url.to_string()
            }
            Err(err) => {
                warn!("Shortener request failed, passing the long link through: {err}");
                long_url.to_string()
            }
        }
    }

    async fn request_short_url(&self, long_url: &str) -> Result<Option<String>, ShortenerError> {
        let response = get_http_client()
            .get(self.endpoint())
            .query(&[("api", self.api_key.as_str()), ("url", long_url)])
            .timeout(Duration::from_secs(SHORTENER_TIMEOUT_SECONDS))
            .send()
            .await
            .map_err(|err| ShortenerError(format!("request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(ShortenerError(format!(
                "request failed with status {}",
                response.status()
            )));
        }

        let payload: ShortenerResponse = response
            .json()
            .await
            .map_err(|err| ShortenerError(format!("invalid response: {err}")))?;
        Ok(extract_short_url(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_URL: &str = "https://t.me/movie_bot?start=file_42";

    #[tokio::test]
    async fn disabled_adapter_passes_the_url_through() {
        let shortener = LinkShortener::new("example.com".into(), "key".into(), false);
        assert_eq!(shortener.shorten(LONG_URL).await, LONG_URL);
    }

    #[tokio::test]
    async fn unconfigured_adapter_passes_the_url_through() {
        let shortener = LinkShortener::new(String::new(), String::new(), true);
        assert_eq!(shortener.shorten(LONG_URL).await, LONG_URL);
    }

    #[tokio::test]
    async fn unreachable_endpoint_passes_the_url_through() {
        // Nothing listens on port 9 ("discard"); the connect fails fast.
        let shortener = LinkShortener::new("http://127.0.0.1:9".into(), "key".into(), true);
        assert_eq!(shortener.shorten(LONG_URL).await, LONG_URL);
    }

    #[test]
    fn toggle_reports_the_new_state() {
        let shortener = LinkShortener::new("example.com".into(), "key".into(), true);
        assert!(!shortener.set_enabled(false));
        assert!(!shortener.is_enabled());
        assert!(shortener.set_enabled(true));
    }

    #[test]
    fn extracts_the_short_url_from_a_success_payload() {
        let payload: ShortenerResponse =
            serde_json::from_str(r#"{"status":"success","shortenedUrl":"https://sho.rt/abc"}"#)
                .unwrap();
        assert_eq!(
            extract_short_url(payload),
            Some("https://sho.rt/abc".to_string())
        );
    }

    #[test]
    fn non_success_or_empty_payloads_yield_none() {
        let error: ShortenerResponse =
            serde_json::from_str(r#"{"status":"error","message":"bad key"}"#).unwrap();
        assert_eq!(extract_short_url(error), None);

        let missing_url: ShortenerResponse =
            serde_json::from_str(r#"{"status":"success"}"#).unwrap();
        assert_eq!(extract_short_url(missing_url), None);

        let blank_url: ShortenerResponse =
            serde_json::from_str(r#"{"status":"success","shortenedUrl":"  "}"#).unwrap();
        assert_eq!(extract_short_url(blank_url), None);
    }
}
