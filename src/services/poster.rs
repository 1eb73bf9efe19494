use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::config::CONFIG;
use crate::utils::http::get_http_client;

const POSTER_TIMEOUT_SECONDS: u64 = 10;
const TMDB_SEARCH_ENDPOINT: &str = "https://api.themoviedb.org/3/search/movie";
const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w342";

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse {
    #[serde(default)]
    results: Vec<TmdbMovie>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovie {
    poster_path: Option<String>,
}

fn extract_poster_url(payload: TmdbSearchResponse) -> Option<String> {
    payload
        .results
        .into_iter()
        .find_map(|movie| movie.poster_path)
        .map(|path| format!("{TMDB_IMAGE_BASE}{path}"))
}

/// Best-effort poster lookup for search replies. Any failure (no API key,
/// transport error, empty result set) resolves to the configured fallback
/// image URL; the caller always gets something displayable.
#[derive(Clone)]
pub struct PosterClient {
    api_key: String,
    fallback_url: String,
}

impl PosterClient {
    pub fn new(api_key: String, fallback_url: String) -> Self {
        PosterClient {
            api_key,
            fallback_url,
        }
    }

    pub fn from_config() -> Self {
        Self::new(
            CONFIG.tmdb_api_key.clone(),
            CONFIG.poster_fallback_url.clone(),
        )
    }

    pub async fn poster_url(&self, title: &str) -> String {
        if self.api_key.trim().is_empty() || title.trim().is_empty() {
            return self.fallback_url.clone();
        }

        match self.search_poster(title).await {
            Ok(Some(url)) => url,
            Ok(None) => self.fallback_url.clone(),
            Err(err) => {
                warn!("Poster lookup failed for \"{title}\": {err}");
                self.fallback_url.clone()
            }
        }
    }

    async fn search_poster(&self, title: &str) -> anyhow::Result<Option<String>> {
        let response = get_http_client()
            .get(TMDB_SEARCH_ENDPOINT)
            .query(&[("api_key", self.api_key.as_str()), ("query", title)])
            .timeout(Duration::from_secs(POSTER_TIMEOUT_SECONDS))
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("poster service responded with status {}", response.status());
        }

        let payload: TmdbSearchResponse = response.json().await?;
        Ok(extract_poster_url(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FALLBACK: &str = "https://example.com/fallback.jpg";

    #[tokio::test]
    async fn missing_api_key_yields_the_fallback_poster() {
        let client = PosterClient::new(String::new(), FALLBACK.into());
        assert_eq!(client.poster_url("pathaan 2023").await, FALLBACK);
    }

    #[test]
    fn extracts_the_first_available_poster_path() {
        let payload: TmdbSearchResponse = serde_json::from_str(
            r#"{"results":[{"poster_path":null},{"poster_path":"/abc.jpg","title":"Pathaan"}]}"#,
        )
        .unwrap();
        assert_eq!(
            extract_poster_url(payload),
            Some("https://image.tmdb.org/t/p/w342/abc.jpg".to_string())
        );
    }

    #[test]
    fn empty_result_set_yields_none() {
        let payload: TmdbSearchResponse = serde_json::from_str(r#"{"results":[]}"#).unwrap();
        assert_eq!(extract_poster_url(payload), None);

        let missing: TmdbSearchResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(extract_poster_url(missing), None);
    }
}
