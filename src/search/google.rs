use std::env;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{SearchError, SearchProvider};

const API_BASE: &str = "https://www.googleapis.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Option<Vec<SearchItem>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<u16>,
    message: Option<String>,
}

#[derive(Clone)]
struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Google Custom Search JSON API client.
#[derive(Debug, Clone)]
pub struct GoogleSearch {
    http: Client,
    api_key: ApiKey,
    engine_id: String,
    base_url: String,
}

impl GoogleSearch {
    pub fn new(http: Client, api_key: &str, engine_id: &str) -> Result<Self, SearchError> {
        if api_key.trim().is_empty() || engine_id.trim().is_empty() {
            return Err(SearchError::CredentialsNotSet);
        }
        Ok(Self {
            http,
            api_key: ApiKey(api_key.trim().to_string()),
            engine_id: engine_id.trim().to_string(),
            base_url: API_BASE.to_string(),
        })
    }

    pub fn from_env(http: Client) -> Result<Self, SearchError> {
        let api_key = env::var("GOOGLE_API_KEY").map_err(|_| SearchError::CredentialsNotSet)?;
        let engine_id =
            env::var("GOOGLE_ENGINE_ID").map_err(|_| SearchError::CredentialsNotSet)?;
        Self::new(http, &api_key, &engine_id)
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: ApiKey("test-key".to_string()),
            engine_id: "test-engine".to_string(),
            base_url: base_url.to_string(),
        }
    }

    fn endpoint(&self, query: &str, num: usize) -> Result<url::Url, SearchError> {
        let mut url = url::Url::parse(&format!("{}/customsearch/v1", self.base_url))?;
        url.query_pairs_mut()
            .append_pair("key", &self.api_key.0)
            .append_pair("cx", &self.engine_id)
            .append_pair("q", query)
            .append_pair("num", &num.to_string());
        Ok(url)
    }
}

impl SearchProvider for GoogleSearch {
    async fn search(&self, query: &str, num: usize) -> Result<Vec<String>, SearchError> {
        let url = self.endpoint(query, num)?;

        let response = self
            .http
            .get(url)
            .header("User-Agent", crate::USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("search API rate limited");
            return Err(SearchError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if let Ok(body) = serde_json::from_str::<SearchResponse>(&text)
                && let Some(err) = body.error
            {
                return Err(classify_api_error(err, status.as_u16()));
            }
            let end = text.floor_char_boundary(200);
            return Err(SearchError::Api {
                code: status.as_u16(),
                message: format!("HTTP {status}: {}", &text[..end]),
            });
        }

        let body: SearchResponse = response.json().await?;
        let links: Vec<String> = body
            .items
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| item.link.filter(|l| !l.is_empty()))
            .take(num)
            .collect();

        debug!(query, results = links.len(), "search complete");
        Ok(links)
    }
}

fn classify_api_error(err: ApiError, status: u16) -> SearchError {
    let message = err.message.unwrap_or_else(|| "Unknown error".to_string());
    match err.code.unwrap_or(status) {
        429 => SearchError::RateLimited,
        code => SearchError::Api { code, message },
    }
}
