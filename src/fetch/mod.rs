//! Batched, bounded-concurrency page fetching with a content-type probe.

use std::collections::HashSet;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, PipelineConfig};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid URL: must be HTTP(S)")]
    InvalidScheme,

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("fetch failed: status {0}")]
    Status(u16),

    #[error("not HTML: {0}")]
    UnsupportedContentType(String),

    #[error("response too large (>{0} bytes)")]
    TooLarge(usize),
}

#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub url: String,
    pub status_code: u16,
    pub content_type: String,
    pub raw_html: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedUrl {
    pub url: String,
    pub reason: String,
}

/// Outcome of one `fetch_all` call. Order within `documents` is not meaningful.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub documents: Vec<FetchedDocument>,
    pub failed: Vec<FailedUrl>,
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub batch_size: usize,
    pub timeout: Duration,
    pub max_response_bytes: usize,
    pub user_agent: String,
}

impl From<&PipelineConfig> for FetchOptions {
    fn from(cfg: &PipelineConfig) -> Self {
        Self {
            batch_size: cfg.batch_size,
            timeout: cfg.fetch_timeout(),
            max_response_bytes: cfg.max_response_bytes,
            user_agent: cfg.user_agent.clone(),
        }
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

/// Builds the shared HTTP client. Its connection pool is safe to use from
/// every concurrent fetch task.
pub fn http_client(cfg: &PipelineConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(cfg.connect_timeout())
        .redirect(reqwest::redirect::Policy::limited(cfg.max_redirects))
        .user_agent(cfg.user_agent.as_str())
        .build()
}

/// Fetches `urls` in consecutive batches of `batch_size`.
///
/// Batches run one after another; inside a batch every URL is probed with a
/// HEAD request and, when the probe reports HTML, fetched with GET, with up to
/// `batch_size` URLs in flight. Each URL gets at most one attempt. Timeouts,
/// non-200 responses and non-HTML content land in `failed`, never in `Err`.
pub async fn fetch_all(
    client: &Client,
    urls: &[String],
    opts: &FetchOptions,
) -> Result<FetchReport, ConfigError> {
    if opts.batch_size == 0 {
        return Err(ConfigError::ZeroBatchSize);
    }
    if opts.timeout.is_zero() {
        return Err(ConfigError::ZeroTimeout("timeout"));
    }

    let attempted = Mutex::new(HashSet::new());
    let mut report = FetchReport::default();

    for (index, batch) in urls.chunks(opts.batch_size).enumerate() {
        let outcomes: Vec<_> = stream::iter(batch)
            .filter(|url| {
                let fresh = attempted.lock().insert(url.to_string());
                if !fresh {
                    debug!(url = %url, "skipping repeated URL");
                }
                futures::future::ready(fresh)
            })
            .map(|url| async move { (url, fetch_one(client, url, opts).await) })
            .buffer_unordered(batch.len())
            .collect()
            .await;

        for (url, outcome) in outcomes {
            match outcome {
                Ok(doc) => report.documents.push(doc),
                Err(e) => {
                    warn!(url = %url, error = %e, "dropping URL");
                    report.failed.push(FailedUrl {
                        url: url.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        debug!(batch = index, size = batch.len(), "batch complete");
    }

    info!(
        fetched = report.documents.len(),
        failed = report.failed.len(),
        "fetch complete"
    );
    Ok(report)
}

async fn fetch_one(
    client: &Client,
    url: &str,
    opts: &FetchOptions,
) -> Result<FetchedDocument, FetchError> {
    validate_url(url)?;
    probe(client, url, opts).await?;
    download(client, url, opts).await
}

/// Cheap HEAD request gating the full fetch on a declared HTML content type.
async fn probe(client: &Client, url: &str, opts: &FetchOptions) -> Result<(), FetchError> {
    let response = client
        .head(url)
        .header("User-Agent", &opts.user_agent)
        .timeout(opts.timeout)
        .send()
        .await
        .map_err(|e| classify(e, opts.timeout))?;

    let content_type = content_type(&response);
    if !is_html(&content_type) {
        return Err(FetchError::UnsupportedContentType(content_type));
    }
    Ok(())
}

async fn download(
    client: &Client,
    url: &str,
    opts: &FetchOptions,
) -> Result<FetchedDocument, FetchError> {
    let response = client
        .get(url)
        .header("User-Agent", &opts.user_agent)
        .timeout(opts.timeout)
        .send()
        .await
        .map_err(|e| classify(e, opts.timeout))?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(FetchError::Status(status.as_u16()));
    }

    let content_type = content_type(&response);
    if !is_html(&content_type) {
        return Err(FetchError::UnsupportedContentType(content_type));
    }

    if let Some(len) = response.content_length()
        && len as usize > opts.max_response_bytes
    {
        return Err(FetchError::TooLarge(opts.max_response_bytes));
    }

    let mut body = Vec::new();
    let mut stream = response;
    while let Some(chunk) = stream.chunk().await.map_err(|e| classify(e, opts.timeout))? {
        body.extend_from_slice(&chunk);
        if body.len() > opts.max_response_bytes {
            return Err(FetchError::TooLarge(opts.max_response_bytes));
        }
    }

    debug!(url = %url, bytes = body.len(), "page fetched");
    Ok(FetchedDocument {
        url: url.to_string(),
        status_code: status.as_u16(),
        content_type,
        raw_html: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn content_type(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

fn is_html(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("text/html")
}

fn classify(e: reqwest::Error, timeout: Duration) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(timeout)
    } else {
        FetchError::Http(e)
    }
}

fn validate_url(raw: &str) -> Result<(), FetchError> {
    let parsed = url::Url::parse(raw)?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(FetchError::InvalidScheme),
    }
}
