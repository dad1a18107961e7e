//! URL resolution: query fan-out to a search provider, global dedup, and per-query caps.

pub mod google;
pub mod resolver;

pub use google::GoogleSearch;
pub use resolver::{ResolveLimits, resolve};

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("GOOGLE_API_KEY / GOOGLE_ENGINE_ID not set")]
    CredentialsNotSet,

    #[error("search rate limit exceeded")]
    RateLimited,

    #[error("search API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("invalid search endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Ranked web search. Implemented by `GoogleSearch` for production; mock
/// implementations are used in tests.
pub trait SearchProvider {
    /// Returns up to `num` result URLs in provider-ranked order.
    fn search(
        &self,
        query: &str,
        num: usize,
    ) -> impl Future<Output = Result<Vec<String>, SearchError>> + Send;
}
