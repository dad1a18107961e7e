use std::collections::HashSet;

use futures::future::join_all;
use tracing::{debug, warn};

use super::SearchProvider;
use crate::config::{ConfigError, PipelineConfig, validate_search_limits};

#[derive(Debug, Clone)]
pub struct ResolveLimits {
    /// URLs accepted per query.
    pub per_query_cap: usize,
    /// Raw results requested per query, over-fetched to leave room for filtering.
    pub results_per_query: usize,
    pub blocked_suffixes: Vec<String>,
}

impl Default for ResolveLimits {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for ResolveLimits {
    fn from(cfg: &PipelineConfig) -> Self {
        Self {
            per_query_cap: cfg.per_query_cap,
            results_per_query: cfg.search_results_per_query,
            blocked_suffixes: cfg.blocked_suffixes.clone(),
        }
    }
}

impl ResolveLimits {
    fn validate(&self) -> Result<(), ConfigError> {
        validate_search_limits(self.per_query_cap, self.results_per_query)
    }

    fn is_blocked(&self, url: &str) -> bool {
        let lower = url.to_ascii_lowercase();
        self.blocked_suffixes
            .iter()
            .any(|suffix| lower.ends_with(&suffix.to_ascii_lowercase()))
    }
}

/// Resolves queries into a globally unique, ordered list of candidate URLs.
///
/// Queries are searched concurrently, but acceptance walks the queries in
/// their given order so a URL is credited to the first query that ranked it.
/// A failing query contributes zero results.
pub async fn resolve(
    queries: &[String],
    search: &impl SearchProvider,
    limits: &ResolveLimits,
) -> Result<Vec<String>, ConfigError> {
    limits.validate()?;

    let outcomes = join_all(
        queries
            .iter()
            .map(|q| search.search(q, limits.results_per_query)),
    )
    .await;

    let mut seen = HashSet::new();
    let mut accepted = Vec::new();

    for (query, outcome) in queries.iter().zip(outcomes) {
        let raw = match outcome {
            Ok(urls) => urls,
            Err(e) => {
                warn!(query = %query, error = %e, "search failed (treating as zero results)");
                continue;
            }
        };

        let mut count = 0;
        for url in raw.into_iter().take(limits.results_per_query) {
            if count >= limits.per_query_cap {
                break;
            }
            if url.is_empty() || limits.is_blocked(&url) || seen.contains(&url) {
                continue;
            }
            seen.insert(url.clone());
            accepted.push(url);
            count += 1;
        }
        debug!(query = %query, accepted = count, "query resolved");
    }

    Ok(accepted)
}
