//! Query planning: turning a yes/no question into search engine queries.

pub mod client;
pub mod types;

pub use client::ChatPlanner;

use serde::Deserialize;

/// Most queries kept from a single plan.
pub const MAX_QUERIES: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("OPENAI_API_KEY not set")]
    ApiKeyNotSet,

    #[error("planner rate limit exceeded")]
    RateLimited,

    #[error("planner API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("planner returned no content")]
    EmptyResponse,

    #[error("planner response is not a query list: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("planner returned no usable queries")]
    NoQueries,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Produces the search queries for a question. A failure here is fatal to
/// the pipeline: no evidence can be gathered without queries.
pub trait QueryPlanner {
    fn plan(
        &self,
        question: &str,
    ) -> impl Future<Output = Result<Vec<String>, PlannerError>> + Send;
}

#[derive(Deserialize)]
struct QueryPlan {
    queries: Vec<String>,
}

/// Parses a `{"queries": [...]}` object, tolerating a surrounding code fence.
pub fn parse_query_plan(raw: &str) -> Result<Vec<String>, PlannerError> {
    let body = strip_code_fence(raw.trim());
    let plan: QueryPlan = serde_json::from_str(body)?;

    let queries: Vec<String> = plan
        .queries
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .take(MAX_QUERIES)
        .collect();

    if queries.is_empty() {
        return Err(PlannerError::NoQueries);
    }
    Ok(queries)
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Pulls the question out of a prompt: the first double-quoted span, or the
/// whole prompt when nothing is quoted.
pub fn extract_question(prompt: &str) -> &str {
    let quoted = prompt.split_once('"').and_then(|(_, rest)| {
        let (inner, _) = rest.split_once('"')?;
        Some(inner)
    });
    match quoted {
        Some(q) if !q.trim().is_empty() => q,
        _ => prompt.trim(),
    }
}
