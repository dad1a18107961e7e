//! Evidence retrieval and temporal relevance ranking for yes/no questions.
//!
//! A [`Pipeline`] plans search queries for a question, resolves them to
//! candidate URLs, fetches the pages concurrently, extracts dated prose and
//! keeps the sentences most similar to the question. The result is a
//! word-budgeted digest grouped by page date, sized to fit next to the prompt
//! in a downstream estimator's context window.

pub mod budget;
pub mod config;
pub mod digest;
pub mod estimator;
pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod planner;
pub mod relevance;
pub mod search;

pub const USER_AGENT: &str = concat!("evidence-digest/", env!("CARGO_PKG_VERSION"));

pub use budget::{Budget, BudgetParams, HeuristicTokenCounter, TokenCounter};
pub use config::{ConfigError, PipelineConfig};
pub use digest::rank_and_group;
pub use estimator::{Estimator, EstimatorError, Judgment};
pub use extract::{DatedDocument, extract};
pub use fetch::{FetchReport, FetchedDocument, fetch_all, http_client};
pub use pipeline::{Assessment, Evidence, Pipeline, PipelineError};
pub use planner::{ChatPlanner, QueryPlanner, extract_question};
pub use relevance::{
    DateRecognizer, Embedder, HashingEmbedder, RegexDateRecognizer, ScoredSentence,
    extract_event_date,
};
pub use search::{GoogleSearch, SearchProvider, resolve};
