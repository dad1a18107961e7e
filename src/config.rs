use std::time::Duration;

use serde::Deserialize;

/// Upper bound on raw results requested from a search provider per query.
pub const MAX_RESULTS_PER_QUERY: usize = 10;
/// Upper bound on the context window used around an isolated event date.
pub const MAX_CONTEXT_WORDS_LIMIT: usize = 100;

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:109.0) Gecko/20100101 Firefox/117.0";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("batch_size must be greater than zero")]
    ZeroBatchSize,

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("per_query_cap must be between 1 and {MAX_RESULTS_PER_QUERY}, got {0}")]
    PerQueryCap(usize),

    #[error(
        "search_results_per_query must be between per_query_cap ({cap}) and {MAX_RESULTS_PER_QUERY}, got {got}"
    )]
    ResultsPerQuery { cap: usize, got: usize },

    #[error("similarity_threshold must be within [0, 1], got {0}")]
    Threshold(f32),

    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),

    #[error(
        "max_context_words must be between min_sentence_words ({min}) and {MAX_CONTEXT_WORDS_LIMIT}, got {got}"
    )]
    ContextWords { min: usize, got: usize },

    #[error("{0} must be a positive finite number")]
    Factor(&'static str),
}

/// Every recognized pipeline option, with the defaults the pipeline was tuned on.
///
/// Deserializes from any serde format; absent fields take their default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub batch_size: usize,
    pub fetch_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_redirects: usize,
    pub per_query_cap: usize,
    pub search_results_per_query: usize,
    pub blocked_suffixes: Vec<String>,
    pub similarity_threshold: f32,
    pub min_sentence_words: usize,
    pub max_sentences: usize,
    pub max_text_chars: usize,
    pub max_response_bytes: usize,
    /// Experimental: widen short sentences that mention the question's event
    /// date. Off by default; it produces false positives on date-heavy pages.
    pub extend_event_date_context: bool,
    pub max_context_words: usize,
    pub total_context_tokens: usize,
    pub max_completion_tokens: usize,
    pub safety_factor: f64,
    pub words_per_token: f64,
    pub user_agent: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 15,
            fetch_timeout_secs: 10,
            connect_timeout_secs: 10,
            max_redirects: 5,
            per_query_cap: 3,
            search_results_per_query: MAX_RESULTS_PER_QUERY,
            blocked_suffixes: vec![".pdf".to_string()],
            similarity_threshold: 0.4,
            min_sentence_words: 10,
            max_sentences: 1000,
            max_text_chars: 50_000,
            max_response_bytes: 10_000_000,
            extend_event_date_context: false,
            max_context_words: 50,
            total_context_tokens: 4000,
            max_completion_tokens: 500,
            safety_factor: 1.05,
            words_per_token: 0.75,
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

/// Per-query cap within `1..=10` and over-fetch between the cap and 10.
pub(crate) fn validate_search_limits(
    per_query_cap: usize,
    results_per_query: usize,
) -> Result<(), ConfigError> {
    if per_query_cap == 0 || per_query_cap > MAX_RESULTS_PER_QUERY {
        return Err(ConfigError::PerQueryCap(per_query_cap));
    }
    if results_per_query < per_query_cap || results_per_query > MAX_RESULTS_PER_QUERY {
        return Err(ConfigError::ResultsPerQuery {
            cap: per_query_cap,
            got: results_per_query,
        });
    }
    Ok(())
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("fetch_timeout_secs"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("connect_timeout_secs"));
        }
        validate_search_limits(self.per_query_cap, self.search_results_per_query)?;
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::Threshold(self.similarity_threshold));
        }
        if self.min_sentence_words == 0 {
            return Err(ConfigError::ZeroLimit("min_sentence_words"));
        }
        if self.max_sentences == 0 {
            return Err(ConfigError::ZeroLimit("max_sentences"));
        }
        if self.max_text_chars == 0 {
            return Err(ConfigError::ZeroLimit("max_text_chars"));
        }
        if self.max_response_bytes == 0 {
            return Err(ConfigError::ZeroLimit("max_response_bytes"));
        }
        if self.max_context_words < self.min_sentence_words
            || self.max_context_words > MAX_CONTEXT_WORDS_LIMIT
        {
            return Err(ConfigError::ContextWords {
                min: self.min_sentence_words,
                got: self.max_context_words,
            });
        }
        if !(self.safety_factor.is_finite() && self.safety_factor > 0.0) {
            return Err(ConfigError::Factor("safety_factor"));
        }
        if !(self.words_per_token.is_finite() && self.words_per_token > 0.0) {
            return Err(ConfigError::Factor("words_per_token"));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_batch_size() {
        let cfg = PipelineConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroBatchSize));
    }

    #[test]
    fn rejects_zero_timeout() {
        let cfg = PipelineConfig {
            fetch_timeout_secs: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroTimeout(_))));
    }

    #[test]
    fn rejects_per_query_cap_above_hard_cap() {
        let cfg = PipelineConfig {
            per_query_cap: 11,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::PerQueryCap(11)));
    }

    #[test]
    fn rejects_overfetch_below_cap() {
        let cfg = PipelineConfig {
            per_query_cap: 5,
            search_results_per_query: 4,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ResultsPerQuery { cap: 5, got: 4 })
        ));
    }

    #[test]
    fn rejects_threshold_out_of_range() {
        let cfg = PipelineConfig {
            similarity_threshold: 1.5,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Threshold(_))));
    }

    #[test]
    fn rejects_context_window_outside_bounds() {
        let too_small = PipelineConfig {
            max_context_words: 5,
            ..Default::default()
        };
        assert!(matches!(
            too_small.validate(),
            Err(ConfigError::ContextWords { min: 10, got: 5 })
        ));

        let too_large = PipelineConfig {
            max_context_words: 101,
            ..Default::default()
        };
        assert!(matches!(
            too_large.validate(),
            Err(ConfigError::ContextWords { got: 101, .. })
        ));
    }

    #[test]
    fn rejects_non_positive_factors() {
        let cfg = PipelineConfig {
            safety_factor: 0.0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::Factor("safety_factor")));
    }

    #[test]
    fn deserializes_partial_json_with_defaults() {
        let cfg: PipelineConfig =
            serde_json::from_str(r#"{"batch_size": 4, "per_query_cap": 2}"#).unwrap();
        assert_eq!(cfg.batch_size, 4);
        assert_eq!(cfg.per_query_cap, 2);
        assert_eq!(cfg.search_results_per_query, 10);
        assert_eq!(cfg.blocked_suffixes, vec![".pdf".to_string()]);
        assert!(!cfg.extend_event_date_context);
    }
}
