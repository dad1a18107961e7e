//! Evidence budget derived from the estimator's fixed context window.

use unicode_segmentation::UnicodeSegmentation;

use crate::config::PipelineConfig;

/// Counts and truncates text in model tokens.
pub trait TokenCounter {
    fn count(&self, text: &str) -> usize;

    /// Longest prefix of `text` holding at most `max_tokens` tokens.
    fn truncate<'a>(&self, text: &'a str, max_tokens: usize) -> &'a str;
}

/// Word-boundary approximation of a subword tokenizer: every non-whitespace
/// UAX #29 word segment (words, numbers, punctuation) is one token.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenCounter;

impl HeuristicTokenCounter {
    fn tokens(text: &str) -> impl Iterator<Item = (usize, &str)> {
        text.split_word_bound_indices()
            .filter(|(_, w)| !w.trim().is_empty())
    }
}

impl TokenCounter for HeuristicTokenCounter {
    fn count(&self, text: &str) -> usize {
        Self::tokens(text).count()
    }

    fn truncate<'a>(&self, text: &'a str, max_tokens: usize) -> &'a str {
        match Self::tokens(text).nth(max_tokens) {
            Some((idx, _)) => text[..idx].trim_end(),
            None => text,
        }
    }
}

#[cfg(feature = "hf-tokenizers")]
impl TokenCounter for tokenizers::Tokenizer {
    fn count(&self, text: &str) -> usize {
        match self.encode(text, false) {
            Ok(encoding) => encoding.get_ids().len(),
            Err(e) => {
                tracing::warn!(error = %e, "tokenizer failed, falling back to heuristic count");
                HeuristicTokenCounter.count(text)
            }
        }
    }

    fn truncate<'a>(&self, text: &'a str, max_tokens: usize) -> &'a str {
        let encoding = match self.encode(text, false) {
            Ok(encoding) => encoding,
            Err(e) => {
                tracing::warn!(error = %e, "tokenizer failed, falling back to heuristic truncation");
                return HeuristicTokenCounter.truncate(text, max_tokens);
            }
        };
        match encoding.get_offsets().get(max_tokens) {
            Some(&(start, _)) if text.is_char_boundary(start) => text[..start].trim_end(),
            Some(_) => HeuristicTokenCounter.truncate(text, max_tokens),
            None => text,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BudgetParams {
    pub total_context_tokens: usize,
    pub max_completion_tokens: usize,
    pub safety_factor: f64,
    pub words_per_token: f64,
}

impl From<&PipelineConfig> for BudgetParams {
    fn from(cfg: &PipelineConfig) -> Self {
        Self {
            total_context_tokens: cfg.total_context_tokens,
            max_completion_tokens: cfg.max_completion_tokens,
            safety_factor: cfg.safety_factor,
            words_per_token: cfg.words_per_token,
        }
    }
}

impl Default for BudgetParams {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

/// Room left for evidence. Both figures may be zero or negative when the
/// prompt alone fills the context window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub max_evidence_tokens: i64,
    pub max_words: i64,
}

impl Budget {
    pub fn has_room(&self) -> bool {
        self.max_words > 0 && self.max_evidence_tokens > 0
    }

    /// Word budget as a digest limit; zero when there is no room.
    pub fn word_limit(&self) -> usize {
        usize::try_from(self.max_words).unwrap_or(0)
    }

    pub fn token_limit(&self) -> usize {
        usize::try_from(self.max_evidence_tokens).unwrap_or(0)
    }
}

/// Budget for a question rendered into `prompt_template`, counted with `tokens`.
pub fn budget(
    params: &BudgetParams,
    question: &str,
    prompt_template: &str,
    tokens: &impl TokenCounter,
) -> Budget {
    let prompt_tokens = tokens.count(question) + tokens.count(prompt_template);
    budget_from_prompt_tokens(params, prompt_tokens)
}

/// `total - safety * (prompt + completion)` tokens, then `tokens * words_per_token`
/// words. Both are truncated toward zero.
pub fn budget_from_prompt_tokens(params: &BudgetParams, prompt_tokens: usize) -> Budget {
    let reserved = (prompt_tokens + params.max_completion_tokens) as f64;
    let max_evidence_tokens =
        (params.total_context_tokens as f64 - params.safety_factor * reserved) as i64;
    let max_words = (max_evidence_tokens as f64 * params.words_per_token) as i64;

    Budget {
        max_evidence_tokens,
        max_words,
    }
}
