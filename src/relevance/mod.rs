//! Sentence-level relevance scoring of a dated document against the question.

pub mod embed;
pub mod segment;
pub mod temporal;

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{debug, warn};

pub use embed::{EmbedError, Embedder, HashingEmbedder};
pub use temporal::{DateRecognizer, RegexDateRecognizer, extract_event_date};

use crate::config::PipelineConfig;
use crate::extract::DatedDocument;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSentence {
    pub text: String,
    pub similarity: f32,
    pub date_label: String,
}

#[derive(Debug, Clone)]
pub struct ScoreOptions {
    /// Sentences must score strictly above this.
    pub similarity_threshold: f32,
    pub min_sentence_words: usize,
    pub max_sentences: usize,
    pub max_text_chars: usize,
    pub extend_event_date_context: bool,
    pub max_context_words: usize,
}

impl From<&PipelineConfig> for ScoreOptions {
    fn from(cfg: &PipelineConfig) -> Self {
        Self {
            similarity_threshold: cfg.similarity_threshold,
            min_sentence_words: cfg.min_sentence_words,
            max_sentences: cfg.max_sentences,
            max_text_chars: cfg.max_text_chars,
            extend_event_date_context: cfg.extend_event_date_context,
            max_context_words: cfg.max_context_words,
        }
    }
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

pub struct Scorer<'a, E, R> {
    embedder: &'a E,
    recognizer: &'a R,
    opts: ScoreOptions,
}

impl<'a, E: Embedder, R: DateRecognizer> Scorer<'a, E, R> {
    pub fn new(embedder: &'a E, recognizer: &'a R, opts: ScoreOptions) -> Self {
        Self {
            embedder,
            recognizer,
            opts,
        }
    }

    /// Sentences of `doc` scoring above the threshold, in document order.
    pub fn score(
        &self,
        doc: &DatedDocument,
        query_embedding: &[f32],
        event_date: Option<NaiveDate>,
    ) -> Vec<ScoredSentence> {
        let candidates = self.candidate_sentences(&doc.clean_text, event_date);
        let date_label = doc.date_label();

        let mut kept = Vec::new();
        for sentence in candidates {
            let embedding = match self.embedder.embed(&sentence) {
                Ok(e) => e,
                Err(e) => {
                    debug!(error = %e, "skipping sentence that failed to embed");
                    continue;
                }
            };
            let similarity = self.embedder.similarity(query_embedding, &embedding);
            if similarity > self.opts.similarity_threshold {
                kept.push(ScoredSentence {
                    text: sentence,
                    similarity,
                    date_label: date_label.clone(),
                });
            }
        }

        debug!(url = %doc.url, kept = kept.len(), "document scored");
        kept
    }

    /// Segmented, merged, deduplicated and capped sentences, before scoring.
    pub fn candidate_sentences(&self, text: &str, event_date: Option<NaiveDate>) -> Vec<String> {
        let text = segment::truncate_chars(text, self.opts.max_text_chars);
        let segments = segment::split_sentences(text);
        let raw: Vec<&str> = segments.iter().map(|s| s.text).collect();

        let mut sentences = segment::merge_short(&raw, self.opts.min_sentence_words);

        if self.opts.extend_event_date_context
            && let Some(event_date) = event_date
        {
            match temporal::extend_event_date_context(
                text,
                &segments,
                event_date,
                self.recognizer,
                self.opts.min_sentence_words,
                self.opts.max_context_words,
            ) {
                Ok(contexts) => sentences.extend(contexts),
                Err(e) => warn!(error = %e, "event-date context extension skipped"),
            }
        }

        let mut seen = HashSet::new();
        sentences.retain(|s| seen.insert(s.clone()));
        sentences.truncate(self.opts.max_sentences);
        sentences
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEmbedder;

    // Similarity is encoded in the sentence: "Score:NN ..." embeds to NN/100.
    impl Embedder for FixedEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
            if text == "QUERY" {
                return Ok(vec![1.0]);
            }
            let score = text
                .strip_prefix("Score:")
                .and_then(|rest| rest.split_whitespace().next())
                .and_then(|n| n.parse::<f32>().ok())
                .ok_or(EmbedError::Backend("unscored".into()))?;
            Ok(vec![score / 100.0])
        }

        fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
            a[0] * b[0]
        }
    }

    fn doc(text: &str) -> DatedDocument {
        DatedDocument {
            url: "https://example.com".into(),
            release_date: "2024-01-01".into(),
            modified_date: "unknown".into(),
            clean_text: text.into(),
        }
    }

    fn long(score: u32, tail: &str) -> String {
        format!("Score:{score} one two three four five six seven eight nine {tail}.")
    }

    fn opts() -> ScoreOptions {
        ScoreOptions::default()
    }

    #[test]
    fn keeps_only_sentences_strictly_above_threshold() {
        let text = [long(90, "a"), long(40, "b"), long(41, "c"), long(10, "d")].join(" ");
        let scorer = Scorer::new(&FixedEmbedder, &RegexDateRecognizer, opts());
        let query = FixedEmbedder.embed("QUERY").unwrap();

        let kept = scorer.score(&doc(&text), &query, None);

        let scores: Vec<f32> = kept.iter().map(|s| s.similarity).collect();
        assert_eq!(kept.len(), 2);
        assert!(scores.iter().all(|s| *s > 0.4));
        assert!(kept.iter().all(|s| s.date_label == "(2024-01-01, unknown)"));
    }

    #[test]
    fn deduplicates_exact_sentences() {
        let text = [long(90, "same"), long(90, "same"), long(80, "other")].join(" ");
        let scorer = Scorer::new(&FixedEmbedder, &RegexDateRecognizer, opts());

        let candidates = scorer.candidate_sentences(&text, None);

        assert_eq!(candidates.len(), 2);
        assert_ne!(candidates[0], candidates[1]);
    }

    #[test]
    fn caps_sentence_count_preserving_order() {
        let text = (0..20).map(|i| long(50, &i.to_string())).collect::<Vec<_>>().join(" ");
        let scorer = Scorer::new(
            &FixedEmbedder,
            &RegexDateRecognizer,
            ScoreOptions {
                max_sentences: 5,
                ..opts()
            },
        );

        let candidates = scorer.candidate_sentences(&text, None);

        assert_eq!(candidates.len(), 5);
        assert!(candidates[0].ends_with("nine 0."));
        assert!(candidates[4].ends_with("nine 4."));
    }

    #[test]
    fn truncates_text_before_segmentation() {
        let text = [long(90, "first"), long(90, "second")].join(" ");
        let cut = long(90, "first").chars().count();
        let scorer = Scorer::new(
            &FixedEmbedder,
            &RegexDateRecognizer,
            ScoreOptions {
                max_text_chars: cut,
                ..opts()
            },
        );

        assert_eq!(scorer.candidate_sentences(&text, None), vec![long(90, "first")]);
    }

    #[test]
    fn short_fragments_are_merged_before_scoring() {
        let text = "Vote set. Count soon. Polls close late. Results due after midnight tonight.";
        let scorer = Scorer::new(&FixedEmbedder, &RegexDateRecognizer, opts());

        let candidates = scorer.candidate_sentences(text, None);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0], text);
    }

    #[test]
    fn event_date_context_is_opt_in() {
        let text = "The agency reviewed the merger filing over several long months of hearings. \
                    Filed Jan 4. Regulators then asked both companies for more documents.";
        let event = NaiveDate::from_ymd_opt(2025, 1, 4);

        let disabled = Scorer::new(&FixedEmbedder, &RegexDateRecognizer, opts());
        let enabled = Scorer::new(
            &FixedEmbedder,
            &RegexDateRecognizer,
            ScoreOptions {
                extend_event_date_context: true,
                max_context_words: 20,
                ..opts()
            },
        );

        let without = disabled.candidate_sentences(text, event);
        let with = enabled.candidate_sentences(text, event);

        assert_eq!(with.len(), without.len() + 1);
        assert_eq!(with.last().map(String::as_str), Some(text));
    }
}
