//! Ranking scored sentences into a word-budgeted, date-grouped digest.

use std::collections::HashSet;

use tracing::debug;

use crate::relevance::ScoredSentence;
use crate::relevance::segment::word_count;

const SEPARATOR: &str = " | ";

/// Ranks `sentences` by similarity and renders the ones that fit in
/// `max_words` as date groups.
///
/// The sort is stable, so equal scores keep their discovery order. Acceptance
/// stops at the first sentence that would overflow the budget.
///
/// `max_words` bounds the rendered digest, not just the sentence text: the
/// first sentence of a date group is also charged the label's words, and each
/// later one a word for its `|` separator. A digest therefore holds fewer
/// sentence words than `max_words`, and its whitespace word count never
/// exceeds it.
///
/// Accepted sentences are regrouped by ascending date label, each group
/// rendered as `- {label}:{s1 | s2 | ...}` followed by a blank line.
pub fn rank_and_group(mut sentences: Vec<ScoredSentence>, max_words: usize) -> String {
    sentences.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

    let mut labels = HashSet::new();
    let mut used = 0;
    let mut accepted = Vec::new();

    for sentence in sentences {
        // "- (a, b):First" renders as label words plus the sentence's own;
        // joining onto an existing group costs one "|".
        let overhead = if labels.contains(&sentence.date_label) {
            1
        } else {
            word_count(&sentence.date_label).max(1)
        };
        let cost = word_count(&sentence.text) + overhead;
        if used + cost > max_words {
            break;
        }
        used += cost;
        labels.insert(sentence.date_label.clone());
        accepted.push(sentence);
    }

    accepted.sort_by(|a, b| a.date_label.cmp(&b.date_label));

    let mut output = String::new();
    for group in accepted.chunk_by(|a, b| a.date_label == b.date_label) {
        let joined = group
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(SEPARATOR);
        output.push_str(&format!("- {}:{}\n\n", group[0].date_label, joined));
    }

    debug!(words = used, sentences = accepted.len(), "digest assembled");
    output
}
