use unicode_segmentation::UnicodeSegmentation;

/// A sentence and its byte span in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Cuts `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// UAX #29 sentence segmentation with surrounding whitespace trimmed off.
pub fn split_sentences(text: &str) -> Vec<Segment<'_>> {
    text.split_sentence_bound_indices()
        .filter_map(|(idx, raw)| {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return None;
            }
            let start = idx + (raw.len() - raw.trim_start().len());
            Some(Segment {
                text: trimmed,
                start,
                end: start + trimmed.len(),
            })
        })
        .collect()
}

/// Appends following sentences to any sentence shorter than `min_words`
/// until it reaches `min_words`. The final run is emitted even when short.
pub fn merge_short(sentences: &[&str], min_words: usize) -> Vec<String> {
    let mut merged = Vec::new();
    let mut iter = sentences.iter();

    while let Some(first) = iter.next() {
        let mut sentence = first.to_string();
        let mut words = word_count(first);
        while words < min_words {
            let Some(next) = iter.next() else {
                break;
            };
            sentence.push(' ');
            sentence.push_str(next);
            words += word_count(next);
        }
        merged.push(sentence);
    }

    merged
}
