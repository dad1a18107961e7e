//! Date recognition and the experimental event-date context extender.

use std::fmt;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::{Captures, Regex};
use tracing::debug;

use super::segment::{Segment, word_count};
use crate::config::MAX_CONTEXT_WORDS_LIMIT;

const MONTH: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").expect("valid ISO date regex"));

static MONTH_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b{MONTH}\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?(?:,?\s+(\d{{4}}))?\b"
    ))
    .expect("valid month-first date regex")
});

static DAY_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?{MONTH}\.?(?:,?\s+(\d{{4}}))?\b"
    ))
    .expect("valid day-first date regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizedDate {
    Full(NaiveDate),
    MonthDay { month: u32, day: u32 },
}

impl NormalizedDate {
    /// Exact day match, or month-day match when the mention carries no year.
    pub fn matches(&self, event: NaiveDate) -> bool {
        match *self {
            NormalizedDate::Full(date) => date == event,
            NormalizedDate::MonthDay { month, day } => {
                month == event.month() && day == event.day()
            }
        }
    }
}

impl fmt::Display for NormalizedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizedDate::Full(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            NormalizedDate::MonthDay { month, day } => write!(f, "{month:02}-{day:02}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateMention {
    pub start: usize,
    pub end: usize,
    pub date: NormalizedDate,
}

/// Finds date mentions in text. Kept separate from the embedder so either
/// capability can be swapped on its own.
pub trait DateRecognizer {
    /// Mentions ordered by position, non-overlapping.
    fn find_dates(&self, text: &str) -> Vec<DateMention>;
}

/// Recognizes ISO dates and English month-name dates ("Jan 4", "4 January
/// 2025", "January 4th, 2025").
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexDateRecognizer;

impl DateRecognizer for RegexDateRecognizer {
    fn find_dates(&self, text: &str) -> Vec<DateMention> {
        let mut found: Vec<DateMention> = Vec::new();

        for caps in ISO_DATE.captures_iter(text) {
            let date = full_date(num(&caps, 1), num(&caps, 2), num(&caps, 3));
            push_mention(&mut found, &caps, date);
        }
        for caps in MONTH_FIRST.captures_iter(text) {
            let date = named_date(caps.get(3).map(|m| m.as_str()), &caps[1], num(&caps, 2));
            push_mention(&mut found, &caps, date);
        }
        for caps in DAY_FIRST.captures_iter(text) {
            let date = named_date(caps.get(3).map(|m| m.as_str()), &caps[2], num(&caps, 1));
            push_mention(&mut found, &caps, date);
        }

        found.sort_by_key(|m| (m.start, std::cmp::Reverse(m.end)));
        let mut mentions: Vec<DateMention> = Vec::with_capacity(found.len());
        for mention in found {
            if mentions.last().is_none_or(|prev| mention.start >= prev.end) {
                mentions.push(mention);
            }
        }
        mentions
    }
}

fn push_mention(found: &mut Vec<DateMention>, caps: &Captures<'_>, date: Option<NormalizedDate>) {
    if let (Some(date), Some(m)) = (date, caps.get(0)) {
        found.push(DateMention {
            start: m.start(),
            end: m.end(),
            date,
        });
    }
}

fn num(caps: &Captures<'_>, group: usize) -> u32 {
    caps.get(group)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

fn full_date(year: u32, month: u32, day: u32) -> Option<NormalizedDate> {
    let year = i32::try_from(year).ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(NormalizedDate::Full)
}

fn named_date(year: Option<&str>, month_name: &str, day: u32) -> Option<NormalizedDate> {
    let month = month_number(month_name)?;
    match year.and_then(|y| y.parse::<u32>().ok()) {
        Some(year) => full_date(year, month, day),
        // Validate against a leap year so Feb 29 survives.
        None => NaiveDate::from_ymd_opt(2000, month, day)
            .map(|_| NormalizedDate::MonthDay { month, day }),
    }
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_ascii_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// The question's event date: its last date mention, when that mention is a
/// full year-month-day date.
pub fn extract_event_date(question: &str, recognizer: &impl DateRecognizer) -> Option<NaiveDate> {
    match recognizer.find_dates(question).last().map(|m| m.date) {
        Some(NormalizedDate::Full(date)) => Some(date),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DateContextError {
    #[error("max_context_words ({max}) must be at least min_sentence_words ({min})")]
    BelowThreshold { max: usize, min: usize },

    #[error("max_context_words ({0}) must not exceed {MAX_CONTEXT_WORDS_LIMIT}")]
    AboveLimit(usize),
}

/// Widens short sentences that mention `event_date`.
///
/// For each mention matching the event date whose enclosing sentence has
/// fewer than `min_words` words, neighbouring sentences are added one at a
/// time, before then after, until `max_context` words are reached or the
/// text runs out. Returns the widened spans of `text`.
pub fn extend_event_date_context(
    text: &str,
    sentences: &[Segment<'_>],
    event_date: NaiveDate,
    recognizer: &impl DateRecognizer,
    min_words: usize,
    max_context: usize,
) -> Result<Vec<String>, DateContextError> {
    if max_context < min_words {
        return Err(DateContextError::BelowThreshold {
            max: max_context,
            min: min_words,
        });
    }
    if max_context > MAX_CONTEXT_WORDS_LIMIT {
        return Err(DateContextError::AboveLimit(max_context));
    }

    let counts: Vec<usize> = sentences.iter().map(|s| word_count(s.text)).collect();
    let mut contexts = Vec::new();

    for mention in recognizer.find_dates(text) {
        if !mention.date.matches(event_date) {
            continue;
        }
        // "Jan. 4, 2025" is split after the abbreviation, so a mention may
        // span several sentences.
        let Some(index) = sentences
            .iter()
            .position(|s| s.start <= mention.start && mention.start < s.end)
        else {
            debug!(date = %mention.date, "date mention outside any sentence");
            continue;
        };
        let mut last = index;
        while sentences[last].end < mention.end && last + 1 < sentences.len() {
            last += 1;
        }

        let mut first = index;
        let mut words: usize = counts[first..=last].iter().sum();
        if words >= min_words {
            continue;
        }

        while words < max_context {
            if first > 0 {
                first -= 1;
                words += counts[first];
            }
            if words >= max_context {
                break;
            }
            if last + 1 < sentences.len() {
                last += 1;
                words += counts[last];
            }
            if words >= max_context || (first == 0 && last + 1 == sentences.len()) {
                break;
            }
        }

        debug!(date = %mention.date, words, "extended event-date context");
        contexts.push(text[sentences[first].start..sentences[last].end].to_string());
    }

    Ok(contexts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relevance::segment::split_sentences;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dates(text: &str) -> Vec<String> {
        RegexDateRecognizer
            .find_dates(text)
            .iter()
            .map(|m| m.date.to_string())
            .collect()
    }

    #[test]
    fn recognizes_common_formats() {
        assert_eq!(dates("due 2024-01-05 at noon"), vec!["2024-01-05"]);
        assert_eq!(dates("by January 5, 2024."), vec!["2024-01-05"]);
        assert_eq!(dates("on 5th of Jan 2024"), vec!["2024-01-05"]);
        assert_eq!(dates("Filed Jan 4."), vec!["01-04"]);
        assert_eq!(dates("sept 30th"), vec!["09-30"]);
    }

    #[test]
    fn rejects_impossible_dates() {
        assert!(dates("Feb 30, 2024").is_empty());
        assert!(dates("2024-13-01").is_empty());
        assert_eq!(dates("Feb 29"), vec!["02-29"]);
    }

    #[test]
    fn overlapping_matches_keep_the_longest() {
        let mentions = RegexDateRecognizer.find_dates("March 3, 2025 and 4 May");
        assert_eq!(mentions.len(), 2);
        assert_eq!(mentions[0].date, NormalizedDate::Full(ymd(2025, 3, 3)));
        assert_eq!(mentions[1].date, NormalizedDate::MonthDay { month: 5, day: 4 });
    }

    #[test]
    fn event_date_is_last_full_date_mention() {
        let q = "Will the bill signed on 2024-01-02 take effect by June 30, 2024?";
        assert_eq!(extract_event_date(q, &RegexDateRecognizer), Some(ymd(2024, 6, 30)));
        assert_eq!(extract_event_date("Will it happen by June 30?", &RegexDateRecognizer), None);
        assert_eq!(extract_event_date("Will it happen soon?", &RegexDateRecognizer), None);
    }

    #[test]
    fn month_day_mentions_match_event_date() {
        let event = ymd(2025, 1, 4);
        assert!(NormalizedDate::MonthDay { month: 1, day: 4 }.matches(event));
        assert!(NormalizedDate::Full(event).matches(event));
        assert!(!NormalizedDate::Full(ymd(2024, 1, 4)).matches(event));
    }

    #[test]
    fn short_date_sentence_is_widened_to_max_context() {
        let text = "The agency reviewed the merger filing over several long months of hearings. \
                    Filed Jan 4. \
                    Regulators then asked both companies for additional documents about pricing.";
        let sentences = split_sentences(text);

        let contexts =
            extend_event_date_context(text, &sentences, ymd(2025, 1, 4), &RegexDateRecognizer, 10, 20)
                .unwrap();

        assert_eq!(contexts.len(), 1);
        assert!(contexts[0].starts_with("The agency reviewed"));
        assert!(contexts[0].contains("Filed Jan 4."));
        assert!(contexts[0].ends_with("about pricing."));
        assert!(word_count(&contexts[0]) >= 20);
    }

    #[test]
    fn abbreviated_month_spanning_two_sentences_is_widened() {
        let text = "The agency reviewed the merger filing over several long months of hearings. \
                    Filed Jan. 4, 2025. \
                    Regulators then asked both companies for additional documents about pricing.";
        let sentences = split_sentences(text);
        assert!(sentences.iter().any(|s| s.text == "Filed Jan."));

        let contexts =
            extend_event_date_context(text, &sentences, ymd(2025, 1, 4), &RegexDateRecognizer, 10, 20)
                .unwrap();

        assert_eq!(contexts.len(), 1);
        assert!(contexts[0].contains("Filed Jan. 4, 2025."));
        assert!(contexts[0].starts_with("The agency reviewed"));
        assert!(contexts[0].ends_with("about pricing."));
    }

    #[test]
    fn stops_when_text_runs_out() {
        let text = "Filed Jan 4. Nothing else.";
        let sentences = split_sentences(text);

        let contexts =
            extend_event_date_context(text, &sentences, ymd(2025, 1, 4), &RegexDateRecognizer, 10, 50)
                .unwrap();

        assert_eq!(contexts, vec!["Filed Jan 4. Nothing else."]);
    }

    #[test]
    fn long_or_unrelated_sentences_are_not_extended() {
        let text = "On Jan 4 the committee met for a long session to debate the proposal. Filed Jan 5.";
        let sentences = split_sentences(text);

        let contexts =
            extend_event_date_context(text, &sentences, ymd(2025, 1, 4), &RegexDateRecognizer, 10, 50)
                .unwrap();

        assert!(contexts.is_empty());
    }

    #[test]
    fn rejects_context_bounds() {
        let err = extend_event_date_context("", &[], ymd(2025, 1, 4), &RegexDateRecognizer, 10, 5)
            .unwrap_err();
        assert_eq!(err, DateContextError::BelowThreshold { max: 5, min: 10 });

        let err = extend_event_date_context("", &[], ymd(2025, 1, 4), &RegexDateRecognizer, 10, 101)
            .unwrap_err();
        assert_eq!(err, DateContextError::AboveLimit(101));
    }
}
