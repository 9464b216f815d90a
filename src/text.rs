//! Word, sentence, and keyword helpers shared by every stage.
//!
//! ## Words
//!
//! A word is a maximal run of non-whitespace, exactly what
//! [`str::split_whitespace`] yields. The pulse budget counts words this way,
//! so "Pulse – Acme" is three words (the dash counts).
//!
//! ## Sentences
//!
//! A sentence ends at a run of `.`, `!` or `?` (plus any closing quotes or
//! brackets) that is followed by whitespace or the end of the text. What
//! comes next does not matter, so a sentence may start with a digit or a
//! lowercase letter:
//!
//! ```text
//! "Users are frustrated. 40% mention withdrawals. rest is noise"
//!  └───────────────────┘ └───────────────────────┘ └───────────┘
//!       sentence 1              sentence 2          sentence 3
//! ```
//!
//! A terminator inside a token ("4.5 stars", "v2.1") is not a boundary.
//!
//! ## Truncation
//!
//! Quotes are cut to a character limit without splitting a word, and the
//! `...` marker counts against the limit:
//!
//! ```text
//! limit = 20
//! "The upload keeps failing on Android"
//! "The upload keeps..."            <- 19 chars, "failing" not split
//! ```

use std::collections::HashMap;

use unicode_segmentation::UnicodeSegmentation;

use crate::WordBudget;

/// Marker appended to truncated text.
pub const ELLIPSIS: &str = "...";

/// Words ignored by keyword extraction.
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "is", "are", "was",
    "were", "be", "been", "being", "have", "has", "had", "do", "does", "did", "will", "would",
    "should", "could", "may", "might", "must", "can", "this", "that", "these", "those", "i",
    "you", "he", "she", "it", "we", "they", "what", "which", "who", "when", "where", "why", "how",
    "not", "very", "just", "even", "about", "into", "through", "during", "before", "after",
    "above", "below", "from", "up", "down", "out", "off", "over", "under", "again", "further",
    "then", "once", "with", "there", "their", "them", "than", "also", "only", "some", "such",
    "your", "my", "our", "its", "dont", "cant", "really", "still", "every", "much", "more",
    "most", "other", "same", "been", "here", "because", "while", "each", "both", "since",
];

/// Count whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Closing punctuation that stays with the sentence it ends.
const CLOSERS: &[char] = &['"', '\'', ')', ']', '\u{201D}', '\u{2019}'];

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Split text into trimmed, non-empty sentences.
pub fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !is_terminator(c) {
            continue;
        }
        let mut end = i + c.len_utf8();
        while let Some(&(j, next)) = chars.peek() {
            if !(is_terminator(next) || CLOSERS.contains(&next)) {
                break;
            }
            end = j + next.len_utf8();
            chars.next();
        }
        if chars.peek().map_or(true, |(_, next)| next.is_whitespace()) {
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                out.push(sentence);
            }
            start = end;
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

/// The first sentence of `text`, trimmed. Empty input yields `""`.
pub fn first_sentence(text: &str) -> &str {
    sentences(text).first().copied().unwrap_or("")
}

/// Truncate to at most `max_chars` characters without cutting a word.
///
/// When truncation happens the result ends with [`ELLIPSIS`], which is
/// included in the `max_chars` limit. A single word longer than the limit
/// is cut mid-word, since there is no boundary to retreat to.
pub fn truncate_on_word(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let budget = max_chars.saturating_sub(ELLIPSIS.len());
    // Byte offset of the first char past the budget; always a char boundary.
    let cut = text.char_indices().nth(budget).map_or(text.len(), |(i, _)| i);
    let head = &text[..cut];

    let at_boundary = text[cut..].chars().next().is_some_and(char::is_whitespace);
    let head = if at_boundary {
        head
    } else {
        head.rfind(char::is_whitespace).map_or(head, |i| &head[..i])
    };

    format!("{}{ELLIPSIS}", head.trim_end())
}

/// Clamp text to at most `max_words` words.
///
/// Whole sentences are kept while they fit. If even the first sentence is
/// too long, the text is hard-cut at `max_words` words.
pub fn clamp_words(text: &str, max_words: usize) -> String {
    let text = text.trim();
    let budget = WordBudget::new(max_words);
    if budget.allows(word_count(text)) {
        return text.to_string();
    }

    let mut kept = String::new();
    let mut used = 0;
    for sentence in sentences(text) {
        let n = word_count(sentence);
        if budget.would_overflow(used, n) {
            break;
        }
        if !kept.is_empty() {
            kept.push(' ');
        }
        kept.push_str(sentence);
        used += n;
    }

    if kept.is_empty() {
        text.split_whitespace()
            .take(max_words)
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        kept
    }
}

/// Most frequent content words across `texts`, lowercased.
///
/// Stopwords, numbers, and words of three characters or fewer are skipped.
/// Ties are broken by first appearance, so the result is deterministic.
pub fn keywords<'a>(texts: impl IntoIterator<Item = &'a str>, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let mut seen = 0usize;

    for text in texts {
        for word in text.unicode_words() {
            let word = word.to_lowercase();
            if word.chars().count() <= 3
                || word.chars().all(|c| c.is_numeric())
                || STOPWORDS.contains(&word.as_str())
            {
                continue;
            }
            let entry = counts.entry(word).or_insert((0, seen));
            entry.0 += 1;
            seen += 1;
        }
    }

    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|(_, (ca, fa)), (_, (cb, fb))| cb.cmp(ca).then(fa.cmp(fb)));
    ranked.into_iter().take(limit).map(|(w, _)| w).collect()
}

/// Uppercase the first character of a word.
pub fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count() {
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("  one  two\nthree "), 3);
        assert_eq!(word_count("Weekly Product Pulse – Acme"), 5);
    }

    #[test]
    fn test_first_sentence() {
        assert_eq!(first_sentence("Hello world. How are you?"), "Hello world.");
        assert_eq!(first_sentence("   "), "");
        assert_eq!(first_sentence("No terminator"), "No terminator");
    }

    #[test]
    fn test_sentence_after_digit_or_lowercase() {
        assert_eq!(
            first_sentence("Users are frustrated. 40% of reviews mention stuck withdrawals."),
            "Users are frustrated."
        );
        assert_eq!(first_sentence("word word. word word."), "word word.");
        assert_eq!(
            sentences("Negative sentiment dominates. 12 users say so. and more"),
            vec!["Negative sentiment dominates.", "12 users say so.", "and more"]
        );
    }

    #[test]
    fn test_sentence_terminator_inside_token() {
        assert_eq!(sentences("Rated 4.5 stars by v2.1 users!"), vec!["Rated 4.5 stars by v2.1 users!"]);
        assert_eq!(
            sentences("He said \"stop.\" Then left... Why?!"),
            vec!["He said \"stop.\"", "Then left...", "Why?!"]
        );
    }

    #[test]
    fn test_clamp_digit_led_sentences() {
        let text = "Withdrawals are stuck. 30 users cite bank delays. 12 mention support.";
        assert_eq!(clamp_words(text, 8), "Withdrawals are stuck. 30 users cite bank delays.");
    }

    #[test]
    fn test_truncate_short_text_untouched() {
        assert_eq!(truncate_on_word("  short  ", 150), "short");
    }

    #[test]
    fn test_truncate_respects_word_boundary() {
        let out = truncate_on_word("The upload keeps failing on Android", 20);
        assert_eq!(out, "The upload keeps...");
        assert!(out.chars().count() <= 20);
    }

    #[test]
    fn test_truncate_cut_on_space() {
        // budget of 7 chars ends exactly before a space
        let out = truncate_on_word("abcdefg hijk", 10);
        assert_eq!(out, "abcdefg...");
    }

    #[test]
    fn test_truncate_single_long_word() {
        let out = truncate_on_word(&"x".repeat(200), 150);
        assert_eq!(out.chars().count(), 150);
        assert!(out.ends_with(ELLIPSIS));
    }

    #[test]
    fn test_truncate_multibyte() {
        let text = "日本語 ".repeat(60);
        let out = truncate_on_word(&text, 150);
        assert!(out.chars().count() <= 150);
        assert!(out.ends_with("日本語..."));
    }

    #[test]
    fn test_clamp_keeps_whole_sentences() {
        let text = "One two three. Four five six. Seven eight nine.";
        assert_eq!(clamp_words(text, 7), "One two three. Four five six.");
    }

    #[test]
    fn test_clamp_hard_cut() {
        let text = "a b c d e f g h";
        assert_eq!(clamp_words(text, 3), "a b c");
    }

    #[test]
    fn test_clamp_under_limit() {
        assert_eq!(clamp_words(" fits fine ", 5), "fits fine");
    }

    #[test]
    fn test_keywords_frequency_and_ties() {
        let texts = [
            "Verification takes forever, verification stuck",
            "Withdrawal pending and verification slow",
            "withdrawal delayed",
        ];
        let top = keywords(texts, 2);
        assert_eq!(top, vec!["verification", "withdrawal"]);
    }

    #[test]
    fn test_keywords_skip_stopwords_and_numbers() {
        let top = keywords(["this that 12345 about would"], 3);
        assert!(top.is_empty());
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("login"), "Login");
        assert_eq!(title_case(""), "");
    }
}
