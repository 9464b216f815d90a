//! PII scrubbing collaborator.
//!
//! Review text is flagged for PII upstream, but anything the pulse quotes
//! back is scrubbed again on the way out. The core only needs the
//! [`Scrubber`] trait; [`PatternScrubber`] is a regex implementation that
//! covers the common cases in store reviews.

use regex::Regex;

/// Detects and redacts personally identifying information.
pub trait Scrubber: Send + Sync {
    /// Return `text` with PII replaced by placeholders.
    fn scrub(&self, text: &str) -> String;

    /// Report whether `text` contains PII and which kinds were found.
    fn detect(&self, text: &str) -> (bool, Vec<String>);
}

/// Regex-based scrubber for emails, phone numbers, and long digit runs.
///
/// ```rust
/// use reviewpulse::{PatternScrubber, Scrubber};
///
/// let scrubber = PatternScrubber::new();
/// let clean = scrubber.scrub("mail me at jane.doe@example.com");
/// assert_eq!(clean, "mail me at [email]");
/// ```
#[derive(Debug, Clone)]
pub struct PatternScrubber {
    rules: Vec<Rule>,
}

#[derive(Debug, Clone)]
struct Rule {
    kind: &'static str,
    pattern: Regex,
    replacement: &'static str,
}

impl PatternScrubber {
    /// Build the default rule set.
    ///
    /// Rules run in order: emails first so their digits are not mistaken for
    /// phone numbers, then phone numbers, then 10+ digit identifiers.
    #[must_use]
    pub fn new() -> Self {
        let rules = [
            ("email", r"[\w.\-]+@[\w.\-]+\.\w+", "[email]"),
            (
                "phone",
                r"(?:\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b",
                "[phone]",
            ),
            ("long_digits", r"\b\d{10,}\b", "[ID]"),
        ]
        .into_iter()
        .filter_map(|(kind, pattern, replacement)| {
            Regex::new(pattern).ok().map(|pattern| Rule {
                kind,
                pattern,
                replacement,
            })
        })
        .collect();

        Self { rules }
    }
}

impl Default for PatternScrubber {
    fn default() -> Self {
        Self::new()
    }
}

impl Scrubber for PatternScrubber {
    fn scrub(&self, text: &str) -> String {
        self.rules.iter().fold(text.to_string(), |acc, rule| {
            rule.pattern.replace_all(&acc, rule.replacement).into_owned()
        })
    }

    fn detect(&self, text: &str) -> (bool, Vec<String>) {
        let kinds: Vec<String> = self
            .rules
            .iter()
            .filter(|rule| rule.pattern.is_match(text))
            .map(|rule| rule.kind.to_string())
            .collect();
        (!kinds.is_empty(), kinds)
    }
}
