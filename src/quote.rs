//! Representative quotes.
//!
//! The most confidently clustered reviews make the best quotes: they are
//! the ones closest to the theme's dense core. Each quote is scrubbed of
//! PII first and only then truncated, so a redaction placeholder can never
//! be half cut and a partially visible email can never survive.

use serde::{Deserialize, Serialize};

use crate::text::truncate_on_word;
use crate::{Review, Scrubber, Theme, ThemeId};

/// Longest quote, in characters, including the `...` marker.
pub const MAX_QUOTE_CHARS: usize = 150;

/// A short, scrubbed excerpt of one review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Scrubbed excerpt, at most [`MAX_QUOTE_CHARS`] characters.
    pub text: String,
    /// Membership probability of the source review.
    pub confidence: f64,
    /// Id of the source review.
    pub source_id: String,
    /// Name of the theme the quote illustrates.
    pub theme: String,
    /// Id of that theme.
    pub theme_id: ThemeId,
}

/// Picks the top quotes for a theme.
#[derive(Clone, Copy)]
pub struct QuoteExtractor<'a> {
    quotes_per_theme: usize,
    scrubber: &'a dyn Scrubber,
}

impl std::fmt::Debug for QuoteExtractor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteExtractor")
            .field("quotes_per_theme", &self.quotes_per_theme)
            .finish_non_exhaustive()
    }
}

impl<'a> QuoteExtractor<'a> {
    /// Create an extractor returning up to `quotes_per_theme` quotes.
    pub fn new(quotes_per_theme: usize, scrubber: &'a dyn Scrubber) -> Self {
        Self {
            quotes_per_theme,
            scrubber,
        }
    }

    /// Extract quotes for `theme` from its members.
    ///
    /// `members` pairs each review with its membership probability. The
    /// result is ordered by probability descending, then review id; reviews
    /// whose text is blank after scrubbing are skipped. Fewer members than
    /// `quotes_per_theme` yields fewer quotes.
    pub fn extract(&self, theme: &Theme, members: &[(&Review, f64)]) -> Vec<Quote> {
        let mut ranked: Vec<&(&Review, f64)> = members.iter().collect();
        ranked.sort_by(|(ra, pa), (rb, pb)| pb.total_cmp(pa).then_with(|| ra.id.cmp(&rb.id)));

        ranked
            .into_iter()
            .filter_map(|(review, confidence)| {
                let scrubbed = self.scrubber.scrub(&review.text);
                let text = truncate_on_word(&scrubbed, MAX_QUOTE_CHARS);
                (!text.is_empty()).then(|| Quote {
                    text,
                    confidence: *confidence,
                    source_id: review.id.clone(),
                    theme: theme.name.clone(),
                    theme_id: theme.id,
                })
            })
            .take(self.quotes_per_theme)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::PatternScrubber;

    fn kyc_theme() -> Theme {
        Theme {
            id: ThemeId::Cluster(0),
            name: "KYC Delays".to_string(),
            description: String::new(),
            size: 3,
            member_review_ids: BTreeSet::new(),
            merged_from: Vec::new(),
        }
    }

    #[test]
    fn test_top_n_by_confidence() {
        let a = Review::new("a", "KYC took forever");
        let b = Review::new("b", "Still waiting on KYC");
        let c = Review::new("c", "KYC rejected twice");
        let scrubber = PatternScrubber::new();
        let quotes = QuoteExtractor::new(2, &scrubber)
            .extract(&kyc_theme(), &[(&c, 0.82), (&a, 0.95), (&b, 0.88)]);

        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].source_id, "a");
        assert_eq!(quotes[0].confidence, 0.95);
        assert_eq!(quotes[1].confidence, 0.88);
        assert_eq!(quotes[0].theme, "KYC Delays");
        assert_eq!(quotes[0].theme_id, ThemeId::Cluster(0));
    }

    #[test]
    fn test_ties_broken_by_id() {
        let x = Review::new("x", "second");
        let w = Review::new("w", "first");
        let scrubber = PatternScrubber::new();
        let quotes = QuoteExtractor::new(3, &scrubber).extract(&kyc_theme(), &[(&x, 1.0), (&w, 1.0)]);
        assert_eq!(quotes[0].source_id, "w");
        assert_eq!(quotes[1].source_id, "x");
    }

    #[test]
    fn test_scrub_before_truncate() {
        let filler = "word ".repeat(25);
        let review = Review::new("p", format!("{filler}reach me at someone.long.name@example.com please"));
        let scrubber = PatternScrubber::new();
        let quotes = QuoteExtractor::new(1, &scrubber).extract(&kyc_theme(), &[(&review, 1.0)]);
        let text = &quotes[0].text;
        assert!(!text.contains('@'), "{text}");
        assert!(text.chars().count() <= MAX_QUOTE_CHARS);
    }

    #[test]
    fn test_long_quote_truncated_on_word() {
        let review = Review::new("l", "withdrawal ".repeat(30));
        let scrubber = PatternScrubber::new();
        let quotes = QuoteExtractor::new(1, &scrubber).extract(&kyc_theme(), &[(&review, 1.0)]);
        let text = &quotes[0].text;
        assert!(text.ends_with("..."));
        assert!(text.chars().count() <= MAX_QUOTE_CHARS);
        assert!(text.trim_end_matches("...").split(' ').all(|w| w == "withdrawal"));
    }

    #[test]
    fn test_blank_and_empty_members() {
        let blank = Review::new("b", "   ");
        let scrubber = PatternScrubber::new();
        let extractor = QuoteExtractor::new(3, &scrubber);
        assert!(extractor.extract(&kyc_theme(), &[(&blank, 1.0)]).is_empty());
        assert!(extractor.extract(&kyc_theme(), &[]).is_empty());
    }
}
