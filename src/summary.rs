//! Theme summaries.
//!
//! One or two sentences per theme, from the model when it answers and from
//! a rating-based template when it does not. Both paths are clamped to
//! [`MAX_SUMMARY_WORDS`].

use std::time::Duration;

use crate::generate::call_with_deadline;
use crate::text::{clamp_words, truncate_on_word};
use crate::{Generated, Generator, Review, Scrubber, Sentiment, Theme};

/// Longest summary, in words.
pub const MAX_SUMMARY_WORDS: usize = 50;

/// Sample reviews shown to the model.
const MAX_SAMPLES: usize = 5;

/// Characters of each sample shown to the model.
const MAX_SAMPLE_CHARS: usize = 300;

/// Summarizes themes.
#[derive(Clone, Copy)]
pub struct ThemeSummarizer<'a> {
    generator: &'a dyn Generator,
    scrubber: &'a dyn Scrubber,
    timeout: Duration,
}

impl std::fmt::Debug for ThemeSummarizer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeSummarizer")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<'a> ThemeSummarizer<'a> {
    /// Create a summarizer. Samples are scrubbed with `scrubber` before
    /// they reach the model.
    pub fn new(generator: &'a dyn Generator, scrubber: &'a dyn Scrubber, timeout: Duration) -> Self {
        Self {
            generator,
            scrubber,
            timeout,
        }
    }

    /// Summarize `theme` in at most [`MAX_SUMMARY_WORDS`] words.
    ///
    /// `samples` should be the theme's most representative reviews first;
    /// only the first five are used.
    pub fn summarize(&self, theme: &Theme, samples: &[&Review]) -> Generated<String> {
        let samples = &samples[..samples.len().min(MAX_SAMPLES)];
        let prompt = self.build_prompt(theme, samples);

        match call_with_deadline(self.generator, &prompt, self.timeout) {
            Ok(text) => {
                let text = text.trim_matches('"');
                Generated::model(clamp_words(text, MAX_SUMMARY_WORDS))
            }
            Err(e) => Generated::fallback(
                clamp_words(&fallback_summary(theme, samples), MAX_SUMMARY_WORDS),
                e.to_string(),
            ),
        }
    }

    fn build_prompt(&self, theme: &Theme, samples: &[&Review]) -> String {
        let listed: Vec<String> = samples
            .iter()
            .map(|r| {
                let clean = self.scrubber.scrub(&r.text);
                format!("- {}", truncate_on_word(&clean, MAX_SAMPLE_CHARS))
            })
            .collect();

        format!(
            "Summarize this review theme in 1-2 sentences.\n\n\
             Theme: {name}\n\
             Description: {description}\n\
             Total Reviews: {size}\n\n\
             Sample Reviews:\n{samples}\n\n\
             Requirements:\n\
             - 1-2 sentences, at most {MAX_SUMMARY_WORDS} words\n\
             - Include overall sentiment (positive/negative/mixed)\n\
             - Highlight the key insight or pain point\n\
             - No marketing language\n\n\
             Summary:",
            name = theme.name,
            description = theme.description,
            size = theme.size,
            samples = listed.join("\n"),
        )
    }
}

/// "`{size}` users share `{sentiment}` feedback about `{name}`, ..."
fn fallback_summary(theme: &Theme, samples: &[&Review]) -> String {
    let sentiment = match Sentiment::of_reviews(samples.iter().copied()) {
        Sentiment::Neutral => "notable",
        s => s.as_str(),
    };
    format!(
        "{} users share {sentiment} feedback about {}, indicating this is a notable concern.",
        theme.size,
        theme.name.to_lowercase(),
    )
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::text::word_count;
    use crate::{GenerationError, OfflineGenerator, PatternScrubber, ThemeId};

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn theme(name: &str, size: usize) -> Theme {
        Theme {
            id: ThemeId::Cluster(0),
            name: name.to_string(),
            description: "Users wait on verification.".to_string(),
            size,
            member_review_ids: BTreeSet::new(),
            merged_from: Vec::new(),
        }
    }

    #[test]
    fn test_fallback_template() {
        let reviews = [
            Review::new("a", "slow").with_rating(1.0),
            Review::new("b", "slower").with_rating(2.0),
            Review::new("c", "slowest").with_rating(1.0),
        ];
        let refs: Vec<&Review> = reviews.iter().collect();
        let scrubber = PatternScrubber::new();
        let summary = ThemeSummarizer::new(&OfflineGenerator, &scrubber, TIMEOUT)
            .summarize(&theme("KYC Verification Delays", 3), &refs);

        assert!(summary.is_fallback());
        assert_eq!(
            summary.value,
            "3 users share negative feedback about kyc verification delays, indicating this is a notable concern."
        );
    }

    #[test]
    fn test_fallback_without_ratings_is_notable() {
        let review = Review::new("a", "meh");
        let scrubber = PatternScrubber::new();
        let summary = ThemeSummarizer::new(&OfflineGenerator, &scrubber, TIMEOUT)
            .summarize(&theme("Login", 12), &[&review]);
        assert!(summary.value.starts_with("12 users share notable feedback about login"));
    }

    #[test]
    fn test_mixed_and_positive_sentiment() {
        let scrubber = PatternScrubber::new();
        let summarizer = ThemeSummarizer::new(&OfflineGenerator, &scrubber, TIMEOUT);
        let mixed = Review::new("m", "ok").with_rating(3.0);
        let happy = Review::new("h", "great").with_rating(5.0);
        assert!(summarizer.summarize(&theme("X", 1), &[&mixed]).value.contains("mixed"));
        assert!(summarizer.summarize(&theme("X", 1), &[&happy]).value.contains("positive"));
    }

    #[test]
    fn test_long_model_output_clamped() {
        let verbose = |_: &str, _: Duration| -> Result<String, GenerationError> {
            Ok(format!("{}. Short tail.", "word ".repeat(80).trim()))
        };
        let scrubber = PatternScrubber::new();
        let summary = ThemeSummarizer::new(&verbose, &scrubber, TIMEOUT).summarize(&theme("X", 1), &[]);
        assert!(!summary.is_fallback());
        assert_eq!(word_count(&summary.value), MAX_SUMMARY_WORDS);
    }

    #[test]
    fn test_model_output_kept_by_sentence() {
        let model = |_: &str, _: Duration| -> Result<String, GenerationError> {
            Ok("\"Users are frustrated by slow KYC. Most cite missing updates.\"".to_string())
        };
        let scrubber = PatternScrubber::new();
        let summary = ThemeSummarizer::new(&model, &scrubber, TIMEOUT).summarize(&theme("X", 1), &[]);
        assert_eq!(
            summary.value,
            "Users are frustrated by slow KYC. Most cite missing updates."
        );
    }

    #[test]
    fn test_prompt_scrubs_samples() {
        let seen = std::sync::Mutex::new(String::new());
        let spy = |prompt: &str, _: Duration| -> Result<String, GenerationError> {
            if let Ok(mut s) = seen.lock() {
                s.push_str(prompt);
            }
            Err(GenerationError::Unavailable("spy".to_string()))
        };
        let review = Review::new("a", "write to me@example.com");
        let scrubber = PatternScrubber::new();
        let _ = ThemeSummarizer::new(&spy, &scrubber, TIMEOUT).summarize(&theme("X", 1), &[&review]);
        let prompt = seen.lock().unwrap().clone();
        assert!(prompt.contains("- write to [email]"));
        assert!(!prompt.contains("me@example.com"));
    }
}
