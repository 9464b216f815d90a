//! Theme naming.
//!
//! Turns a cluster of reviews into a short name and a one-sentence
//! description. The language model gets the most representative reviews
//! (highest membership probability) and must answer with JSON. When it is
//! unavailable, slow, or answers with something unparseable, the name is
//! built from the sample's most frequent content words instead. Both paths
//! only ever see scrubbed text, since theme names end up in the pulse.
//!
//! ```text
//! representatives (prob desc)        model answer
//! ┌───────────────────────────┐      {"theme_name": "KYC Verification Delays",
//! │ 0.98 KYC pending 5 days   │ ──►   "description": "Users wait days for..."}
//! │ 0.95 KYC rejected again   │
//! │ ...                       │      fallback (model down)
//! └───────────────────────────┘ ──►  "Verification Pending"
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::generate::call_with_deadline;
use crate::text::{keywords, title_case, truncate_on_word};
use crate::{Generated, Generator, Review, Scrubber, Sentiment};

/// Name and description of a theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeLabel {
    /// Short title-cased name.
    pub name: String,
    /// One-sentence description.
    pub description: String,
}

/// Name used when nothing better can be derived.
pub const GENERIC_THEME_NAME: &str = "General Feedback";

/// Names are rejected as malformed past this many words.
const MAX_NAME_WORDS: usize = 8;

/// Characters of each representative shown to the model.
const PROMPT_REVIEW_CHARS: usize = 200;

/// Labels clusters of reviews.
#[derive(Clone, Copy)]
pub struct ThemeNamer<'a> {
    generator: &'a dyn Generator,
    scrubber: &'a dyn Scrubber,
    timeout: Duration,
}

impl std::fmt::Debug for ThemeNamer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeNamer")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<'a> ThemeNamer<'a> {
    /// How many reviews are shown to the model.
    pub const MAX_REPRESENTATIVES: usize = 10;

    /// Create a namer that gives each model call `timeout`. Review text is
    /// passed through `scrubber` before it is shown to the model or mined
    /// for keywords.
    pub fn new(generator: &'a dyn Generator, scrubber: &'a dyn Scrubber, timeout: Duration) -> Self {
        Self {
            generator,
            scrubber,
            timeout,
        }
    }

    /// Label a cluster.
    ///
    /// `probabilities` is index-aligned with `cluster_reviews`; missing
    /// entries count as zero. Never fails: every problem ends in the
    /// keyword fallback, and an empty cluster is "General Feedback".
    pub fn label(&self, cluster_reviews: &[&Review], probabilities: &[f64]) -> Generated<ThemeLabel> {
        if cluster_reviews.is_empty() {
            return Generated::fallback(fallback_label(&[], &[]), "empty cluster");
        }

        let sample = representatives(cluster_reviews, probabilities);
        let texts: Vec<String> = sample.iter().map(|r| self.scrubber.scrub(&r.text)).collect();
        let prompt = build_prompt(&texts, cluster_reviews.len());

        match call_with_deadline(self.generator, &prompt, self.timeout) {
            Ok(response) => match parse_label(&response) {
                Some(label) => Generated::model(label),
                None => Generated::fallback(
                    fallback_label(&sample, &texts),
                    "malformed label response",
                ),
            },
            Err(e) => Generated::fallback(fallback_label(&sample, &texts), e.to_string()),
        }
    }
}

/// Up to ten reviews by probability descending; ties keep input order.
fn representatives<'r>(reviews: &[&'r Review], probabilities: &[f64]) -> Vec<&'r Review> {
    let mut ranked: Vec<(usize, f64)> = (0..reviews.len())
        .map(|i| (i, probabilities.get(i).copied().unwrap_or(0.0)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
        .into_iter()
        .take(ThemeNamer::MAX_REPRESENTATIVES)
        .map(|(i, _)| reviews[i])
        .collect()
}

fn build_prompt(texts: &[String], total: usize) -> String {
    let listed: Vec<String> = texts
        .iter()
        .enumerate()
        .map(|(i, text)| format!("{}. {}", i + 1, truncate_on_word(text, PROMPT_REVIEW_CHARS)))
        .collect();

    format!(
        "You are analyzing customer reviews to identify themes.\n\n\
         Below are {shown} representative reviews from a cluster of {total} similar reviews:\n\n\
         {reviews}\n\n\
         Tasks:\n\
         1. Identify the main theme these reviews share\n\
         2. Create a concise, descriptive theme name (2-4 words)\n\
         3. Write a brief description (1 sentence)\n\n\
         Guidelines:\n\
         - The name should be specific (\"KYC Verification Delays\", not \"Issues\")\n\
         - Focus on what users are discussing, not just sentiment\n\n\
         Return ONLY valid JSON:\n\
         {{\"theme_name\": \"...\", \"description\": \"...\"}}",
        shown = texts.len(),
        reviews = listed.join("\n"),
    )
}

#[derive(Deserialize)]
struct RawLabel {
    theme_name: String,
    #[serde(default)]
    description: String,
}

/// Pull the JSON object out of a response that may be fenced or wrapped in
/// prose.
fn parse_label(response: &str) -> Option<ThemeLabel> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }

    let raw: RawLabel = serde_json::from_str(&response[start..=end]).ok()?;
    let name = raw.theme_name.trim();
    let words = crate::text::word_count(name);
    if words == 0 || words > MAX_NAME_WORDS {
        return None;
    }

    let description = match raw.description.trim() {
        "" => format!("Reviews discussing {}.", name.to_lowercase()),
        d => d.to_string(),
    };

    Some(ThemeLabel {
        name: name.to_string(),
        description,
    })
}

/// Drop `[...]` redaction placeholders so they never become keywords.
fn without_placeholders(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// `texts` are the scrubbed bodies of `sample`, index-aligned.
fn fallback_label(sample: &[&Review], texts: &[String]) -> ThemeLabel {
    let cleaned: Vec<String> = texts.iter().map(|t| without_placeholders(t)).collect();
    let top = keywords(cleaned.iter().map(String::as_str), 2);
    let name = if top.is_empty() {
        GENERIC_THEME_NAME.to_string()
    } else {
        top.iter().map(|w| title_case(w)).collect::<Vec<_>>().join(" ")
    };

    let sentiment = Sentiment::of_reviews(sample.iter().copied());
    let noun = if sample.len() == 1 { "review" } else { "reviews" };
    let description = format!(
        "{} sampled {noun} discuss {} with {sentiment} sentiment overall.",
        sample.len(),
        name.to_lowercase(),
    );

    ThemeLabel { name, description }
}
