//! The weekly pulse document and its word budget.
//!
//! ## Layout
//!
//! ```text
//! Weekly Product Pulse – Acme                       title
//! This week's 412 reviews focus most on ...         overview
//! KYC Delays: Users wait days for ...               one entry per theme
//! "Still pending after a week"                      quotes, by theme rank
//! Add SMS updates at every KYC stage                exactly three actions
//! ```
//!
//! ## Compression
//!
//! Everything above counts against the budget (`name: summary` for theme
//! entries). When the first draft is too long, content is shed in a fixed
//! order, re-counting after every change:
//!
//! 1. every summary shrinks to its first sentence;
//! 2. quotes are dropped from the tail, one at a time;
//! 3. the overview shrinks to its first sentence;
//! 4. the lowest-ranked theme is dropped (with its quotes), one at a time,
//!    while more than one theme remains.
//!
//! Actions are never touched. A document still over budget after step 4 is
//! an error, never an over-long pulse.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::text::{first_sentence, word_count};
use crate::theme::by_rank;
use crate::{Error, Quote, Result, Theme, ThemeId, WordBudget};

/// The product and reporting week a pulse covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
    /// Product name shown in the title.
    pub product: String,
    /// First day of the window.
    pub week_start: NaiveDate,
    /// Last day of the window.
    pub week_end: NaiveDate,
}

impl ReportWindow {
    /// A window with explicit bounds.
    pub fn new(product: impl Into<String>, week_start: NaiveDate, week_end: NaiveDate) -> Self {
        Self {
            product: product.into(),
            week_start,
            week_end,
        }
    }

    /// The seven days ending on `week_end`, inclusive.
    pub fn week_ending(product: impl Into<String>, week_end: NaiveDate) -> Self {
        Self::new(product, week_end - Duration::days(6), week_end)
    }
}

/// A theme with its generated summary, ready for the pulse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizedTheme {
    /// The theme.
    pub theme: Theme,
    /// At most fifty words.
    pub summary: String,
}

/// One theme as it appears in the pulse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeEntry {
    /// Theme name.
    pub name: String,
    /// Summary, possibly shortened to one sentence.
    pub summary: String,
    /// Number of member reviews.
    pub size: usize,
}

/// Facts about the pulse itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseMetadata {
    /// Product name.
    pub product: String,
    /// First day of the window.
    pub week_start: NaiveDate,
    /// Last day of the window.
    pub week_end: NaiveDate,
    /// Reviews analyzed, noise included.
    pub total_reviews: usize,
    /// Words in the final document; never above the configured ceiling.
    pub word_count: usize,
}

/// The weekly digest, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseDocument {
    /// "Weekly Product Pulse – {product}".
    pub title: String,
    /// One or two sentences.
    pub overview: String,
    /// Themes in rank order.
    pub themes: Vec<ThemeEntry>,
    /// Quote texts, by theme rank then extraction order.
    pub quotes: Vec<String>,
    /// Exactly three actions.
    pub actions: Vec<String>,
    /// Window, totals, and final word count.
    pub metadata: PulseMetadata,
}

impl PulseDocument {
    /// Count the words the budget applies to.
    pub fn count_words(&self) -> usize {
        word_count(&self.title)
            + word_count(&self.overview)
            + self
                .themes
                .iter()
                .map(|t| word_count(&format!("{}: {}", t.name, t.summary)))
                .sum::<usize>()
            + self.quotes.iter().map(|q| word_count(q)).sum::<usize>()
            + self.actions.iter().map(|a| word_count(a)).sum::<usize>()
    }
}

/// Builds pulse documents within a word budget.
///
/// ## Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use reviewpulse::{PulseAssembler, ReportWindow};
///
/// let window = ReportWindow::week_ending("Acme", NaiveDate::from_ymd_opt(2024, 6, 9).unwrap());
/// let actions = vec!["Investigate and address login failures".to_string(); 3];
///
/// let doc = PulseAssembler::new(250).assemble(&[], &[], &actions, &window, 0).unwrap();
/// assert_eq!(doc.title, "Weekly Product Pulse – Acme");
/// assert!(doc.metadata.word_count <= 250);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PulseAssembler {
    budget: WordBudget,
}

/// A document under construction, with the theme each entry and quote
/// belongs to.
struct Draft {
    doc: PulseDocument,
    theme_ids: Vec<ThemeId>,
    quote_owners: Vec<ThemeId>,
}

impl PulseAssembler {
    /// Create an assembler with a `max_word_count` ceiling.
    pub fn new(max_word_count: usize) -> Self {
        Self {
            budget: WordBudget::new(max_word_count),
        }
    }

    /// The ceiling this assembler enforces.
    pub fn budget(&self) -> WordBudget {
        self.budget
    }

    /// Assemble and compress a pulse.
    ///
    /// `themes` may arrive in any order; they are ranked here. Quotes are
    /// matched to themes by [`Quote::theme_id`], and quotes for themes not
    /// in `themes` are ignored. `actions` are copied verbatim.
    ///
    /// # Errors
    ///
    /// [`Error::BudgetInvariantViolated`] if the document cannot be brought
    /// under the ceiling.
    pub fn assemble(
        &self,
        themes: &[SummarizedTheme],
        quotes: &[Quote],
        actions: &[String],
        window: &ReportWindow,
        total_reviews: usize,
    ) -> Result<PulseDocument> {
        let mut draft = draft(themes, quotes, actions, window, total_reviews);
        let initial = draft.doc.count_words();
        let words = self.compress(&mut draft);

        if !self.budget.allows(words) {
            return Err(Error::BudgetInvariantViolated {
                word_count: words,
                max_word_count: self.budget.max(),
            });
        }

        debug!(
            initial,
            words,
            themes = draft.doc.themes.len(),
            quotes = draft.doc.quotes.len(),
            "pulse assembled"
        );
        draft.doc.metadata.word_count = words;
        Ok(draft.doc)
    }

    /// Apply the compression steps in order. Returns the final word count.
    fn compress(&self, draft: &mut Draft) -> usize {
        let mut words = draft.doc.count_words();
        if self.budget.allows(words) {
            return words;
        }

        for entry in &mut draft.doc.themes {
            entry.summary = first_sentence(&entry.summary).to_string();
        }
        words = draft.doc.count_words();
        debug!(words, over = self.budget.overage(words), "summaries shortened");

        while !self.budget.allows(words) && draft.doc.quotes.pop().is_some() {
            draft.quote_owners.pop();
            words = draft.doc.count_words();
        }
        debug!(words, quotes = draft.doc.quotes.len(), "quotes trimmed");
        if self.budget.allows(words) {
            return words;
        }

        draft.doc.overview = first_sentence(&draft.doc.overview).to_string();
        words = draft.doc.count_words();
        debug!(words, "overview shortened");

        while !self.budget.allows(words) && draft.doc.themes.len() > 1 {
            draft.doc.themes.pop();
            let names: Vec<&str> = draft.doc.themes.iter().map(|t| t.name.as_str()).collect();
            draft.doc.overview = lead(draft.doc.metadata.total_reviews, &names);
            if let Some(dropped) = draft.theme_ids.pop() {
                let owners = std::mem::take(&mut draft.quote_owners);
                let (kept_owners, kept_quotes): (Vec<ThemeId>, Vec<String>) = owners
                    .into_iter()
                    .zip(std::mem::take(&mut draft.doc.quotes))
                    .filter(|(owner, _)| *owner != dropped)
                    .unzip();
                draft.quote_owners = kept_owners;
                draft.doc.quotes = kept_quotes;
            }
            words = draft.doc.count_words();
            debug!(words, themes = draft.doc.themes.len(), "lowest-ranked theme dropped");
        }

        words
    }
}

fn draft(
    themes: &[SummarizedTheme],
    quotes: &[Quote],
    actions: &[String],
    window: &ReportWindow,
    total_reviews: usize,
) -> Draft {
    let mut ranked: Vec<&SummarizedTheme> = themes.iter().collect();
    ranked.sort_by(|a, b| by_rank(&a.theme, &b.theme));

    let mut quote_owners = Vec::new();
    let mut quote_texts = Vec::new();
    for t in &ranked {
        for q in quotes.iter().filter(|q| q.theme_id == t.theme.id) {
            quote_owners.push(t.theme.id);
            quote_texts.push(q.text.clone());
        }
    }

    let names: Vec<&str> = ranked.iter().map(|t| t.theme.name.as_str()).collect();
    let doc = PulseDocument {
        title: format!("Weekly Product Pulse – {}", window.product),
        overview: overview(total_reviews, &names, actions.len()),
        themes: ranked
            .iter()
            .map(|t| ThemeEntry {
                name: t.theme.name.clone(),
                summary: t.summary.clone(),
                size: t.theme.size,
            })
            .collect(),
        quotes: quote_texts,
        actions: actions.to_vec(),
        metadata: PulseMetadata {
            product: window.product.clone(),
            week_start: window.week_start,
            week_end: window.week_end,
            total_reviews,
            word_count: 0,
        },
    };

    Draft {
        doc,
        theme_ids: ranked.iter().map(|t| t.theme.id).collect(),
        quote_owners,
    }
}

fn overview(total_reviews: usize, ranked_names: &[&str], actions: usize) -> String {
    format!(
        "{} The pulse covers {} and {}.",
        lead(total_reviews, ranked_names),
        plural(ranked_names.len(), "theme", "themes"),
        plural(actions, "recommended action", "recommended actions"),
    )
}

/// First overview sentence, naming the top one or two themes.
fn lead(total_reviews: usize, ranked_names: &[&str]) -> String {
    let reviews = plural(total_reviews, "review", "reviews");
    match ranked_names {
        [] => format!("This week's {reviews} surfaced no recurring themes."),
        [only] => format!("This week's {reviews} focus most on {only}."),
        [first, second, ..] => format!("This week's {reviews} focus most on {first} and {second}."),
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}
