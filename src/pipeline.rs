//! End-to-end pulse run.
//!
//! ```text
//! reviews ─► embed ─► cluster ─► name ─► cap ─┬─► quotes    ─┐
//!                                             └─► summaries ─┴─► actions ─► assemble
//!                                                 (per theme, in parallel)
//! ```
//!
//! Stages run strictly in order because each consumes the previous stage's
//! complete output. Quote extraction and summarization are independent per
//! theme and run on a bounded rayon pool; results are collected back in
//! rank order. A run returns a complete [`PulseRun`] or an error, never a
//! partial document.
//!
//! Nothing is shared between runs. Everything a run learns about itself,
//! including each time a stage fell back to its template, is returned in
//! the [`RunReport`].

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::theme::{assign_reviews, by_rank, discover_themes};
use crate::{
    capper, ActionGenerator, ClusterStats, DensityClusterer, Embedder, Error, Generated,
    Generator, PulseAssembler, PulseConfig, PulseDocument, Quote, QuoteExtractor, ReportWindow,
    Result, Review, ReviewAssignment, Scrubber, SummarizedTheme, Theme, ThemeNamer,
    ThemeSummarizer,
};

/// Samples handed to the summarizer per theme.
const SUMMARY_SAMPLES: usize = 5;

/// A stage that gave up on the model and used its template instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackEvent {
    /// "naming", "summary", or "actions".
    pub stage: String,
    /// What was being generated, e.g. the theme name.
    pub subject: String,
    /// Why the model path was abandoned.
    pub reason: String,
}

/// What happened during a run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// Clustering counts before capping.
    pub stats: ClusterStats,
    /// Every fallback taken, in the order it happened.
    pub fallbacks: Vec<FallbackEvent>,
    /// Wall-clock time of the run.
    pub elapsed_ms: u64,
}

impl RunReport {
    /// Whether any stage used its template.
    pub fn degraded(&self) -> bool {
        !self.fallbacks.is_empty()
    }

    /// Note the fallback, if `generated` took one.
    fn record<T>(&mut self, stage: &str, subject: &str, generated: &Generated<T>) {
        if let Some(reason) = generated.fallback_reason() {
            warn!(stage, subject, reason, "generation fell back to template");
            self.fallbacks.push(FallbackEvent {
                stage: stage.to_string(),
                subject: subject.to_string(),
                reason: reason.to_string(),
            });
        }
    }
}

/// Output of [`Pipeline::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseRun {
    /// The budget-compliant digest.
    pub document: PulseDocument,
    /// Capped themes in rank order.
    pub themes: Vec<Theme>,
    /// Final theme of every input review, in input order.
    pub assignments: Vec<ReviewAssignment>,
    /// Run statistics and degraded-quality signals.
    pub report: RunReport,
}

/// Runs the whole pulse for one batch of reviews.
///
/// ## Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use reviewpulse::{
///     EmbeddingError, OfflineGenerator, PatternScrubber, Pipeline, PulseConfig, ReportWindow,
///     Review,
/// };
///
/// // Toy embedder: a KYC axis and a length axis.
/// let embedder = |texts: &[&str]| -> Result<Vec<Vec<f32>>, EmbeddingError> {
///     Ok(texts
///         .iter()
///         .map(|t| vec![f32::from(u8::from(t.contains("KYC"))), t.len() as f32 / 100.0])
///         .collect())
/// };
///
/// let reviews: Vec<Review> = (0..6)
///     .map(|i| Review::new(format!("r{i}"), format!("KYC pending for {i} days")))
///     .collect();
/// let config = PulseConfig::default().with_min_cluster_size(3).with_min_samples(2);
/// let scrubber = PatternScrubber::new();
/// let pipeline = Pipeline::new(config, &embedder, &OfflineGenerator, &scrubber).unwrap();
///
/// let window = ReportWindow::week_ending("Acme", NaiveDate::from_ymd_opt(2024, 6, 9).unwrap());
/// let run = pipeline.run(&reviews, &window).unwrap();
/// assert_eq!(run.document.actions.len(), 3);
/// assert!(run.document.metadata.word_count <= 250);
/// ```
#[derive(Clone)]
pub struct Pipeline<'a> {
    config: PulseConfig,
    embedder: &'a dyn Embedder,
    generator: &'a dyn Generator,
    scrubber: &'a dyn Scrubber,
}

impl std::fmt::Debug for Pipeline<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<'a> Pipeline<'a> {
    /// Wire a pipeline to its collaborators.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] if `config` fails validation.
    pub fn new(
        config: PulseConfig,
        embedder: &'a dyn Embedder,
        generator: &'a dyn Generator,
        scrubber: &'a dyn Scrubber,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            embedder,
            generator,
            scrubber,
        })
    }

    /// The configuration this pipeline runs with.
    pub fn config(&self) -> &PulseConfig {
        &self.config
    }

    /// Produce the pulse for `reviews`.
    ///
    /// # Errors
    ///
    /// - [`Error::InsufficientData`] for an empty batch.
    /// - [`Error::DuplicateReview`] if two reviews share an id.
    /// - [`Error::EmbeddingUnavailable`] if embedding fails or returns the
    ///   wrong number of vectors.
    /// - [`Error::DimensionMismatch`] if the vectors differ in length.
    /// - [`Error::BudgetInvariantViolated`] if the pulse cannot fit the
    ///   word ceiling.
    pub fn run(&self, reviews: &[Review], window: &ReportWindow) -> Result<PulseRun> {
        let started = Instant::now();
        info!(reviews = reviews.len(), product = %window.product, "pulse run started");

        if reviews.is_empty() {
            return Err(Error::InsufficientData {
                stage: "ingest",
                count: 0,
            });
        }
        let mut seen = HashSet::with_capacity(reviews.len());
        if let Some(dup) = reviews.iter().find(|r| !seen.insert(r.id.as_str())) {
            return Err(Error::DuplicateReview(dup.id.clone()));
        }

        let vectors = self.embed(reviews)?;
        let clustering = DensityClusterer::new(self.config.min_cluster_size, self.config.min_samples)
            .with_metric(self.config.metric)
            .cluster(&vectors)?;
        let stats = clustering.stats();
        info!(
            clusters = stats.n_clusters,
            noise = stats.n_noise,
            "clustering finished"
        );

        let mut report = RunReport {
            stats,
            ..RunReport::default()
        };
        let timeout = self.config.generation_timeout();

        let namer = ThemeNamer::new(self.generator, self.scrubber, timeout);
        let mut discovered = Vec::new();
        for generated in discover_themes(reviews, &clustering, &namer) {
            report.record("naming", &generated.value.id.to_string(), &generated);
            discovered.push(generated.into_inner());
        }

        let mut themes = capper::enforce_limit(discovered, self.config.max_themes);
        themes.sort_by(by_rank);
        info!(themes = themes.len(), "themes ready");

        let probability: HashMap<&str, f64> = reviews
            .iter()
            .zip(&clustering.probabilities)
            .map(|(r, p)| (r.id.as_str(), *p))
            .collect();
        let per_theme = self.per_theme(reviews, &themes, &probability);

        let mut summarized = Vec::with_capacity(themes.len());
        let mut quotes = Vec::new();
        for (theme, (theme_quotes, summary)) in themes.iter().zip(per_theme) {
            report.record("summary", &theme.name, &summary);
            debug!(theme = %theme.name, quotes = theme_quotes.len(), "theme content ready");
            quotes.extend(theme_quotes);
            summarized.push(SummarizedTheme {
                theme: theme.clone(),
                summary: summary.into_inner(),
            });
        }

        let actions = ActionGenerator::new(self.generator, timeout).generate_actions(&summarized, &quotes);
        report.record("actions", "pulse", &actions);

        let document = PulseAssembler::new(self.config.max_word_count).assemble(
            &summarized,
            &quotes,
            &actions.value,
            window,
            reviews.len(),
        )?;

        let assignments = assign_reviews(reviews, &clustering, &themes);
        report.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            words = document.metadata.word_count,
            fallbacks = report.fallbacks.len(),
            elapsed_ms = report.elapsed_ms,
            "pulse run finished"
        );

        Ok(PulseRun {
            document,
            themes,
            assignments,
            report,
        })
    }

    fn embed(&self, reviews: &[Review]) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<&str> = reviews.iter().map(|r| r.text.as_str()).collect();
        let vectors = self
            .embedder
            .embed(&texts)
            .map_err(|e| Error::EmbeddingUnavailable {
                reviews: reviews.len(),
                reason: e.0,
            })?;

        if vectors.len() != reviews.len() {
            return Err(Error::EmbeddingUnavailable {
                reviews: reviews.len(),
                reason: format!("embedder returned {} vectors", vectors.len()),
            });
        }
        debug!(dimension = vectors.first().map_or(0, Vec::len), "reviews embedded");
        Ok(vectors)
    }

    /// Quotes and a summary for every theme, in the order of `themes`.
    fn per_theme(
        &self,
        reviews: &[Review],
        themes: &[Theme],
        probability: &HashMap<&str, f64>,
    ) -> Vec<(Vec<Quote>, Generated<String>)> {
        let extractor = QuoteExtractor::new(self.config.quotes_per_theme, self.scrubber);
        let summarizer =
            ThemeSummarizer::new(self.generator, self.scrubber, self.config.generation_timeout());

        let work = || {
            themes
                .par_iter()
                .map(|theme| {
                    let mut members: Vec<(&Review, f64)> = reviews
                        .iter()
                        .filter(|r| theme.contains(&r.id))
                        .map(|r| (r, probability.get(r.id.as_str()).copied().unwrap_or(0.0)))
                        .collect();
                    members.sort_by(|(ra, pa), (rb, pb)| pb.total_cmp(pa).then_with(|| ra.id.cmp(&rb.id)));

                    let samples: Vec<&Review> =
                        members.iter().take(SUMMARY_SAMPLES).map(|(r, _)| *r).collect();
                    (
                        extractor.extract(theme, &members),
                        summarizer.summarize(theme, &samples),
                    )
                })
                .collect::<Vec<_>>()
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_threads)
            .build()
        {
            Ok(pool) => pool.install(work),
            Err(e) => {
                warn!(error = %e, "worker pool unavailable; using the global pool");
                work()
            }
        }
    }
}
