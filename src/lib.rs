//! # reviewpulse
//!
//! Theme discovery and word-bounded weekly digests for app-store reviews.
//!
//! ## The Problem
//!
//! A product team gets hundreds of reviews a week. Nobody reads them all,
//! and the few that get read are the loudest, not the most representative.
//! What the team wants on Monday morning is one short page:
//!
//! - what people talked about (a handful of themes, not forty),
//! - what they said, in their own words (quotes, with PII removed),
//! - what to do about it (exactly three actions).
//!
//! The page must stay short. A digest that grows with the review volume
//! stops being read, so the word count has a hard ceiling.
//!
//! ## How It Works
//!
//! ```text
//!             ┌──────────┐   ┌──────────┐   ┌────────┐   ┌─────┐
//!  reviews ──►│  embed   │──►│ HDBSCAN  │──►│  name  │──►│ cap │
//!             └──────────┘   └──────────┘   └────────┘   └──┬──┘
//!                                                           │
//!             ┌──────────┐   ┌──────────┐   ┌───────────┐   │
//!    pulse ◄──│ assemble │◄──│ actions  │◄──│ quotes +  │◄──┘
//!             │ + budget │   │  (3)     │   │ summaries │
//!             └──────────┘   └──────────┘   └───────────┘
//! ```
//!
//! 1. **Embed** every review with an [`Embedder`].
//! 2. **Cluster** the vectors with [`DensityClusterer`] (HDBSCAN). The
//!    number of themes is discovered, and outliers become noise instead of
//!    polluting a theme.
//! 3. **Name** each cluster with [`ThemeNamer`].
//! 4. **Cap** the theme count with [`enforce_limit`]; the overflow is folded
//!    into a single "Other" theme.
//! 5. **Quote** and **summarize** each theme ([`QuoteExtractor`],
//!    [`ThemeSummarizer`]), in parallel across themes.
//! 6. **Act**: [`ActionGenerator`] always yields three actions.
//! 7. **Assemble** with [`PulseAssembler`], which sheds content in a fixed
//!    priority order until the document fits its [`WordBudget`].
//!
//! [`Pipeline`] runs all of it.
//!
//! ## Degrading Gracefully
//!
//! Embeddings are foundational: without them there is nothing to cluster,
//! and the run fails. Text generation is not. Every stage that asks a
//! language model for prose has a deterministic template to fall back on,
//! so a run with the model down still produces a complete pulse. Each
//! fallback is logged and listed in the run's [`RunReport`].
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use reviewpulse::{
//!     EmbeddingError, OfflineGenerator, PatternScrubber, Pipeline, PulseConfig, ReportWindow,
//!     Review,
//! };
//!
//! // Any `Fn(&[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>` is an embedder.
//! let embedder = |texts: &[&str]| -> Result<Vec<Vec<f32>>, EmbeddingError> {
//!     Ok(texts.iter().map(|t| vec![t.len() as f32, 0.0]).collect())
//! };
//!
//! let reviews = vec![
//!     Review::new("1", "KYC verification is taking forever").with_rating(1.0),
//!     Review::new("2", "Withdrawal stuck for a week").with_rating(2.0),
//! ];
//!
//! let scrubber = PatternScrubber::new();
//! let pipeline = Pipeline::new(PulseConfig::default(), &embedder, &OfflineGenerator, &scrubber)?;
//! let window = ReportWindow::week_ending("Acme", NaiveDate::from_ymd_opt(2024, 6, 9).unwrap());
//!
//! let run = pipeline.run(&reviews, &window)?;
//! assert_eq!(run.document.actions.len(), 3);
//! assert!(run.document.metadata.word_count <= 250);
//! # Ok::<(), reviewpulse::Error>(())
//! ```
//!
//! ## Features
//!
//! | Feature     | Adds                                                   |
//! |-------------|--------------------------------------------------------|
//! | `fastembed` | `FastEmbedder`: local BGE-small sentence embeddings    |
//! | `http`      | `ChatCompletionsGenerator`: OpenAI-compatible client   |
//! | `innr`      | SIMD cosine similarity                                 |
//!
//! ## Logging
//!
//! Stages log through [`tracing`]: boundaries at `info`, per-theme detail at
//! `debug`, fallbacks at `warn`. The crate never installs a subscriber.

mod actions;
mod budget;
mod capper;
mod cluster;
mod config;
mod embed;
mod error;
mod generate;
mod namer;
mod pii;
mod pipeline;
mod pulse;
mod quote;
mod review;
mod summary;
pub mod text;
mod theme;

#[cfg(feature = "http")]
mod chat;

pub use actions::{ActionGenerator, ACTION_COUNT, MIN_ACTION_CHARS};
pub use budget::WordBudget;
pub use capper::{enforce_limit, OTHER_THEME_NAME};
pub use cluster::{ClusterLabel, ClusterStats, Clustering, DensityClusterer};
pub use config::PulseConfig;
pub use embed::{cosine_similarity, Embedder, EmbeddingError, Metric};
pub use error::{Error, Result};
pub use generate::{
    call_with_deadline, GenerationError, Generated, Generator, OfflineGenerator, Origin,
};
pub use namer::{ThemeLabel, ThemeNamer, GENERIC_THEME_NAME};
pub use pii::{PatternScrubber, Scrubber};
pub use pipeline::{FallbackEvent, Pipeline, PulseRun, RunReport};
pub use pulse::{
    PulseAssembler, PulseDocument, PulseMetadata, ReportWindow, SummarizedTheme, ThemeEntry,
};
pub use quote::{Quote, QuoteExtractor, MAX_QUOTE_CHARS};
pub use review::{Review, Sentiment};
pub use summary::{ThemeSummarizer, MAX_SUMMARY_WORDS};
pub use theme::{
    assign_reviews, by_rank, discover_themes, ReviewAssignment, Theme, ThemeId, NOISE_THEME,
};

#[cfg(feature = "fastembed")]
pub use embed::FastEmbedder;

#[cfg(feature = "http")]
pub use chat::ChatCompletionsGenerator;
