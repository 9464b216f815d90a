//! Run configuration.
//!
//! ```rust
//! use reviewpulse::PulseConfig;
//!
//! let config: PulseConfig = serde_json::from_str(r#"{"max_themes": 3}"#).unwrap();
//! assert_eq!(config.max_themes, 3);
//! assert_eq!(config.max_word_count, 250);
//! config.validate().unwrap();
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Metric, Result};

/// Tunables for a pulse run.
///
/// Every field has a default, so partial documents deserialize. Builders do
/// not clamp; call [`validate`](Self::validate) (the pipeline does) to reject
/// out-of-range values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    /// Smallest group of reviews that counts as a theme.
    pub min_cluster_size: usize,
    /// Neighbourhood size for core distances.
    pub min_samples: usize,
    /// Upper bound on themes in the pulse, "Other" included.
    pub max_themes: usize,
    /// Quotes extracted per theme.
    pub quotes_per_theme: usize,
    /// Word ceiling for the assembled document.
    pub max_word_count: usize,
    /// Deadline for each generation call, in milliseconds.
    pub generation_timeout_ms: u64,
    /// Threads for per-theme quote and summary work.
    pub worker_threads: usize,
    /// Distance metric for clustering.
    pub metric: Metric,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: 15,
            min_samples: 5,
            max_themes: 5,
            quotes_per_theme: 3,
            max_word_count: 250,
            generation_timeout_ms: 30_000,
            worker_threads: 4,
            metric: Metric::Euclidean,
        }
    }
}

impl PulseConfig {
    /// Largest accepted worker pool.
    pub const MAX_WORKER_THREADS: usize = 8;

    /// Set the minimum cluster size.
    #[must_use]
    pub fn with_min_cluster_size(mut self, size: usize) -> Self {
        self.min_cluster_size = size;
        self
    }

    /// Set the core-distance neighbourhood size.
    #[must_use]
    pub fn with_min_samples(mut self, samples: usize) -> Self {
        self.min_samples = samples;
        self
    }

    /// Set the theme cap.
    #[must_use]
    pub fn with_max_themes(mut self, max: usize) -> Self {
        self.max_themes = max;
        self
    }

    /// Set quotes per theme.
    #[must_use]
    pub fn with_quotes_per_theme(mut self, n: usize) -> Self {
        self.quotes_per_theme = n;
        self
    }

    /// Set the word ceiling.
    #[must_use]
    pub fn with_max_word_count(mut self, max: usize) -> Self {
        self.max_word_count = max;
        self
    }

    /// Set the per-call generation deadline.
    #[must_use]
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the worker pool size.
    #[must_use]
    pub fn with_worker_threads(mut self, n: usize) -> Self {
        self.worker_threads = n;
        self
    }

    /// Set the distance metric.
    #[must_use]
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Deadline for each generation call.
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }

    /// Check every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("min_cluster_size", self.min_cluster_size >= 2, ">= 2", self.min_cluster_size as u64),
            ("min_samples", self.min_samples >= 1, ">= 1", self.min_samples as u64),
            ("max_themes", self.max_themes >= 1, ">= 1", self.max_themes as u64),
            ("quotes_per_theme", self.quotes_per_theme >= 1, ">= 1", self.quotes_per_theme as u64),
            ("max_word_count", self.max_word_count >= 1, ">= 1", self.max_word_count as u64),
            ("generation_timeout_ms", self.generation_timeout_ms >= 1, ">= 1", self.generation_timeout_ms),
            (
                "worker_threads",
                (1..=Self::MAX_WORKER_THREADS).contains(&self.worker_threads),
                "in 1..=8",
                self.worker_threads as u64,
            ),
        ];

        match checks.iter().find(|(_, ok, _, _)| !ok) {
            Some((field, _, rule, got)) => Err(Error::InvalidConfig(format!(
                "{field} must be {rule}, got {got}"
            ))),
            None => Ok(()),
        }
    }
}
