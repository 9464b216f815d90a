//! Error types for reviewpulse.
//!
//! Only the fatal kinds live here. Generation failures are recovered at
//! every call site and never reach the caller; see [`crate::GenerationError`].

/// Errors that abort a pulse run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No input records to work with.
    #[error("insufficient data at {stage}: {count} records (need at least 1)")]
    InsufficientData {
        /// The pipeline stage that rejected the input.
        stage: &'static str,
        /// How many records it received.
        count: usize,
    },

    /// The embedding collaborator failed or returned a misaligned batch.
    #[error("embedding unavailable for {reviews} reviews: {reason}")]
    EmbeddingUnavailable {
        /// Number of reviews submitted for embedding.
        reviews: usize,
        /// Collaborator-supplied failure description.
        reason: String,
    },

    /// The assembled document could not be brought under the word budget.
    #[error("word budget violated after compression: {word_count} > {max_word_count}")]
    BudgetInvariantViolated {
        /// Word count of the most compressed document.
        word_count: usize,
        /// The configured ceiling.
        max_word_count: usize,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The same review id appeared twice in one batch.
    #[error("duplicate review id: {0}")]
    DuplicateReview(String),

    /// Embedding vectors of differing length were passed to the clusterer.
    #[error("vector {index} has dimension {found}, expected {expected}")]
    DimensionMismatch {
        /// Index of the offending vector.
        index: usize,
        /// Dimension of the first vector.
        expected: usize,
        /// Dimension of the offending vector.
        found: usize,
    },
}

/// Result type for reviewpulse operations.
pub type Result<T> = std::result::Result<T, Error>;
