//! Embedding collaborator.
//!
//! Maps review text to fixed-length dense vectors. The pipeline treats the
//! embedder as a black box: one vector per input text, index-aligned, all of
//! the same dimension. Embeddings are foundational, so unlike text
//! generation there is no fallback. A failure here ends the run.
//!
//! ## Distance
//!
//! The clusterer compares vectors with either Euclidean or cosine distance
//! (see [`Metric`]). Sentence-transformer models usually emit unit-length
//! vectors, for which the two produce the same neighbour ordering.
//!
//! ## Local Models (requires `fastembed` feature)
//!
//! ```rust,ignore
//! use reviewpulse::{Embedder, FastEmbedder};
//!
//! // fastembed's default model (BGE-small-en, 384 dimensions)
//! let embedder = FastEmbedder::new()?;
//! let vectors = embedder.embed(&["KYC is slow", "Withdrawals stuck"])?;
//! assert_eq!(vectors[0].len(), 384);
//! ```

use serde::{Deserialize, Serialize};

/// Embedding collaborator failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("embedding failed: {0}")]
pub struct EmbeddingError(pub String);

/// Maps texts to dense vectors.
pub trait Embedder: Send + Sync {
    /// Embed every text. The result must be index-aligned with `texts`.
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

impl<F> Embedder for F
where
    F: Fn(&[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> + Send + Sync,
{
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self(texts)
    }
}

/// Distance function used by the clusterer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Straight-line distance.
    #[default]
    Euclidean,
    /// One minus cosine similarity.
    Cosine,
}

impl Metric {
    /// Distance between two vectors of equal length.
    pub fn distance(self, a: &[f32], b: &[f32]) -> f64 {
        match self {
            Self::Euclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| {
                    let d = f64::from(x - y);
                    d * d
                })
                .sum::<f64>()
                .sqrt(),
            Self::Cosine => (1.0 - f64::from(cosine_similarity(a, b))).max(0.0),
        }
    }
}

/// Cosine similarity between two embeddings.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    #[cfg(feature = "innr")]
    {
        innr::cosine(a, b)
    }

    #[cfg(not(feature = "innr"))]
    {
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a > 0.0 && norm_b > 0.0 {
            dot / (norm_a * norm_b)
        } else {
            0.0
        }
    }
}

/// Local sentence embeddings via fastembed.
///
/// Requires the `fastembed` feature. The model is downloaded on first use.
#[cfg(feature = "fastembed")]
pub struct FastEmbedder {
    model: fastembed::TextEmbedding,
}

#[cfg(feature = "fastembed")]
impl FastEmbedder {
    /// Load fastembed's default model (BGE-small-en, 384 dimensions).
    ///
    /// # Errors
    ///
    /// Returns an error if the embedding model fails to load.
    pub fn new() -> Result<Self, EmbeddingError> {
        let model = fastembed::TextEmbedding::try_new(Default::default())
            .map_err(|e| EmbeddingError(e.to_string()))?;
        Ok(Self { model })
    }
}

#[cfg(feature = "fastembed")]
impl Embedder for FastEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError(e.to_string()))
    }
}

#[cfg(feature = "fastembed")]
impl std::fmt::Debug for FastEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedder").finish_non_exhaustive()
    }
}
