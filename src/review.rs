//! Input records and rating-derived sentiment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single app-store review, already validated and deduplicated upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Stable identifier from the source store.
    pub id: String,
    /// Free-text body.
    pub text: String,
    /// Star rating, typically 1-5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    /// When the review was posted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Review {
    /// Create a review with no rating or timestamp.
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            rating: None,
            timestamp: None,
        }
    }

    /// Attach a star rating.
    #[must_use]
    pub fn with_rating(mut self, rating: f32) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Attach a posting time.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Overall tone of a group of reviews, derived from star ratings.
///
/// | Mean rating | Sentiment |
/// |-------------|-----------|
/// | >= 4.0      | Positive  |
/// | <= 2.0      | Negative  |
/// | otherwise   | Mixed     |
/// | no ratings  | Neutral   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    /// Mean rating of at least 4.
    Positive,
    /// Mean rating of at most 2.
    Negative,
    /// Anything in between.
    Mixed,
    /// No ratings were available.
    Neutral,
}

impl Sentiment {
    /// Mean rating at or above which a group reads as positive.
    pub const POSITIVE_AT: f32 = 4.0;
    /// Mean rating at or below which a group reads as negative.
    pub const NEGATIVE_AT: f32 = 2.0;

    /// Classify a set of ratings by their mean.
    pub fn from_ratings(ratings: &[f32]) -> Self {
        if ratings.is_empty() {
            return Self::Neutral;
        }
        let mean = ratings.iter().sum::<f32>() / ratings.len() as f32;
        if mean >= Self::POSITIVE_AT {
            Self::Positive
        } else if mean <= Self::NEGATIVE_AT {
            Self::Negative
        } else {
            Self::Mixed
        }
    }

    /// Classify the rated subset of some reviews.
    pub fn of_reviews<'a>(reviews: impl IntoIterator<Item = &'a Review>) -> Self {
        let ratings: Vec<f32> = reviews.into_iter().filter_map(|r| r.rating).collect();
        Self::from_ratings(&ratings)
    }

    /// Lowercase label used in templated prose.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Mixed => "mixed",
            Self::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
