//! Word budget for the assembled pulse.
//!
//! ## The Problem
//!
//! A weekly digest is read in an inbox, on a phone, between meetings. Past a
//! couple of hundred words nobody reaches the recommendations, which are the
//! whole point of the document. So the pulse carries a hard ceiling:
//!
//! - `max`: the absolute number of words allowed. Never exceeded.
//!
//! Content is shed in a fixed priority order until the document fits (see
//! [`crate::PulseAssembler`]). `WordBudget` only answers the arithmetic:
//! does this fit, and how far over is it.

use std::cmp::Ordering;

/// Hard ceiling on the number of words in a document.
///
/// # Examples
///
/// ```rust
/// use reviewpulse::WordBudget;
/// use std::cmp::Ordering;
///
/// let budget = WordBudget::new(250);
/// assert_eq!(budget.max(), 250);
/// assert_eq!(budget.fits(250), Ordering::Equal);
/// assert_eq!(budget.fits(251), Ordering::Greater);
/// assert_eq!(budget.overage(260), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordBudget {
    max: usize,
}

impl WordBudget {
    /// Default ceiling for a weekly pulse.
    pub const DEFAULT_MAX: usize = 250;

    /// Create a budget with the given ceiling.
    #[must_use]
    pub const fn new(max: usize) -> Self {
        Self { max }
    }

    /// The maximum allowed word count.
    #[must_use]
    pub const fn max(&self) -> usize {
        self.max
    }

    /// Compare a word count against the ceiling.
    ///
    /// Returns:
    /// - `Ordering::Less`: room to spare
    /// - `Ordering::Equal`: exactly at the ceiling
    /// - `Ordering::Greater`: over budget, must compress
    #[must_use]
    pub fn fits(&self, words: usize) -> Ordering {
        words.cmp(&self.max)
    }

    /// Whether `words` is within the ceiling.
    #[must_use]
    pub fn allows(&self, words: usize) -> bool {
        words <= self.max
    }

    /// How many words over the ceiling `words` is (0 when within budget).
    #[must_use]
    pub fn overage(&self, words: usize) -> usize {
        words.saturating_sub(self.max)
    }

    /// Check if adding `additional` words to `current` would exceed the ceiling.
    #[must_use]
    pub fn would_overflow(&self, current: usize, additional: usize) -> bool {
        current.saturating_add(additional) > self.max
    }
}

impl Default for WordBudget {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX)
    }
}

impl From<usize> for WordBudget {
    fn from(max: usize) -> Self {
        Self::new(max)
    }
}
