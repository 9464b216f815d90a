//! Themes: named clusters of reviews.
//!
//! A theme starts life as one HDBSCAN cluster. Discovery groups the reviews
//! by cluster, asks the [`ThemeNamer`] for a label, and records which
//! reviews belong to it. The capper may later fold several themes into a
//! single synthetic "Other" theme.
//!
//! ## Ranking
//!
//! Everything downstream that cares about order (actions, the pulse layout,
//! compression) uses [`by_rank`]: larger themes first, earlier clusters
//! first on ties, and "Other" always last.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ClusterLabel, Clustering, Generated, Review, ThemeLabel, ThemeNamer};

/// Identity of a theme within one run.
///
/// `Cluster` ids sort before `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeId {
    /// Backed by the clusterer's cluster with this id.
    Cluster(usize),
    /// The synthetic catch-all produced by the capper.
    Other,
}

impl fmt::Display for ThemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cluster(id) => write!(f, "cluster {id}"),
            Self::Other => f.write_str("other"),
        }
    }
}

/// A named group of reviews sharing a topic.
///
/// `size` always equals `member_review_ids.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    /// Cluster id, or [`ThemeId::Other`].
    pub id: ThemeId,
    /// Short label, e.g. "KYC Verification Delays".
    pub name: String,
    /// One-sentence description.
    pub description: String,
    /// Number of member reviews.
    pub size: usize,
    /// Ids of the member reviews.
    pub member_review_ids: BTreeSet<String>,
    /// Cluster ids folded into this theme; empty unless it is "Other".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merged_from: Vec<usize>,
}

impl Theme {
    /// A theme for a single cluster.
    pub fn from_cluster(cluster: usize, label: ThemeLabel, members: BTreeSet<String>) -> Self {
        Self {
            id: ThemeId::Cluster(cluster),
            name: label.name,
            description: label.description,
            size: members.len(),
            member_review_ids: members,
            merged_from: Vec::new(),
        }
    }

    /// Whether this is the synthetic catch-all.
    pub fn is_other(&self) -> bool {
        self.id == ThemeId::Other
    }

    /// Whether `review_id` belongs to this theme.
    pub fn contains(&self, review_id: &str) -> bool {
        self.member_review_ids.contains(review_id)
    }
}

/// Rank order for themes: size descending, then id ascending, with "Other"
/// after every cluster-backed theme.
pub fn by_rank(a: &Theme, b: &Theme) -> Ordering {
    a.is_other()
        .cmp(&b.is_other())
        .then_with(|| b.size.cmp(&a.size))
        .then_with(|| a.id.cmp(&b.id))
}

/// Group reviews by cluster and name each group.
///
/// `reviews` and `clustering` must be index-aligned. Themes come back in
/// ascending cluster id order; noise reviews belong to no theme.
pub fn discover_themes(
    reviews: &[Review],
    clustering: &Clustering,
    namer: &ThemeNamer<'_>,
) -> Vec<Generated<Theme>> {
    let mut groups: BTreeMap<usize, Vec<(&Review, f64)>> = BTreeMap::new();
    for ((review, label), p) in reviews
        .iter()
        .zip(&clustering.labels)
        .zip(&clustering.probabilities)
    {
        if let ClusterLabel::Cluster(id) = label {
            groups.entry(*id).or_default().push((review, *p));
        }
    }

    groups
        .into_iter()
        .map(|(cluster, members)| {
            let (group, probabilities): (Vec<&Review>, Vec<f64>) = members.into_iter().unzip();
            let label = namer.label(&group, &probabilities);
            let ids = group.iter().map(|r| r.id.clone()).collect();

            debug!(cluster, size = group.len(), name = %label.value.name, "theme discovered");
            Generated {
                value: Theme::from_cluster(cluster, label.value, ids),
                origin: label.origin,
            }
        })
        .collect()
}

/// Where a single review ended up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewAssignment {
    /// The review.
    pub review_id: String,
    /// Theme name, "Other" for merged clusters, or "Noise".
    pub theme: String,
    /// Cluster id; `None` for noise.
    pub cluster: Option<usize>,
    /// Membership probability; `0.0` for noise.
    pub confidence: f64,
}

/// Theme name used in assignments for reviews that joined no cluster.
pub const NOISE_THEME: &str = "Noise";

/// Map every review to its final theme.
///
/// `themes` are the capped themes, so reviews from merged clusters report
/// "Other".
pub fn assign_reviews(
    reviews: &[Review],
    clustering: &Clustering,
    themes: &[Theme],
) -> Vec<ReviewAssignment> {
    reviews
        .iter()
        .zip(&clustering.labels)
        .zip(&clustering.probabilities)
        .map(|((review, label), p)| {
            let theme = label
                .cluster_id()
                .and_then(|_| themes.iter().find(|t| t.contains(&review.id)))
                .map_or_else(|| NOISE_THEME.to_string(), |t| t.name.clone());
            ReviewAssignment {
                review_id: review.id.clone(),
                theme,
                cluster: label.cluster_id(),
                confidence: *p,
            }
        })
        .collect()
}
