//! Theme cap.
//!
//! A pulse shows at most `max_themes` themes. When clustering finds more,
//! the largest `max_themes - 1` survive and the rest are folded into one
//! synthetic "Other" theme:
//!
//! ```text
//! max_themes = 3
//!
//! sizes: [40, 25, 12, 9, 4]        (ranked)
//!         ├──┘  └───┬───┘
//!       kept      merged
//!
//! result: [40, 25, Other(25)]
//! ```
//!
//! Ties at the cut go to the lower cluster id. Capping an already capped
//! list returns it unchanged.

use std::collections::BTreeSet;

use tracing::debug;

use crate::theme::by_rank;
use crate::{Theme, ThemeId};

/// Name of the synthetic catch-all theme.
pub const OTHER_THEME_NAME: &str = "Other";

/// Reduce `themes` to at most `max_themes`.
///
/// Lists already within the cap are returned as given, order included.
/// Otherwise the result is in rank order with "Other" last. A `max_themes`
/// of zero is treated as one.
pub fn enforce_limit(themes: Vec<Theme>, max_themes: usize) -> Vec<Theme> {
    let max_themes = max_themes.max(1);
    if themes.len() <= max_themes {
        return themes;
    }

    let before = themes.len();
    let mut ranked = themes;
    ranked.sort_by(by_rank);
    let merged = ranked.split_off(max_themes - 1);
    let other = merge_into_other(merged);

    debug!(
        before,
        after = max_themes,
        other_size = other.size,
        merged = ?other.merged_from,
        "theme cap applied"
    );
    ranked.push(other);
    ranked
}

fn merge_into_other(merged: Vec<Theme>) -> Theme {
    let count = merged.len();
    let mut members = BTreeSet::new();
    let mut merged_from = Vec::new();

    for theme in merged {
        match theme.id {
            ThemeId::Cluster(id) => merged_from.push(id),
            ThemeId::Other => merged_from.extend(theme.merged_from),
        }
        members.extend(theme.member_review_ids);
    }
    merged_from.sort_unstable();

    Theme {
        id: ThemeId::Other,
        name: OTHER_THEME_NAME.to_string(),
        description: format!("Mixed feedback spread across {count} smaller topics."),
        size: members.len(),
        member_review_ids: members,
        merged_from,
    }
}
