//! Property-based tests for theme discovery and pulse assembly.
//!
//! These tests verify the invariants every run must keep:
//! - Budget: the assembled pulse never exceeds its word ceiling
//! - Cap: at most `max_themes` themes, and capping twice changes nothing
//! - Accounting: every review is in exactly one theme or is noise
//! - Ordering: quotes never increase in confidence
//! - Actions: always exactly three

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::time::Duration;

use chrono::NaiveDate;
use proptest::prelude::*;
use reviewpulse::text::{clamp_words, first_sentence, truncate_on_word, word_count};
use reviewpulse::{
    enforce_limit, ActionGenerator, ClusterLabel, DensityClusterer, Error, GenerationError,
    OfflineGenerator, PatternScrubber, PulseAssembler, Quote, QuoteExtractor, ReportWindow,
    Review, SummarizedTheme, Theme, ThemeId, ACTION_COUNT, MAX_QUOTE_CHARS,
};

// =============================================================================
// Test Generators
// =============================================================================

/// Title-cased names of one to three words.
fn theme_name() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{2,8}( [A-Z][a-z]{2,8}){0,2}").unwrap()
}

/// One to four short sentences.
fn prose() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::collection::vec(prop::string::string_regex("[a-z]{2,9}").unwrap(), 2..12),
        1..4,
    )
    .prop_map(|sentences| {
        sentences
            .iter()
            .map(|words| format!("{}.", words.join(" ")))
            .collect::<Vec<_>>()
            .join(" ")
    })
}

/// Themes with disjoint members and distinct cluster ids.
fn themes(max: usize) -> impl Strategy<Value = Vec<Theme>> {
    prop::collection::vec(1usize..40, 0..max).prop_map(|sizes| {
        sizes
            .into_iter()
            .enumerate()
            .map(|(cluster, size)| Theme {
                id: ThemeId::Cluster(cluster),
                name: format!("Theme {cluster}"),
                description: String::new(),
                size,
                member_review_ids: (0..size).map(|i| format!("c{cluster}-{i}")).collect(),
                merged_from: Vec::new(),
            })
            .collect()
    })
}

fn points() -> impl Strategy<Value = Vec<Vec<f32>>> {
    prop::collection::vec(prop::collection::vec(-10.0f32..10.0, 2), 1..30)
}

fn window() -> ReportWindow {
    ReportWindow::week_ending("Acme", NaiveDate::from_ymd_opt(2024, 6, 9).unwrap())
}

// =============================================================================
// Text
// =============================================================================

proptest! {
    #[test]
    fn truncation_within_limit(text in ".{0,400}", limit in 5usize..200) {
        let out = truncate_on_word(&text, limit);
        prop_assert!(out.chars().count() <= limit, "{} > {}", out.chars().count(), limit);
    }

    #[test]
    fn truncation_keeps_a_prefix(text in prose(), limit in 5usize..200) {
        let out = truncate_on_word(&text, limit);
        let kept = out.strip_suffix("...").unwrap_or(&out);
        prop_assert!(text.trim().starts_with(kept));
    }

    #[test]
    fn clamp_within_word_limit(text in prose(), max in 1usize..60) {
        prop_assert!(word_count(&clamp_words(&text, max)) <= max);
    }
}

// =============================================================================
// Clustering
// =============================================================================

proptest! {
    #[test]
    fn every_point_labeled_once(
        points in points(),
        min_cluster_size in 2usize..6,
        min_samples in 1usize..4,
    ) {
        let clustering = DensityClusterer::new(min_cluster_size, min_samples)
            .cluster(&points)
            .unwrap();
        let stats = clustering.stats();

        prop_assert_eq!(clustering.labels.len(), points.len());
        prop_assert_eq!(clustering.probabilities.len(), points.len());
        prop_assert_eq!(
            stats.cluster_sizes.values().sum::<usize>() + stats.n_noise,
            points.len()
        );
        for size in stats.cluster_sizes.values() {
            prop_assert!(*size >= 1);
        }
    }

    #[test]
    fn probabilities_well_formed(points in points(), min_cluster_size in 2usize..6) {
        let clustering = DensityClusterer::new(min_cluster_size, 2).cluster(&points).unwrap();
        for (label, p) in clustering.labels.iter().zip(&clustering.probabilities) {
            prop_assert!((0.0..=1.0).contains(p));
            if *label == ClusterLabel::Noise {
                prop_assert_eq!(*p, 0.0);
            }
        }
    }

    #[test]
    fn cluster_ids_are_dense(points in points()) {
        let clustering = DensityClusterer::new(3, 2).cluster(&points).unwrap();
        let ids = clustering.cluster_ids();
        prop_assert_eq!(ids, (0..clustering.stats().n_clusters).collect::<Vec<_>>());
    }

    #[test]
    fn clustering_is_deterministic(points in points()) {
        let clusterer = DensityClusterer::new(3, 2);
        prop_assert_eq!(clusterer.cluster(&points).unwrap(), clusterer.cluster(&points).unwrap());
    }
}

// =============================================================================
// Theme Cap
// =============================================================================

proptest! {
    #[test]
    fn cap_bounds_theme_count(themes in themes(20), max in 1usize..8) {
        prop_assert!(enforce_limit(themes, max).len() <= max);
    }

    #[test]
    fn cap_is_idempotent(themes in themes(20), max in 1usize..8) {
        let once = enforce_limit(themes, max);
        prop_assert_eq!(enforce_limit(once.clone(), max), once);
    }

    #[test]
    fn cap_conserves_members(themes in themes(20), max in 1usize..8) {
        let before: BTreeSet<String> =
            themes.iter().flat_map(|t| t.member_review_ids.iter().cloned()).collect();
        let capped = enforce_limit(themes, max);
        let after: BTreeSet<String> =
            capped.iter().flat_map(|t| t.member_review_ids.iter().cloned()).collect();

        prop_assert_eq!(before.len(), capped.iter().map(|t| t.size).sum::<usize>());
        prop_assert_eq!(before, after);
        for theme in &capped {
            prop_assert_eq!(theme.size, theme.member_review_ids.len());
        }
    }
}

// =============================================================================
// Quotes
// =============================================================================

proptest! {
    #[test]
    fn quotes_ordered_and_bounded(
        members in prop::collection::vec((".{0,300}", 0.0f64..=1.0), 0..15),
        n in 1usize..6,
    ) {
        let reviews: Vec<Review> = members
            .iter()
            .enumerate()
            .map(|(i, (text, _))| Review::new(format!("r{i:02}"), text.clone()))
            .collect();
        let pairs: Vec<(&Review, f64)> =
            reviews.iter().zip(members.iter().map(|(_, p)| *p)).collect();

        let theme = Theme {
            id: ThemeId::Cluster(0),
            name: "T".to_string(),
            description: String::new(),
            size: reviews.len(),
            member_review_ids: reviews.iter().map(|r| r.id.clone()).collect(),
            merged_from: Vec::new(),
        };
        let scrubber = PatternScrubber::new();
        let quotes = QuoteExtractor::new(n, &scrubber).extract(&theme, &pairs);

        prop_assert!(quotes.len() <= n.min(reviews.len()));
        for pair in quotes.windows(2) {
            prop_assert!(pair[0].confidence >= pair[1].confidence);
        }
        for q in &quotes {
            prop_assert!(q.text.chars().count() <= MAX_QUOTE_CHARS);
            prop_assert!(!q.source_id.is_empty());
        }
    }
}

// =============================================================================
// Actions
// =============================================================================

fn summarized(names: &[String]) -> Vec<SummarizedTheme> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| SummarizedTheme {
            theme: Theme {
                id: ThemeId::Cluster(i),
                name: name.clone(),
                description: String::new(),
                size: 10 + i,
                member_review_ids: BTreeSet::new(),
                merged_from: Vec::new(),
            },
            summary: format!("{name} summary."),
        })
        .collect()
}

proptest! {
    #[test]
    fn always_three_actions(
        names in prop::collection::vec(theme_name(), 0..6),
        response in prop::option::of(".{0,300}"),
    ) {
        let themes = summarized(&names);
        let model = move |_: &str, _: Duration| -> Result<String, GenerationError> {
            response
                .clone()
                .ok_or_else(|| GenerationError::Unavailable("down".to_string()))
        };
        let actions = ActionGenerator::new(&model, Duration::from_secs(1))
            .generate_actions(&themes, &[]);

        prop_assert_eq!(actions.value.len(), ACTION_COUNT);
        for action in &actions.value {
            prop_assert!(!action.trim().is_empty());
        }
    }
}

// =============================================================================
// Word Budget
// =============================================================================

proptest! {
    #[test]
    fn pulse_never_exceeds_budget(
        entries in prop::collection::vec((theme_name(), prose(), 1usize..50), 0..8),
        quote_texts in prop::collection::vec(prose(), 0..12),
        max_word_count in 1usize..300,
    ) {
        let themes: Vec<SummarizedTheme> = entries
            .iter()
            .enumerate()
            .map(|(i, (name, summary, size))| SummarizedTheme {
                theme: Theme {
                    id: ThemeId::Cluster(i),
                    name: name.clone(),
                    description: String::new(),
                    size: *size,
                    member_review_ids: BTreeSet::new(),
                    merged_from: Vec::new(),
                },
                summary: summary.clone(),
            })
            .collect();
        let quotes: Vec<Quote> = quote_texts
            .iter()
            .enumerate()
            .map(|(i, text)| Quote {
                text: text.clone(),
                confidence: 1.0,
                source_id: format!("q{i}"),
                theme: String::new(),
                theme_id: ThemeId::Cluster(i % entries.len().max(1)),
            })
            .collect();
        let actions = ActionGenerator::new(&OfflineGenerator, Duration::from_secs(1))
            .generate_actions(&themes, &quotes)
            .into_inner();

        match PulseAssembler::new(max_word_count).assemble(&themes, &quotes, &actions, &window(), 100) {
            Ok(doc) => {
                prop_assert!(doc.metadata.word_count <= max_word_count);
                prop_assert_eq!(doc.metadata.word_count, doc.count_words());
                prop_assert_eq!(&doc.actions, &actions);
                prop_assert!(!themes.is_empty() || doc.themes.is_empty());
                if !themes.is_empty() {
                    prop_assert!(!doc.themes.is_empty());
                }
            }
            Err(Error::BudgetInvariantViolated { word_count: words, max_word_count: max }) => {
                // Only a fully compressed pulse may be rejected: title, lead
                // sentence, the top theme with its first sentence, actions.
                let top = entries
                    .iter()
                    .enumerate()
                    .min_by_key(|(i, (_, _, size))| (Reverse(*size), *i))
                    .map(|(_, (name, summary, _))| (name, summary));
                let (lead, top_entry) = match top {
                    Some((name, summary)) => (
                        format!("This week's 100 reviews focus most on {name}."),
                        word_count(&format!("{name}: {}", first_sentence(summary))),
                    ),
                    None => ("This week's 100 reviews surfaced no recurring themes.".to_string(), 0),
                };
                let minimal = word_count("Weekly Product Pulse – Acme")
                    + word_count(&lead)
                    + top_entry
                    + actions.iter().map(|a| word_count(a)).sum::<usize>();

                prop_assert_eq!(words, minimal);
                prop_assert!(minimal > max);
                prop_assert_eq!(max, max_word_count);
            }
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }
}

// =============================================================================
// Edge Cases
// =============================================================================

#[test]
fn single_point_is_noise() {
    let clustering = DensityClusterer::new(2, 1).cluster(&[vec![1.0, 2.0]]).unwrap();
    assert_eq!(clustering.labels, vec![ClusterLabel::Noise]);
}

#[test]
fn identical_points_do_not_panic() {
    let points = vec![vec![0.5f32; 8]; 20];
    let clustering = DensityClusterer::new(5, 3).cluster(&points).unwrap();
    assert_eq!(clustering.len(), 20);
}
