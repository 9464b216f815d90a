//! Density-based clustering (HDBSCAN).
//!
//! Groups embedding vectors into clusters without being told how many to
//! find, and labels points in sparse regions as noise.
//!
//! ## The Idea
//!
//! Reviews about the same topic sit close together in embedding space. Dense
//! regions are topics; stragglers between them are noise:
//!
//! ```text
//!     ●●●                    ○ <- noise
//!    ●●●●●    ○         ▲▲▲
//!     ●●●              ▲▲▲▲▲
//!   "KYC delays"     "withdrawal stuck"
//! ```
//!
//! ## The Algorithm
//!
//! 1. **Core distance**: distance from each point to its `min_samples`-th
//!    nearest neighbour. Small in dense regions, large in sparse ones.
//! 2. **Mutual reachability**: `max(core(a), core(b), d(a, b))`. Pushes
//!    sparse points away from everything.
//! 3. **Minimum spanning tree** over mutual reachability (Prim).
//! 4. **Single-linkage hierarchy** from the tree's edges, shortest first.
//! 5. **Condense** the hierarchy: a split only creates two clusters when both
//!    sides hold at least `min_cluster_size` points; otherwise the smaller
//!    side's points "fall out" of the surviving cluster.
//! 6. **Excess of mass**: pick the clusters that persist longest
//!    (stability = Σ (λ_point − λ_birth)), preferring a parent over its
//!    children unless the children are jointly more stable. The root is
//!    never selected.
//!
//! With λ = 1 / distance. A point's membership probability is its λ when it
//! left the cluster, relative to the largest λ seen in that cluster.
//!
//! ## Determinism
//!
//! There is no randomness anywhere. Ties in the spanning tree go to the
//! lowest index and edge sorting is stable, so identical input gives
//! identical labels and probabilities.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Metric, Result};

/// Zero distances (duplicate reviews) are clamped so every λ stays finite.
const MIN_DISTANCE: f64 = 1e-12;

/// Cluster assignment of a single point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterLabel {
    /// Not confidently part of any cluster.
    Noise,
    /// Member of the cluster with this id.
    Cluster(usize),
}

impl ClusterLabel {
    /// The cluster id, or `None` for noise.
    pub const fn cluster_id(self) -> Option<usize> {
        match self {
            Self::Noise => None,
            Self::Cluster(id) => Some(id),
        }
    }

    /// Whether this point is noise.
    pub const fn is_noise(self) -> bool {
        matches!(self, Self::Noise)
    }
}

/// Output of [`DensityClusterer::cluster`]: one label and one membership
/// probability per input vector, index-aligned with the input.
///
/// Probabilities are only meaningful within a single run. They are never
/// comparable across runs or across differently parameterized clusterers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clustering {
    /// Label per point.
    pub labels: Vec<ClusterLabel>,
    /// Membership probability per point, in `[0, 1]`; `0` for noise.
    pub probabilities: Vec<f64>,
}

impl Clustering {
    /// A clustering where every one of `n` points is noise.
    #[must_use]
    pub fn noise(n: usize) -> Self {
        Self {
            labels: vec![ClusterLabel::Noise; n],
            probabilities: vec![0.0; n],
        }
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether there are no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Distinct cluster ids, ascending.
    pub fn cluster_ids(&self) -> Vec<usize> {
        let mut ids: Vec<usize> = self.labels.iter().filter_map(|l| l.cluster_id()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Indices of the points in cluster `id`, in input order.
    pub fn members(&self, id: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == ClusterLabel::Cluster(id))
            .map(|(i, _)| i)
            .collect()
    }

    /// Summary counts for logging and run reports.
    pub fn stats(&self) -> ClusterStats {
        let mut cluster_sizes = BTreeMap::new();
        let mut n_noise = 0;
        for label in &self.labels {
            match label {
                ClusterLabel::Noise => n_noise += 1,
                ClusterLabel::Cluster(id) => *cluster_sizes.entry(*id).or_insert(0) += 1,
            }
        }
        ClusterStats {
            n_clusters: cluster_sizes.len(),
            n_noise,
            cluster_sizes,
            total_points: self.labels.len(),
        }
    }
}

/// Counts describing a clustering.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClusterStats {
    /// Number of distinct clusters.
    pub n_clusters: usize,
    /// Number of noise points.
    pub n_noise: usize,
    /// Points per cluster id.
    pub cluster_sizes: BTreeMap<usize, usize>,
    /// All points, noise included.
    pub total_points: usize,
}

/// HDBSCAN clusterer with excess-of-mass cluster selection.
///
/// ## Example
///
/// ```rust
/// use reviewpulse::{ClusterLabel, DensityClusterer};
///
/// let mut vectors = Vec::new();
/// for (cx, cy) in [(0.0, 0.0), (10.0, 10.0)] {
///     for (dx, dy) in [(0.0, 0.0), (0.1, 0.0), (0.0, 0.1), (0.1, 0.1), (0.05, 0.05)] {
///         vectors.push(vec![cx + dx, cy + dy]);
///     }
/// }
///
/// let clustering = DensityClusterer::new(3, 2).cluster(&vectors).unwrap();
/// assert_eq!(clustering.cluster_ids().len(), 2);
/// assert_ne!(clustering.labels[0], clustering.labels[5]);
/// ```
#[derive(Debug, Clone)]
pub struct DensityClusterer {
    min_cluster_size: usize,
    min_samples: usize,
    metric: Metric,
}

impl DensityClusterer {
    /// Create a clusterer.
    ///
    /// # Arguments
    ///
    /// * `min_cluster_size` - Smallest group of points that counts as a cluster
    /// * `min_samples` - Neighbourhood size for core distances; larger is more conservative
    ///
    /// # Panics
    ///
    /// Panics if `min_cluster_size < 2` or `min_samples == 0`.
    #[must_use]
    pub fn new(min_cluster_size: usize, min_samples: usize) -> Self {
        assert!(min_cluster_size >= 2, "min_cluster_size must be >= 2");
        assert!(min_samples >= 1, "min_samples must be >= 1");
        Self {
            min_cluster_size,
            min_samples,
            metric: Metric::default(),
        }
    }

    /// Use a different distance metric.
    #[must_use]
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Cluster `vectors`.
    ///
    /// Fewer than `min_cluster_size` points is not an error: every point is
    /// labeled noise.
    ///
    /// # Errors
    ///
    /// - [`Error::InsufficientData`] if `vectors` is empty.
    /// - [`Error::DimensionMismatch`] if the vectors differ in length.
    pub fn cluster(&self, vectors: &[Vec<f32>]) -> Result<Clustering> {
        let Some(first) = vectors.first() else {
            return Err(Error::InsufficientData {
                stage: "cluster",
                count: 0,
            });
        };

        let expected = first.len();
        if let Some((index, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != expected) {
            return Err(Error::DimensionMismatch {
                index,
                expected,
                found: v.len(),
            });
        }

        let n = vectors.len();
        if n < self.min_cluster_size {
            debug!(
                points = n,
                min_cluster_size = self.min_cluster_size,
                "too few points to cluster; all noise"
            );
            return Ok(Clustering::noise(n));
        }

        let core = self.core_distances(vectors);
        let edges = self.spanning_tree(vectors, &core);
        let merges = single_linkage(n, edges);
        let tree = condense(&merges, n, self.min_cluster_size);
        let selected = select_clusters(&tree);
        let clustering = assign(&tree, &selected, n);

        debug!(
            points = n,
            clusters = clustering.cluster_ids().len(),
            condensed_clusters = tree.n_clusters,
            "clustering complete"
        );
        Ok(clustering)
    }

    /// Distance from each point to its `min_samples`-th nearest other point.
    fn core_distances(&self, vectors: &[Vec<f32>]) -> Vec<f64> {
        let n = vectors.len();
        let k = self.min_samples.min(n - 1);

        (0..n)
            .map(|i| {
                let mut dists: Vec<f64> = (0..n)
                    .filter(|&j| j != i)
                    .map(|j| self.metric.distance(&vectors[i], &vectors[j]))
                    .collect();
                let (_, kth, _) = dists.select_nth_unstable_by(k - 1, f64::total_cmp);
                *kth
            })
            .collect()
    }

    /// Prim's algorithm over the dense mutual reachability graph.
    fn spanning_tree(&self, vectors: &[Vec<f32>], core: &[f64]) -> Vec<Edge> {
        let n = vectors.len();
        let mut in_tree = vec![false; n];
        let mut best = vec![f64::INFINITY; n];
        let mut from = vec![0usize; n];
        let mut edges = Vec::with_capacity(n - 1);

        let mut current = 0;
        in_tree[current] = true;

        for _ in 1..n {
            let mut next: Option<(usize, f64)> = None;
            for j in 0..n {
                if in_tree[j] {
                    continue;
                }
                let reach = self
                    .metric
                    .distance(&vectors[current], &vectors[j])
                    .max(core[current])
                    .max(core[j]);
                if reach < best[j] {
                    best[j] = reach;
                    from[j] = current;
                }
                // Strict comparison keeps the lowest index on ties.
                if next.map_or(true, |(_, d)| best[j] < d) {
                    next = Some((j, best[j]));
                }
            }

            let Some((j, weight)) = next else { break };
            in_tree[j] = true;
            edges.push(Edge {
                a: from[j],
                b: j,
                weight,
            });
            current = j;
        }

        edges
    }
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    a: usize,
    b: usize,
    weight: f64,
}

/// One merge of the single-linkage hierarchy. Node ids below `n` are points;
/// merge `i` creates node `n + i`.
#[derive(Debug, Clone, Copy)]
struct Merge {
    left: usize,
    right: usize,
    distance: f64,
    size: usize,
}

fn single_linkage(n: usize, mut edges: Vec<Edge>) -> Vec<Merge> {
    edges.sort_by(|a, b| a.weight.total_cmp(&b.weight));

    let mut parent: Vec<usize> = (0..2 * n - 1).collect();
    let mut size = vec![1usize; 2 * n - 1];
    let mut merges = Vec::with_capacity(n - 1);

    for (i, edge) in edges.iter().enumerate() {
        let left = find(&mut parent, edge.a);
        let right = find(&mut parent, edge.b);
        let node = n + i;
        size[node] = size[left] + size[right];
        parent[left] = node;
        parent[right] = node;
        merges.push(Merge {
            left,
            right,
            distance: edge.weight,
            size: size[node],
        });
    }

    merges
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    let mut root = x;
    while parent[root] != root {
        root = parent[root];
    }
    while parent[x] != root {
        let next = parent[x];
        parent[x] = root;
        x = next;
    }
    root
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Child {
    Point(usize),
    Cluster(usize),
}

#[derive(Debug, Clone, Copy)]
struct CondensedEdge {
    parent: usize,
    child: Child,
    lambda: f64,
    size: usize,
}

/// Condensed cluster tree. Cluster 0 is the root; children always have
/// larger ids than their parents.
#[derive(Debug)]
struct CondensedTree {
    edges: Vec<CondensedEdge>,
    n_clusters: usize,
}

fn condense(merges: &[Merge], n: usize, min_cluster_size: usize) -> CondensedTree {
    let node_size = |node: usize| if node < n { 1 } else { merges[node - n].size };

    let mut edges = Vec::with_capacity(2 * n);
    let mut n_clusters = 1;
    let mut stack = vec![(2 * n - 2, 0usize)];

    while let Some((node, cluster)) = stack.pop() {
        // Only nodes with >= min_cluster_size (>= 2) points are pushed, so
        // `node` is always a merge.
        let merge = merges[node - n];
        let lambda = 1.0 / merge.distance.max(MIN_DISTANCE);
        let big_left = node_size(merge.left) >= min_cluster_size;
        let big_right = node_size(merge.right) >= min_cluster_size;

        match (big_left, big_right) {
            (true, true) => {
                for child in [merge.left, merge.right] {
                    let id = n_clusters;
                    n_clusters += 1;
                    edges.push(CondensedEdge {
                        parent: cluster,
                        child: Child::Cluster(id),
                        lambda,
                        size: node_size(child),
                    });
                    stack.push((child, id));
                }
            }
            (false, false) => {
                for child in [merge.left, merge.right] {
                    fall_out(merges, n, child, cluster, lambda, &mut edges);
                }
            }
            (false, true) => {
                fall_out(merges, n, merge.left, cluster, lambda, &mut edges);
                stack.push((merge.right, cluster));
            }
            (true, false) => {
                fall_out(merges, n, merge.right, cluster, lambda, &mut edges);
                stack.push((merge.left, cluster));
            }
        }
    }

    CondensedTree { edges, n_clusters }
}

/// Record every point under `node` as leaving `cluster` at `lambda`.
fn fall_out(
    merges: &[Merge],
    n: usize,
    node: usize,
    cluster: usize,
    lambda: f64,
    edges: &mut Vec<CondensedEdge>,
) {
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        if node < n {
            edges.push(CondensedEdge {
                parent: cluster,
                child: Child::Point(node),
                lambda,
                size: 1,
            });
        } else {
            let merge = merges[node - n];
            stack.push(merge.right);
            stack.push(merge.left);
        }
    }
}

fn cluster_children(tree: &CondensedTree) -> Vec<Vec<usize>> {
    let mut children = vec![Vec::new(); tree.n_clusters];
    for edge in &tree.edges {
        if let Child::Cluster(c) = edge.child {
            children[edge.parent].push(c);
        }
    }
    children
}

/// Excess-of-mass selection. Returns a selected flag per condensed cluster.
fn select_clusters(tree: &CondensedTree) -> Vec<bool> {
    let mut birth = vec![0.0f64; tree.n_clusters];
    for edge in &tree.edges {
        if let Child::Cluster(c) = edge.child {
            birth[c] = edge.lambda;
        }
    }

    let mut stability = vec![0.0f64; tree.n_clusters];
    for edge in &tree.edges {
        stability[edge.parent] += (edge.lambda - birth[edge.parent]) * edge.size as f64;
    }

    let children = cluster_children(tree);
    let mut selected = vec![true; tree.n_clusters];
    selected[0] = false;

    for c in (1..tree.n_clusters).rev() {
        let subtree: f64 = children[c].iter().map(|&k| stability[k]).sum();
        if subtree > stability[c] {
            selected[c] = false;
            stability[c] = subtree;
        } else {
            let mut stack = children[c].clone();
            while let Some(k) = stack.pop() {
                selected[k] = false;
                stack.extend_from_slice(&children[k]);
            }
        }
    }

    selected
}

fn assign(tree: &CondensedTree, selected: &[bool], n: usize) -> Clustering {
    let mut parent_of = vec![None; tree.n_clusters];
    let mut deaths = vec![0.0f64; tree.n_clusters];
    for edge in &tree.edges {
        if let Child::Cluster(c) = edge.child {
            parent_of[c] = Some(edge.parent);
        }
        deaths[edge.parent] = deaths[edge.parent].max(edge.lambda);
    }

    let mut label_of = vec![None; tree.n_clusters];
    let mut next_label = 0;
    for (c, &is_selected) in selected.iter().enumerate() {
        if is_selected {
            label_of[c] = Some(next_label);
            next_label += 1;
        }
    }

    let mut clustering = Clustering::noise(n);
    for edge in &tree.edges {
        let Child::Point(point) = edge.child else {
            continue;
        };

        let mut cursor = Some(edge.parent);
        while let Some(c) = cursor {
            if selected[c] {
                break;
            }
            cursor = parent_of[c];
        }

        if let Some(c) = cursor {
            let max_lambda = deaths[c];
            clustering.labels[point] = label_of[c].map_or(ClusterLabel::Noise, ClusterLabel::Cluster);
            clustering.probabilities[point] = if max_lambda > 0.0 {
                edge.lambda.min(max_lambda) / max_lambda
            } else {
                1.0
            };
        }
    }

    clustering
}
