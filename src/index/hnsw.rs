//! HNSW (Hierarchical Navigable Small World) graph index.
//!
//! A multi-layer proximity graph for approximate nearest neighbor search.
//! Layer 0 holds every node; each higher layer holds an exponentially
//! thinned subset, so a search greedily descends from a sparse top layer
//! to a dense bottom layer and only runs the expensive beam search once,
//! at layer 0.
//!
//! Key properties:
//! - Sub-linear search complexity, O(log N) layers to descend
//! - Recall tunable at query time through the `ef` knob
//! - Incremental inserts; removal tombstones nodes and leaves the graph
//!   topology intact for connectivity
//!
//! `remove` never unlinks edges: unlinking on every removal is expensive
//! and risks disconnecting the graph. Call [`HnswIndex::compact`] once the
//! tombstone ratio warrants it.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::io::Write;

use ahash::{AHashMap, AHashSet};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::distance::DistanceMetric;
use crate::error::{ProximaError, Result};
use crate::index::{SearchHit, VectorIndex, codec};
use crate::vector::Vector;

/// Hard ceiling on the drawn layer, so a degenerate random draw cannot
/// allocate an absurd number of neighbor lists.
const MAX_LAYER: usize = 63;

/// Configuration for HNSW index construction and search.
///
/// All parameters are fixed for the lifetime of an index instance;
/// changing them requires rebuilding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswConfig {
    /// Vector dimension.
    pub dimension: usize,
    /// Distance metric to use.
    pub distance_metric: DistanceMetric,
    /// Maximum number of connections per node per layer. Layer 0 allows
    /// twice this many.
    pub m: usize,
    /// Size of the candidate set during construction.
    pub ef_construction: usize,
    /// Default size of the candidate set during search; overridable per
    /// query.
    pub ef_search: usize,
    /// Random seed for reproducible layer assignment.
    pub seed: u64,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            dimension: 128,
            distance_metric: DistanceMetric::Cosine,
            m: 16,
            ef_construction: 200,
            ef_search: 50,
            seed: 42,
        }
    }
}

impl HnswConfig {
    /// Create a new HNSW configuration with the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            ..Default::default()
        }
    }

    /// Set the M parameter (connections per node per layer).
    pub fn with_m(mut self, m: usize) -> Self {
        self.m = m;
        self
    }

    /// Set the ef_construction parameter.
    pub fn with_ef_construction(mut self, ef_construction: usize) -> Self {
        self.ef_construction = ef_construction;
        self
    }

    /// Set the default ef_search parameter.
    pub fn with_ef_search(mut self, ef_search: usize) -> Self {
        self.ef_search = ef_search;
        self
    }

    /// Set the distance metric.
    pub fn with_distance_metric(mut self, metric: DistanceMetric) -> Self {
        self.distance_metric = metric;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validate the configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(ProximaError::invalid_argument("Dimension must be > 0"));
        }
        if self.m < 2 {
            return Err(ProximaError::invalid_argument("M must be >= 2"));
        }
        if self.ef_construction < self.m {
            return Err(ProximaError::invalid_argument(
                "ef_construction must be >= M",
            ));
        }
        if self.ef_search == 0 {
            return Err(ProximaError::invalid_argument("ef_search must be > 0"));
        }
        Ok(())
    }

    /// Level normalization factor, `1 / ln(M)`.
    fn level_multiplier(&self) -> f64 {
        1.0 / (self.m as f64).ln()
    }

    /// Connection cap at the given layer: `2M` at layer 0, `M` above.
    fn max_connections(&self, layer: usize) -> usize {
        if layer == 0 { self.m * 2 } else { self.m }
    }
}

/// A node in the HNSW graph.
#[derive(Debug, Clone)]
pub(crate) struct HnswNode {
    /// Internal id supplied by the caller.
    pub(crate) id: u64,
    /// The vector data.
    pub(crate) vector: Vector,
    /// Neighbor slots per layer, from layer 0 up to the node's top layer.
    /// The top layer is fixed at insertion time and never changes.
    pub(crate) neighbors: Vec<Vec<u32>>,
    /// Tombstone flag. Tombstoned nodes stay resident so their edges keep
    /// the graph navigable, but never appear in search results.
    pub(crate) deleted: bool,
}

impl HnswNode {
    pub(crate) fn new(id: u64, vector: Vector, top_layer: usize) -> Self {
        Self {
            id,
            vector,
            neighbors: vec![Vec::new(); top_layer + 1],
            deleted: false,
        }
    }

    pub(crate) fn top_layer(&self) -> usize {
        self.neighbors.len() - 1
    }

    fn neighbors_at(&self, layer: usize) -> &[u32] {
        self.neighbors.get(layer).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Priority queue entry: a node slot with its distance to some target.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    distance: f32,
    slot: u32,
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.slot.cmp(&other.slot))
    }
}

/// Approximate nearest-neighbor index over a layered proximity graph.
#[derive(Debug)]
pub struct HnswIndex {
    config: HnswConfig,
    /// Node arena; neighbor lists store slot indexes into this arena,
    /// never owning references.
    nodes: Vec<HnswNode>,
    /// Maps every id ever added to its arena slot, tombstoned ids
    /// included. Ids are never reused within an instance's lifetime.
    id_to_slot: AHashMap<u64, u32>,
    /// Node resident in the highest non-empty layer; every search and
    /// insertion descent starts here.
    entry_point: Option<u32>,
    /// Current highest layer in the graph.
    top_layer: usize,
    rng: StdRng,
    deleted: usize,
}

impl HnswIndex {
    /// Create a new empty HNSW index with the given configuration.
    pub fn new(config: HnswConfig) -> Result<Self> {
        config.validate()?;
        let rng = StdRng::seed_from_u64(config.seed);

        Ok(Self {
            config,
            nodes: Vec::new(),
            id_to_slot: AHashMap::new(),
            entry_point: None,
            top_layer: 0,
            rng,
            deleted: 0,
        })
    }

    /// Create a new HNSW index with default configuration for the given
    /// dimension.
    pub fn with_dimension(dimension: usize) -> Result<Self> {
        Self::new(HnswConfig::new(dimension))
    }

    /// Get the configuration of this index.
    pub fn config(&self) -> &HnswConfig {
        &self.config
    }

    /// Get the vector stored under `id`, if it is live.
    pub fn get_vector(&self, id: u64) -> Option<&Vector> {
        let &slot = self.id_to_slot.get(&id)?;
        let node = &self.nodes[slot as usize];
        if node.deleted { None } else { Some(&node.vector) }
    }

    /// Rebuild the graph from live vectors, discarding tombstones.
    ///
    /// Removal only tombstones nodes, so after heavy deletion the graph
    /// carries dead weight and search wades through tombstoned candidates.
    /// This maintenance pass reinserts every live vector into a fresh
    /// graph seeded from the configured seed. Cost is a full rebuild;
    /// callers decide when the tombstone ratio justifies it.
    pub fn compact(&mut self) -> Result<()> {
        let mut rebuilt = HnswIndex::new(self.config.clone())?;
        for node in &self.nodes {
            if !node.deleted {
                rebuilt.add(node.id, node.vector.clone())?;
            }
        }
        *self = rebuilt;
        Ok(())
    }

    fn dist(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        self.config.distance_metric.distance(a, b)
    }

    /// Draw the top layer for a new node from a geometric-like
    /// distribution: `floor(-ln(uniform) * (1/ln(M)))`.
    fn draw_layer(&mut self) -> usize {
        let mut uniform: f64 = self.rng.random();
        if uniform <= 0.0 {
            uniform = f64::MIN_POSITIVE;
        }
        let layer = (-uniform.ln() * self.config.level_multiplier()).floor() as usize;
        layer.min(MAX_LAYER)
    }

    /// Single-best greedy walk at one layer: repeatedly move to the
    /// neighbor closest to `query` until no neighbor improves.
    ///
    /// Tombstoned nodes are legal stepping stones here; only result
    /// inclusion filters them.
    fn greedy_closest(&self, query: &[f32], start: u32, layer: usize) -> Result<u32> {
        let mut current = start;
        let mut current_dist = self.dist(query, &self.nodes[current as usize].vector.data)?;

        loop {
            let mut improved = false;
            for &neighbor in self.nodes[current as usize].neighbors_at(layer) {
                let d = self.dist(query, &self.nodes[neighbor as usize].vector.data)?;
                if d < current_dist {
                    current = neighbor;
                    current_dist = d;
                    improved = true;
                }
            }
            if !improved {
                return Ok(current);
            }
        }
    }

    /// Bounded beam search at one layer.
    ///
    /// Maintains a frontier of unexplored candidates (closest first) and a
    /// result set of up to `ef` entries (worst at the heap root), expanding
    /// the closest unexplored candidate each step and stopping once the
    /// frontier cannot improve a full result set.
    ///
    /// With `exclude_deleted`, tombstoned nodes still feed the frontier so
    /// traversal passes through their edges, but they are kept out of the
    /// result set.
    fn search_layer(
        &self,
        query: &[f32],
        entry: u32,
        ef: usize,
        layer: usize,
        exclude_deleted: bool,
    ) -> Result<Vec<Candidate>> {
        let mut visited = AHashSet::new();
        let mut frontier = BinaryHeap::new();
        let mut results: BinaryHeap<Candidate> = BinaryHeap::new();

        let entry_dist = self.dist(query, &self.nodes[entry as usize].vector.data)?;
        let entry_candidate = Candidate {
            distance: entry_dist,
            slot: entry,
        };
        visited.insert(entry);
        frontier.push(Reverse(entry_candidate));
        if !(exclude_deleted && self.nodes[entry as usize].deleted) {
            results.push(entry_candidate);
        }

        while let Some(Reverse(current)) = frontier.pop() {
            if results.len() >= ef
                && let Some(worst) = results.peek()
                && current.distance > worst.distance
            {
                break;
            }

            for &neighbor in self.nodes[current.slot as usize].neighbors_at(layer) {
                if !visited.insert(neighbor) {
                    continue;
                }

                let node = &self.nodes[neighbor as usize];
                let distance = self.dist(query, &node.vector.data)?;
                let candidate = Candidate {
                    distance,
                    slot: neighbor,
                };

                let admit = results.len() < ef
                    || results
                        .peek()
                        .is_some_and(|worst| candidate.distance < worst.distance);
                if !admit {
                    continue;
                }

                frontier.push(Reverse(candidate));
                if !(exclude_deleted && node.deleted) {
                    results.push(candidate);
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        Ok(results.into_sorted_vec())
    }

    /// Neighbor-selection heuristic.
    ///
    /// Walk candidates in ascending distance order and keep a candidate
    /// only if no already-selected neighbor is closer to it than it is to
    /// the target. Plain top-k-by-distance collapses dense clusters into
    /// cliques; this diversification keeps long-range edges that let the
    /// greedy search escape local optima. Leftover slots are backfilled
    /// with the closest rejected candidates.
    fn select_neighbors(
        &self,
        candidates: &[Candidate],
        max_connections: usize,
    ) -> Result<Vec<u32>> {
        // Candidate distances are relative to the selection target, so the
        // input must arrive sorted ascending by that distance.
        debug_assert!(candidates.is_sorted());
        let mut selected: Vec<Candidate> = Vec::with_capacity(max_connections);
        let mut rejected: Vec<Candidate> = Vec::new();

        for &candidate in candidates {
            if selected.len() >= max_connections {
                break;
            }

            let candidate_vec = &self.nodes[candidate.slot as usize].vector.data;
            let mut dominated = false;
            for kept in &selected {
                let kept_vec = &self.nodes[kept.slot as usize].vector.data;
                if self.dist(candidate_vec, kept_vec)? < candidate.distance {
                    dominated = true;
                    break;
                }
            }

            if dominated {
                rejected.push(candidate);
            } else {
                selected.push(candidate);
            }
        }

        for candidate in rejected {
            if selected.len() >= max_connections {
                break;
            }
            selected.push(candidate);
        }

        Ok(selected.into_iter().map(|c| c.slot).collect())
    }

    /// Re-apply the selection heuristic to a node whose neighbor list
    /// exceeds its cap, pruning it back down.
    fn prune_neighbors(&mut self, slot: u32, layer: usize) -> Result<()> {
        let max_connections = self.config.max_connections(layer);
        let node = &self.nodes[slot as usize];
        if node.neighbors_at(layer).len() <= max_connections {
            return Ok(());
        }

        let target = node.vector.data.clone();
        let mut candidates = Vec::with_capacity(node.neighbors_at(layer).len());
        for &neighbor in node.neighbors_at(layer) {
            let distance = self.dist(&target, &self.nodes[neighbor as usize].vector.data)?;
            candidates.push(Candidate {
                distance,
                slot: neighbor,
            });
        }
        candidates.sort();

        let pruned = self.select_neighbors(&candidates, max_connections)?;
        self.nodes[slot as usize].neighbors[layer] = pruned;
        Ok(())
    }

    /// Connect a freshly inserted node to the graph, layer by layer.
    fn link_node(&mut self, new_slot: u32, level: usize) -> Result<()> {
        let entry = match self.entry_point {
            Some(entry) if entry != new_slot => entry,
            _ => return Ok(()),
        };
        let query = self.nodes[new_slot as usize].vector.data.clone();

        // Greedy descent through the layers above the insertion level.
        let mut current = entry;
        for layer in (level + 1..=self.top_layer).rev() {
            current = self.greedy_closest(&query, current, layer)?;
        }

        // Beam-search, select, and connect from the insertion level down.
        for layer in (0..=level.min(self.top_layer)).rev() {
            let candidates =
                self.search_layer(&query, current, self.config.ef_construction, layer, false)?;
            if candidates.is_empty() {
                continue;
            }
            current = candidates[0].slot;

            let max_connections = self.config.max_connections(layer);
            let selected = self.select_neighbors(&candidates, max_connections)?;

            self.nodes[new_slot as usize].neighbors[layer] = selected.clone();
            for neighbor in selected {
                self.nodes[neighbor as usize].neighbors[layer].push(new_slot);
                self.prune_neighbors(neighbor, layer)?;
            }
        }

        Ok(())
    }

    /// Access for the persistence codec.
    pub(crate) fn nodes(&self) -> &[HnswNode] {
        &self.nodes
    }

    pub(crate) fn entry_point(&self) -> Option<u32> {
        self.entry_point
    }

    /// Reconstruct an index from persisted parts. The codec has already
    /// validated structural consistency.
    pub(crate) fn from_parts(
        config: HnswConfig,
        nodes: Vec<HnswNode>,
        entry_point: Option<u32>,
    ) -> Result<Self> {
        config.validate()?;

        let mut id_to_slot = AHashMap::with_capacity(nodes.len());
        let mut top_layer = 0;
        let mut deleted = 0;
        for (slot, node) in nodes.iter().enumerate() {
            id_to_slot.insert(node.id, slot as u32);
            top_layer = top_layer.max(node.top_layer());
            if node.deleted {
                deleted += 1;
            }
        }

        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            nodes,
            id_to_slot,
            entry_point,
            top_layer,
            rng,
            deleted,
        })
    }
}

impl VectorIndex for HnswIndex {
    fn add(&mut self, id: u64, vector: Vector) -> Result<()> {
        vector.validate_dimension(self.config.dimension)?;
        if !vector.is_valid() {
            return Err(ProximaError::invalid_argument(format!(
                "Vector {id} contains NaN or infinite values"
            )));
        }
        if self.id_to_slot.contains_key(&id) {
            return Err(ProximaError::DuplicateId(id));
        }

        let level = self.draw_layer();
        let new_slot = self.nodes.len() as u32;
        self.nodes.push(HnswNode::new(id, vector, level));
        self.id_to_slot.insert(id, new_slot);

        if self.entry_point.is_none() {
            self.entry_point = Some(new_slot);
            self.top_layer = level;
            return Ok(());
        }

        self.link_node(new_slot, level)?;

        if level > self.top_layer {
            self.top_layer = level;
            self.entry_point = Some(new_slot);
        }

        Ok(())
    }

    fn search(&self, query: &[f32], k: usize, ef: Option<usize>) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Err(ProximaError::invalid_argument("k must be > 0"));
        }
        if query.len() != self.config.dimension {
            return Err(ProximaError::DimensionMismatch {
                expected: self.config.dimension,
                actual: query.len(),
            });
        }
        if !query.iter().all(|x| x.is_finite()) {
            return Err(ProximaError::invalid_argument(
                "Query vector contains NaN or infinite values",
            ));
        }

        let ef = match ef {
            Some(ef) if ef < k => {
                return Err(ProximaError::invalid_argument(format!(
                    "ef ({ef}) must be >= k ({k})"
                )));
            }
            Some(ef) => ef,
            None => self.config.ef_search.max(k),
        };

        if self.is_empty() {
            return Ok(Vec::new());
        }
        let entry = match self.entry_point {
            Some(entry) => entry,
            None => return Ok(Vec::new()),
        };

        let mut current = entry;
        for layer in (1..=self.top_layer).rev() {
            current = self.greedy_closest(query, current, layer)?;
        }

        let candidates = self.search_layer(query, current, ef, 0, true)?;

        let mut hits: Vec<SearchHit> = candidates
            .into_iter()
            .map(|candidate| SearchHit {
                id: self.nodes[candidate.slot as usize].id,
                distance: candidate.distance,
            })
            .collect();
        hits.sort_by(|a, b| a.cmp_by_distance(b));
        hits.truncate(k);
        Ok(hits)
    }

    fn remove(&mut self, id: u64) -> Result<()> {
        let slot = match self.id_to_slot.get(&id) {
            Some(&slot) => slot,
            None => return Err(ProximaError::NotFound(id)),
        };
        if self.nodes[slot as usize].deleted {
            return Err(ProximaError::NotFound(id));
        }

        self.nodes[slot as usize].deleted = true;
        self.deleted += 1;
        Ok(())
    }

    fn len(&self) -> usize {
        self.nodes.len() - self.deleted
    }

    fn deleted_count(&self) -> usize {
        self.deleted
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn distance_metric(&self) -> DistanceMetric {
        self.config.distance_metric
    }

    fn save(&self, output: &mut dyn Write) -> Result<()> {
        codec::save_hnsw(self, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(dimension: usize) -> HnswConfig {
        HnswConfig::new(dimension)
            .with_m(8)
            .with_ef_construction(32)
            .with_distance_metric(DistanceMetric::Euclidean)
    }

    #[test]
    fn test_config_defaults() {
        let config = HnswConfig::new(128);
        assert_eq!(config.dimension, 128);
        assert_eq!(config.m, 16);
        assert_eq!(config.ef_construction, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = HnswConfig::new(0);
        assert!(config.validate().is_err());

        config.dimension = 128;
        config.m = 1;
        assert!(config.validate().is_err());

        config.m = 16;
        config.ef_construction = 8; // Less than M
        assert!(config.validate().is_err());

        config.ef_construction = 200;
        config.ef_search = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_layer_0_allows_double_connections() {
        let config = HnswConfig::new(4);
        assert_eq!(config.max_connections(0), 32);
        assert_eq!(config.max_connections(1), 16);
    }

    #[test]
    fn test_empty_index_search() {
        let index = HnswIndex::with_dimension(4).unwrap();
        assert!(index.is_empty());
        let hits = index.search(&[0.0; 4], 5, None).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_add_and_self_search() {
        let mut index = HnswIndex::new(small_config(3)).unwrap();
        index.add(1, Vector::new(vec![1.0, 2.0, 3.0])).unwrap();
        index.add(2, Vector::new(vec![-1.0, 0.5, 0.0])).unwrap();

        let hits = index.search(&[1.0, 2.0, 3.0], 1, None).unwrap();
        assert_eq!(hits[0].id, 1);
        assert!(hits[0].distance.abs() < 1e-6);
    }

    #[test]
    fn test_duplicate_id() {
        let mut index = HnswIndex::new(small_config(2)).unwrap();
        index.add(1, Vector::new(vec![1.0, 0.0])).unwrap();
        let err = index.add(1, Vector::new(vec![0.0, 1.0])).unwrap_err();
        assert!(matches!(err, ProximaError::DuplicateId(1)));
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = HnswIndex::new(small_config(2)).unwrap();
        assert!(matches!(
            index.add(1, Vector::new(vec![1.0])).unwrap_err(),
            ProximaError::DimensionMismatch { .. }
        ));

        index.add(1, Vector::new(vec![1.0, 0.0])).unwrap();
        assert!(matches!(
            index.search(&[1.0], 1, None).unwrap_err(),
            ProximaError::DimensionMismatch { .. }
        ));
    }

    #[test]
    fn test_invalid_search_params() {
        let mut index = HnswIndex::new(small_config(2)).unwrap();
        index.add(1, Vector::new(vec![1.0, 0.0])).unwrap();

        assert!(index.search(&[1.0, 0.0], 0, None).is_err());
        // Explicit ef below k fails fast.
        assert!(index.search(&[1.0, 0.0], 5, Some(2)).is_err());
        // Default ef is raised to k.
        assert!(index.search(&[1.0, 0.0], 100, None).is_ok());
    }

    #[test]
    fn test_remove_tombstones_node() {
        let mut index = HnswIndex::new(small_config(2)).unwrap();
        index.add(1, Vector::new(vec![1.0, 0.0])).unwrap();
        index.add(2, Vector::new(vec![0.9, 0.1])).unwrap();
        index.add(3, Vector::new(vec![0.0, 1.0])).unwrap();

        index.remove(1).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.deleted_count(), 1);

        let hits = index.search(&[1.0, 0.0], 3, None).unwrap();
        assert!(hits.iter().all(|hit| hit.id != 1));
        assert_eq!(hits[0].id, 2);
    }

    #[test]
    fn test_remove_twice_is_not_found() {
        let mut index = HnswIndex::new(small_config(2)).unwrap();
        index.add(1, Vector::new(vec![1.0, 0.0])).unwrap();
        index.remove(1).unwrap();
        assert!(matches!(
            index.remove(1).unwrap_err(),
            ProximaError::NotFound(1)
        ));
        assert!(matches!(
            index.remove(99).unwrap_err(),
            ProximaError::NotFound(99)
        ));
    }

    #[test]
    fn test_removed_id_is_not_reused() {
        let mut index = HnswIndex::new(small_config(2)).unwrap();
        index.add(1, Vector::new(vec![1.0, 0.0])).unwrap();
        index.remove(1).unwrap();
        // The tombstoned node may still be referenced by graph edges, so
        // the id stays reserved until compaction.
        assert!(matches!(
            index.add(1, Vector::new(vec![0.0, 1.0])).unwrap_err(),
            ProximaError::DuplicateId(1)
        ));
    }

    #[test]
    fn test_compact_purges_tombstones() {
        let mut index = HnswIndex::new(small_config(2)).unwrap();
        for i in 0..20u64 {
            let angle = i as f32 * 0.3;
            index
                .add(i, Vector::new(vec![angle.cos(), angle.sin()]))
                .unwrap();
        }
        for i in 0..10u64 {
            index.remove(i).unwrap();
        }
        assert_eq!(index.deleted_count(), 10);

        index.compact().unwrap();
        assert_eq!(index.len(), 10);
        assert_eq!(index.deleted_count(), 0);

        let hits = index.search(&[(10.0f32 * 0.3).cos(), (10.0f32 * 0.3).sin()], 1, None).unwrap();
        assert_eq!(hits[0].id, 10);
    }

    #[test]
    fn test_determinism_under_fixed_seed() {
        let build = || {
            let mut index = HnswIndex::new(small_config(4).with_seed(7)).unwrap();
            for i in 0..50u64 {
                let x = i as f32;
                index
                    .add(i, Vector::new(vec![x.sin(), x.cos(), (x * 0.5).sin(), 1.0]))
                    .unwrap();
            }
            index
        };

        let a = build();
        let b = build();
        let query = [0.2, 0.8, 0.1, 1.0];
        assert_eq!(a.search(&query, 5, None).unwrap(), b.search(&query, 5, None).unwrap());
    }

    #[test]
    fn test_neighbor_caps_respected() {
        let config = small_config(2);
        let mut index = HnswIndex::new(config.clone()).unwrap();
        for i in 0..200u64 {
            let angle = i as f32 * 0.05;
            index
                .add(i, Vector::new(vec![angle.cos(), angle.sin()]))
                .unwrap();
        }

        for node in index.nodes() {
            for (layer, neighbors) in node.neighbors.iter().enumerate() {
                assert!(neighbors.len() <= config.max_connections(layer));
            }
        }
    }

    #[test]
    fn test_all_vectors_reachable() {
        let mut index = HnswIndex::new(small_config(2)).unwrap();
        for i in 0..100u64 {
            let angle = i as f32 * 0.1;
            index
                .add(i, Vector::new(vec![angle.cos(), angle.sin()]))
                .unwrap();
        }

        // A wide-open search over a small collection should surface
        // every live vector.
        let hits = index.search(&[1.0, 0.0], 100, Some(200)).unwrap();
        assert_eq!(hits.len(), 100);
    }
}
