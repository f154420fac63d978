//! Shared weighted graph and shortest-path queries
//!
//! Every agent builds its own copy of the graph from the shared seed. Graph
//! agreement across agents rests entirely on [`Graph::build`] being a pure
//! function of `(num_nodes, seed)`, so the generator is a portable
//! `ChaCha8Rng` and edges are drawn in a fixed order.

use crate::error::{MtspError, Result};
use ordered_float::OrderedFloat;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Node identifier (`0..num_nodes`)
pub type NodeId = usize;

/// Smallest edge weight produced by [`Graph::build`] (inclusive)
pub const MIN_WEIGHT: u32 = 10;

/// Largest edge weight produced by [`Graph::build`] (exclusive)
pub const MAX_WEIGHT: u32 = 100;

/// Distance reported for a node that cannot be reached
pub const UNREACHABLE: f64 = f64::INFINITY;

/// Undirected weighted graph stored as adjacency lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    adjacency: Vec<Vec<(NodeId, f64)>>,
}

impl Graph {
    /// Build the complete graph over `0..num_nodes` for a seed.
    ///
    /// Weights are integers in `[MIN_WEIGHT, MAX_WEIGHT)`, drawn for every
    /// pair `i < j` in ascending order, so `weight(i, j)` only depends on
    /// `(seed, min(i, j), max(i, j))`.
    pub fn build(num_nodes: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut adjacency = vec![Vec::with_capacity(num_nodes.saturating_sub(1)); num_nodes];

        for i in 0..num_nodes {
            for j in (i + 1)..num_nodes {
                let weight = f64::from(rng.gen_range(MIN_WEIGHT..MAX_WEIGHT));
                adjacency[i].push((j, weight));
                adjacency[j].push((i, weight));
            }
        }

        Self { adjacency }
    }

    /// Build a graph from an explicit undirected edge list.
    ///
    /// Used for graphs that are not complete. Weights must be finite and
    /// non-negative; a repeated edge keeps the last weight given.
    pub fn from_edges(num_nodes: usize, edges: &[(NodeId, NodeId, f64)]) -> Result<Self> {
        let mut adjacency: Vec<Vec<(NodeId, f64)>> = vec![Vec::new(); num_nodes];

        for &(a, b, weight) in edges {
            for node in [a, b] {
                if node >= num_nodes {
                    return Err(MtspError::InvalidNode { node, num_nodes });
                }
            }
            if a == b {
                return Err(MtspError::Graph(format!("self-loop on node {}", a)));
            }
            if !weight.is_finite() || weight < 0.0 {
                return Err(MtspError::Graph(format!(
                    "edge {}-{} has invalid weight {}",
                    a, b, weight
                )));
            }

            adjacency[a].retain(|&(n, _)| n != b);
            adjacency[b].retain(|&(n, _)| n != a);
            adjacency[a].push((b, weight));
            adjacency[b].push((a, weight));
        }

        Ok(Self { adjacency })
    }

    /// Number of vertices
    pub fn num_nodes(&self) -> usize {
        self.adjacency.len()
    }

    /// Direct edge weight between two nodes, if an edge exists
    pub fn weight(&self, a: NodeId, b: NodeId) -> Option<f64> {
        self.adjacency
            .get(a)?
            .iter()
            .find(|&&(n, _)| n == b)
            .map(|&(_, w)| w)
    }

    /// Every edge once, as `(min, max, weight)` ordered by `(min, max)`
    pub fn edges(&self) -> Vec<(NodeId, NodeId, f64)> {
        let mut edges: Vec<_> = self
            .adjacency
            .iter()
            .enumerate()
            .flat_map(|(a, neighbours)| {
                neighbours
                    .iter()
                    .filter(move |&&(b, _)| a < b)
                    .map(move |&(b, w)| (a, b, w))
            })
            .collect();
        edges.sort_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));
        edges
    }

    /// Shortest-path distance from `src` to `dst` (Dijkstra).
    ///
    /// Returns `0.0` for `src == dst` without touching the graph and
    /// [`UNREACHABLE`] when no path exists. The search stops as soon as
    /// `dst` is settled.
    pub fn shortest_path(&self, src: NodeId, dst: NodeId) -> Result<f64> {
        self.check_node(src)?;
        self.check_node(dst)?;

        if src == dst {
            return Ok(0.0);
        }

        let mut dist = vec![UNREACHABLE; self.num_nodes()];
        let mut heap = BinaryHeap::new();
        dist[src] = 0.0;
        heap.push(Reverse((OrderedFloat(0.0), src)));

        while let Some(Reverse((OrderedFloat(d), node))) = heap.pop() {
            if node == dst {
                return Ok(d);
            }
            // Stale heap entry
            if d > dist[node] {
                continue;
            }

            for &(next, weight) in &self.adjacency[node] {
                let candidate = d + weight;
                if candidate < dist[next] {
                    dist[next] = candidate;
                    heap.push(Reverse((OrderedFloat(candidate), next)));
                }
            }
        }

        Ok(UNREACHABLE)
    }

    fn check_node(&self, node: NodeId) -> Result<()> {
        if node < self.num_nodes() {
            Ok(())
        } else {
            Err(MtspError::InvalidNode {
                node,
                num_nodes: self.num_nodes(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_is_deterministic() {
        let a = Graph::build(12, 42);
        let b = Graph::build(12, 42);
        assert_eq!(a, b);
        assert_eq!(a.edges(), b.edges());
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = Graph::build(12, 1);
        let b = Graph::build(12, 2);
        assert_ne!(a.edges(), b.edges());
    }

    #[test]
    fn test_complete_symmetric_and_in_range() {
        let graph = Graph::build(9, 7);
        assert_eq!(graph.edges().len(), 9 * 8 / 2);

        for i in 0..9 {
            for j in 0..9 {
                if i == j {
                    assert_eq!(graph.weight(i, j), None);
                    continue;
                }
                let w = graph.weight(i, j).expect("complete graph");
                assert_eq!(Some(w), graph.weight(j, i));
                assert!(w >= f64::from(MIN_WEIGHT) && w < f64::from(MAX_WEIGHT));
                assert_eq!(w.fract(), 0.0);
            }
        }
    }

    #[test]
    fn test_shortest_path_same_node_is_zero() {
        let graph = Graph::build(5, 3);
        assert_eq!(graph.shortest_path(4, 4).unwrap(), 0.0);
    }

    #[test]
    fn test_shortest_path_prefers_detour() {
        let graph = Graph::from_edges(3, &[(0, 1, 10.0), (1, 2, 10.0), (0, 2, 50.0)]).unwrap();
        assert_eq!(graph.shortest_path(0, 2).unwrap(), 20.0);
        assert_eq!(graph.shortest_path(2, 0).unwrap(), 20.0);
    }

    #[test]
    fn test_shortest_path_never_exceeds_direct_edge() {
        let graph = Graph::build(8, 99);
        for (a, b, w) in graph.edges() {
            assert!(graph.shortest_path(a, b).unwrap() <= w);
        }
    }

    #[test]
    fn test_unreachable_is_infinite() {
        let graph = Graph::from_edges(4, &[(0, 1, 12.0)]).unwrap();
        assert_eq!(graph.shortest_path(0, 3).unwrap(), UNREACHABLE);
        assert!(graph.shortest_path(0, 3).unwrap().is_infinite());
    }

    #[test]
    fn test_invalid_node_is_error() {
        let graph = Graph::build(3, 1);
        assert!(matches!(
            graph.shortest_path(0, 3),
            Err(MtspError::InvalidNode { node: 3, num_nodes: 3 })
        ));
    }

    #[test]
    fn test_from_edges_rejects_bad_input() {
        assert!(Graph::from_edges(2, &[(0, 2, 1.0)]).is_err());
        assert!(Graph::from_edges(2, &[(1, 1, 1.0)]).is_err());
        assert!(Graph::from_edges(2, &[(0, 1, -1.0)]).is_err());
        assert!(Graph::from_edges(2, &[(0, 1, f64::NAN)]).is_err());
    }

    #[test]
    fn test_from_edges_replaces_duplicate_edge() {
        let graph = Graph::from_edges(2, &[(0, 1, 30.0), (1, 0, 15.0)]).unwrap();
        assert_eq!(graph.weight(0, 1), Some(15.0));
        assert_eq!(graph.edges().len(), 1);
    }
}
