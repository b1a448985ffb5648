//! Build dependency graph.
//!
//! # Overview
//!
//! Nodes are file paths. An arc `A → B` means "A is consumed to help produce
//! B". Every log record with N inputs (headers included) and one output
//! contributes up to N arcs, all tagged with the record's rule and a shared
//! step index so a path can report which production step each hop used and
//! which sibling inputs it consumed.
//!
//! ## Pipeline
//!
//! ```text
//! build_log.json
//!        ↓  record::read_log() + record::normalize_record()
//! EdgeRecord stream
//!        ↓  build::GraphBuilder
//! BuildGraph (acyclic, immutable)
//!        ↓  stats::GraphStats::from_graph()
//! GraphStats (node/arc counts, roles, fan-in/out, …)
//! ```
//!
//! ## Ordering
//!
//! Node indices and arc indices follow insertion order, and every adjacency
//! list exposed here is sorted by arc index, so two builds over the same
//! records are indistinguishable.

pub mod build;
pub mod cycles;
pub mod stats;

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

pub use build::{GraphBuilder, build_graph, build_graph_from_log};
pub use cycles::find_cycle;
pub use stats::GraphStats;

// ---------------------------------------------------------------------------
// Arc and step metadata
// ---------------------------------------------------------------------------

/// Label carried by every arc.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcInfo {
    /// Rule of the production step that introduced this arc.
    pub rule: String,
    /// Index into [`BuildGraph::steps`].
    pub step: usize,
    /// The input came from the record's `headers` list rather than `inputs`.
    pub via_header: bool,
}

/// One production step as it entered the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionStep {
    /// Position of the originating record in the log.
    pub record: usize,
    /// Rule label of the record.
    pub rule: String,
    /// The file the step produced.
    pub output: String,
    /// Inputs then headers, duplicates removed, first occurrence wins.
    pub inputs: Vec<String>,
}

/// Structural role of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// Leaf consumed through at least one `inputs` list, or never consumed.
    Source,
    /// Leaf consumed only through `headers` lists.
    Header,
    /// Produced and later consumed.
    Intermediate,
    /// Produced and never consumed.
    Target,
}

// ---------------------------------------------------------------------------
// BuildGraph
// ---------------------------------------------------------------------------

/// An acyclic build graph.
///
/// Only [`GraphBuilder`] and the cache decoder construct one, and both run
/// the cycle check first. No mutating method exists, so a `&BuildGraph`
/// can be shared freely between threads.
#[derive(Debug, Clone)]
pub struct BuildGraph {
    graph: DiGraph<String, ArcInfo>,
    node_map: HashMap<String, NodeIndex>,
    steps: Vec<ProductionStep>,
}

impl BuildGraph {
    /// Wrap an already cycle-checked petgraph graph.
    pub(crate) const fn from_parts(
        graph: DiGraph<String, ArcInfo>,
        node_map: HashMap<String, NodeIndex>,
        steps: Vec<ProductionStep>,
    ) -> Self {
        Self {
            graph,
            node_map,
            steps,
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn arc_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.node_map.contains_key(name)
    }

    #[must_use]
    pub fn node_index(&self, name: &str) -> Option<NodeIndex> {
        self.node_map.get(name).copied()
    }

    /// Return the path label for a node.
    #[must_use]
    pub fn node_name(&self, idx: NodeIndex) -> Option<&str> {
        self.graph.node_weight(idx).map(String::as_str)
    }

    /// Node names in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(String::as_str)
    }

    /// Every arc as `(input, output, info)`, in insertion order.
    pub fn arcs(&self) -> impl Iterator<Item = (&str, &str, &ArcInfo)> {
        self.graph.edge_references().map(|edge| {
            (
                self.graph[edge.source()].as_str(),
                self.graph[edge.target()].as_str(),
                edge.weight(),
            )
        })
    }

    /// Production steps in log order (filtered records excluded).
    #[must_use]
    pub fn steps(&self) -> &[ProductionStep] {
        &self.steps
    }

    #[must_use]
    pub fn step(&self, step: usize) -> Option<&ProductionStep> {
        self.steps.get(step)
    }

    /// Look up the arc `input → output`.
    #[must_use]
    pub fn arc(&self, input: &str, output: &str) -> Option<&ArcInfo> {
        let from = self.node_index(input)?;
        let to = self.node_index(output)?;
        self.graph
            .find_edge(from, to)
            .and_then(|edge| self.graph.edge_weight(edge))
    }

    /// Whether `name` has no incoming arcs.
    #[must_use]
    pub fn is_leaf(&self, name: &str) -> bool {
        self.node_index(name)
            .is_some_and(|idx| self.has_no_arcs(idx, Direction::Incoming))
    }

    /// Whether `name` has no outgoing arcs.
    #[must_use]
    pub fn is_sink(&self, name: &str) -> bool {
        self.node_index(name)
            .is_some_and(|idx| self.has_no_arcs(idx, Direction::Outgoing))
    }

    /// Structural role of `name`, or `None` if it is not in the graph.
    #[must_use]
    pub fn role(&self, name: &str) -> Option<NodeRole> {
        self.node_index(name).map(|idx| self.role_of(idx))
    }

    pub(crate) fn role_of(&self, idx: NodeIndex) -> NodeRole {
        if self.has_no_arcs(idx, Direction::Incoming) {
            let mut consumers = self.graph.edges_directed(idx, Direction::Outgoing).peekable();
            if consumers.peek().is_some() && consumers.all(|edge| edge.weight().via_header) {
                NodeRole::Header
            } else {
                NodeRole::Source
            }
        } else if self.has_no_arcs(idx, Direction::Outgoing) {
            NodeRole::Target
        } else {
            NodeRole::Intermediate
        }
    }

    pub(crate) fn has_no_arcs(&self, idx: NodeIndex, dir: Direction) -> bool {
        self.graph.edges_directed(idx, dir).next().is_none()
    }

    /// Arcs touching `idx` in direction `dir`, sorted by insertion order.
    ///
    /// Each entry is `(arc, neighbor)`.
    pub(crate) fn adjacent(&self, idx: NodeIndex, dir: Direction) -> Vec<(EdgeIndex, NodeIndex)> {
        ordered_adjacent(&self.graph, idx, dir)
    }

    pub(crate) fn arc_info(&self, edge: EdgeIndex) -> Option<&ArcInfo> {
        self.graph.edge_weight(edge)
    }

    pub(crate) fn arc_endpoints(&self, edge: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.graph.edge_endpoints(edge)
    }

    pub(crate) const fn inner(&self) -> &DiGraph<String, ArcInfo> {
        &self.graph
    }
}

/// Neighbors of `idx` in direction `dir`, sorted by arc index.
///
/// petgraph yields adjacency newest-first; sorting restores insertion order.
pub(crate) fn ordered_adjacent<N, E>(
    graph: &DiGraph<N, E>,
    idx: NodeIndex,
    dir: Direction,
) -> Vec<(EdgeIndex, NodeIndex)> {
    let mut adjacent: Vec<(EdgeIndex, NodeIndex)> = graph
        .edges_directed(idx, dir)
        .map(|edge| {
            let neighbor = match dir {
                Direction::Outgoing => edge.target(),
                Direction::Incoming => edge.source(),
            };
            (edge.id(), neighbor)
        })
        .collect();
    adjacent.sort_unstable_by_key(|(edge, _)| *edge);
    adjacent
}
