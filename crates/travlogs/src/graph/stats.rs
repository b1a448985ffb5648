//! Summary statistics for a build graph.
//!
//! # Statistics Provided
//!
//! - **node_count** / **arc_count** / **step_count**: sizes of the graph and
//!   of the production steps that entered it.
//! - **sources**, **headers**, **intermediates**, **targets**: node counts
//!   per [`NodeRole`].
//! - **max_fan_in**: most arcs entering one node (the widest link step).
//! - **max_fan_out**: most arcs leaving one node (the most widely included
//!   header, typically).
//! - **weakly_connected_component_count**: a value greater than 1 means the
//!   log describes several independent builds.

use petgraph::Direction;
use petgraph::algo::connected_components;
use serde::Serialize;

use crate::graph::{BuildGraph, NodeRole};

/// Summary statistics for a [`BuildGraph`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    /// Distinct files in the graph.
    pub node_count: usize,
    /// Arcs after deduplication.
    pub arc_count: usize,
    /// Records that passed the rule filter.
    pub step_count: usize,
    /// Nodes with role [`NodeRole::Source`].
    pub sources: usize,
    /// Nodes with role [`NodeRole::Header`].
    pub headers: usize,
    /// Nodes with role [`NodeRole::Intermediate`].
    pub intermediates: usize,
    /// Nodes with role [`NodeRole::Target`].
    pub targets: usize,
    /// Largest in-degree of any node.
    pub max_fan_in: usize,
    /// Largest out-degree of any node.
    pub max_fan_out: usize,
    /// Weakly connected components; 0 for an empty graph.
    pub weakly_connected_component_count: usize,
}

impl GraphStats {
    #[must_use]
    pub fn from_graph(graph: &BuildGraph) -> Self {
        let inner = graph.inner();
        let mut stats = Self {
            node_count: graph.node_count(),
            arc_count: graph.arc_count(),
            step_count: graph.steps().len(),
            weakly_connected_component_count: connected_components(inner),
            ..Self::default()
        };

        for idx in inner.node_indices() {
            match graph.role_of(idx) {
                NodeRole::Source => stats.sources += 1,
                NodeRole::Header => stats.headers += 1,
                NodeRole::Intermediate => stats.intermediates += 1,
                NodeRole::Target => stats.targets += 1,
            }

            let fan_in = inner.edges_directed(idx, Direction::Incoming).count();
            let fan_out = inner.edges_directed(idx, Direction::Outgoing).count();
            stats.max_fan_in = stats.max_fan_in.max(fan_in);
            stats.max_fan_out = stats.max_fan_out.max(fan_out);
        }

        stats
    }

    /// Number of leaves (sources plus headers).
    #[must_use]
    pub const fn leaf_count(&self) -> usize {
        self.sources + self.headers
    }
}
