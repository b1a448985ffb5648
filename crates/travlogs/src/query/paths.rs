//! Concrete dependency paths.
//!
//! A [`DependencyPath`] explains why `end` is reachable from `start`: each
//! [`Hop`] is a real arc of the graph, and consecutive hops share a node.
//! For a backward query (`start` is a target) the hops lead from the target
//! down to a leaf; for a forward query they lead from a source up to a sink.

use petgraph::graph::EdgeIndex;
use serde::Serialize;

use crate::graph::BuildGraph;

/// One arc of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Hop {
    /// File consumed by the step.
    pub input: String,
    /// File produced by the step.
    pub output: String,
    pub rule: String,
    /// Index of the production step, see [`BuildGraph::step`].
    pub step: usize,
}

/// A chain of arcs from `start` to `end`.
///
/// `hops` is empty when `start == end`, i.e. the requested node is itself a
/// leaf (backward) or a sink (forward).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DependencyPath {
    pub start: String,
    pub end: String,
    pub hops: Vec<Hop>,
}

impl DependencyPath {
    /// Node sequence from `start` to `end`, both included.
    #[must_use]
    pub fn nodes(&self) -> Vec<&str> {
        let mut nodes = vec![self.start.as_str()];
        for hop in &self.hops {
            let current = nodes.last().copied().unwrap_or_default();
            let next = if hop.output == current {
                hop.input.as_str()
            } else {
                hop.output.as_str()
            };
            nodes.push(next);
        }
        nodes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// Check that every hop is an arc of `graph` with the recorded rule and
    /// that the hops form one connected chain from `start` to `end`.
    #[must_use]
    pub fn is_valid_in(&self, graph: &BuildGraph) -> bool {
        let all_arcs_exist = self.hops.iter().all(|hop| {
            graph
                .arc(&hop.input, &hop.output)
                .is_some_and(|info| info.rule == hop.rule && info.step == hop.step)
        });
        if !all_arcs_exist {
            return false;
        }

        let mut current = self.start.as_str();
        for hop in &self.hops {
            current = if hop.output == current {
                hop.input.as_str()
            } else if hop.input == current {
                hop.output.as_str()
            } else {
                return false;
            };
        }
        current == self.end
    }
}

/// Turn a list of arc indices into hops.
pub(crate) fn hops_from_arcs(graph: &BuildGraph, arcs: &[EdgeIndex]) -> Vec<Hop> {
    arcs.iter()
        .filter_map(|&edge| {
            let (from, to) = graph.arc_endpoints(edge)?;
            let info = graph.arc_info(edge)?;
            Some(Hop {
                input: graph.node_name(from)?.to_string(),
                output: graph.node_name(to)?.to_string(),
                rule: info.rule.clone(),
                step: info.step,
            })
        })
        .collect()
}
