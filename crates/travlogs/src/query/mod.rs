//! Directional queries over a [`BuildGraph`].
//!
//! | Operation                      | Walks           | Reports           |
//! |--------------------------------|-----------------|-------------------|
//! | [`find_sources_from_targets`]  | incoming arcs   | leaves reached    |
//! | [`find_targets_from_sources`]  | outgoing arcs   | sinks reached     |
//! | [`find_paths_from_targets`]    | incoming arcs   | one path per leaf |
//! | [`find_paths_from_sources`]    | outgoing arcs   | one path per sink |
//!
//! Every requested name is validated before any traversal starts, so a
//! query either fails with the complete list of unknown names or runs in
//! full. A start node that is itself a leaf (backward) or sink (forward)
//! reports itself, with an empty path.

mod paths;
mod walk;

use std::collections::{BTreeSet, HashSet};

use petgraph::Direction;
use petgraph::graph::NodeIndex;

use crate::error::{Error, Result};
use crate::graph::BuildGraph;

pub use paths::{DependencyPath, Hop};
use walk::Walk;

// ---------------------------------------------------------------------------
// NodeFilter
// ---------------------------------------------------------------------------

/// Restricts which endpoints a query reports.
///
/// Filters never change validation or traversal; an endpoint that fails a
/// filter is simply left out of the answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeFilter {
    /// Keep endpoints whose path starts with the prefix.
    Prefix(String),
    /// Keep endpoints whose path ends with the suffix (e.g. `.c`).
    Suffix(String),
    /// Keep only the named endpoint.
    Exact(String),
}

impl NodeFilter {
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Prefix(prefix) => name.starts_with(prefix.as_str()),
            Self::Suffix(suffix) => name.ends_with(suffix.as_str()),
            Self::Exact(exact) => name == exact.as_str(),
        }
    }
}

// ---------------------------------------------------------------------------
// QueryEngine
// ---------------------------------------------------------------------------

/// Query handle over a borrowed graph.
#[derive(Debug, Clone)]
pub struct QueryEngine<'g> {
    graph: &'g BuildGraph,
    filters: Vec<NodeFilter>,
}

impl<'g> QueryEngine<'g> {
    #[must_use]
    pub const fn new(graph: &'g BuildGraph) -> Self {
        Self {
            graph,
            filters: Vec::new(),
        }
    }

    /// Add an endpoint filter. An endpoint is reported only if it passes
    /// every filter.
    #[must_use]
    pub fn with_filter(mut self, filter: NodeFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Leaves reachable backward from `targets`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNamesNotInGraph`] naming every unknown target.
    pub fn sources_from_targets<S: AsRef<str>>(&self, targets: &[S]) -> Result<BTreeSet<String>> {
        self.reached(targets, Direction::Incoming)
    }

    /// Sinks reachable forward from `sources`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNamesNotInGraph`] naming every unknown source.
    pub fn targets_from_sources<S: AsRef<str>>(&self, sources: &[S]) -> Result<BTreeSet<String>> {
        self.reached(sources, Direction::Outgoing)
    }

    /// One path from each target to each leaf it reaches.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNamesNotInGraph`] naming every unknown target.
    pub fn paths_from_targets<S: AsRef<str>>(&self, targets: &[S]) -> Result<Vec<DependencyPath>> {
        self.paths(targets, Direction::Incoming)
    }

    /// One path from each source to each sink it reaches.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNamesNotInGraph`] naming every unknown source.
    pub fn paths_from_sources<S: AsRef<str>>(&self, sources: &[S]) -> Result<Vec<DependencyPath>> {
        self.paths(sources, Direction::Outgoing)
    }

    fn reached<S: AsRef<str>>(&self, names: &[S], direction: Direction) -> Result<BTreeSet<String>> {
        let starts = self.resolve(names)?;
        let mut reached = BTreeSet::new();

        for start in starts {
            let walk = Walk::run(self.graph, start, direction);
            reached.extend(
                walk.endpoints(self.graph)
                    .filter_map(|idx| self.graph.node_name(idx))
                    .filter(|name| self.keeps(name))
                    .map(str::to_string),
            );
        }

        Ok(reached)
    }

    fn paths<S: AsRef<str>>(&self, names: &[S], direction: Direction) -> Result<Vec<DependencyPath>> {
        let starts = self.resolve(names)?;
        let mut all = Vec::new();

        for start in starts {
            let walk = Walk::run(self.graph, start, direction);
            let Some(start_name) = self.graph.node_name(start) else {
                continue;
            };

            let mut found: Vec<DependencyPath> = walk
                .endpoints(self.graph)
                .filter_map(|end| {
                    let end_name = self.graph.node_name(end)?;
                    self.keeps(end_name).then(|| DependencyPath {
                        start: start_name.to_string(),
                        end: end_name.to_string(),
                        hops: paths::hops_from_arcs(self.graph, &walk.arcs_to(end)),
                    })
                })
                .collect();
            found.sort_by(|a, b| a.end.cmp(&b.end));
            all.extend(found);
        }

        Ok(all)
    }

    /// Map names to node indices, deduplicated, in request order.
    fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<NodeIndex>> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut starts = Vec::with_capacity(names.len());
        let mut unknown = Vec::new();

        for name in names {
            let name = name.as_ref();
            if !seen.insert(name) {
                continue;
            }
            match self.graph.node_index(name) {
                Some(idx) => starts.push(idx),
                None => unknown.push(name.to_string()),
            }
        }

        if unknown.is_empty() {
            Ok(starts)
        } else {
            Err(Error::NodeNamesNotInGraph { names: unknown })
        }
    }

    fn keeps(&self, name: &str) -> bool {
        self.filters.iter().all(|filter| filter.matches(name))
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Leaves (sources and headers) that `targets` are built from.
///
/// # Errors
///
/// Returns [`Error::NodeNamesNotInGraph`] naming every unknown target.
pub fn find_sources_from_targets<S: AsRef<str>>(
    graph: &BuildGraph,
    targets: &[S],
) -> Result<BTreeSet<String>> {
    QueryEngine::new(graph).sources_from_targets(targets)
}

/// Sinks (final artifacts) that `sources` feed into.
///
/// # Errors
///
/// Returns [`Error::NodeNamesNotInGraph`] naming every unknown source.
pub fn find_targets_from_sources<S: AsRef<str>>(
    graph: &BuildGraph,
    sources: &[S],
) -> Result<BTreeSet<String>> {
    QueryEngine::new(graph).targets_from_sources(sources)
}

/// One concrete path from each target down to each leaf it depends on.
///
/// # Errors
///
/// Returns [`Error::NodeNamesNotInGraph`] naming every unknown target.
pub fn find_paths_from_targets<S: AsRef<str>>(
    graph: &BuildGraph,
    targets: &[S],
) -> Result<Vec<DependencyPath>> {
    QueryEngine::new(graph).paths_from_targets(targets)
}

/// One concrete path from each source up to each sink it feeds.
///
/// # Errors
///
/// Returns [`Error::NodeNamesNotInGraph`] naming every unknown source.
pub fn find_paths_from_sources<S: AsRef<str>>(
    graph: &BuildGraph,
    sources: &[S],
) -> Result<Vec<DependencyPath>> {
    QueryEngine::new(graph).paths_from_sources(sources)
}
