//! Graph construction from normalized log records.
//!
//! # Overview
//!
//! Records are inserted one at a time in log order. For each record the
//! input, header, and output nodes are created on first sight, then one arc
//! per distinct consumed file is added from that file to the output. Node
//! roles are not stored; they follow from adjacency once the build ends.
//!
//! ## Duplicate Arcs
//!
//! An arc is a set member: a file listed twice in one record, or listed in
//! both `inputs` and `headers`, yields one arc. When two records connect the
//! same pair of files the first record's label is kept.
//!
//! ## Cycles
//!
//! [`GraphBuilder::finish`] runs [`find_cycle`] over the whole graph and
//! refuses to produce a [`BuildGraph`] if one exists.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use petgraph::graph::{DiGraph, NodeIndex};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::RuleFilter;
use crate::error::{Error, Result};
use crate::graph::cycles::find_cycle;
use crate::graph::{ArcInfo, BuildGraph, ProductionStep};
use crate::record::{EdgeRecord, normalize_record, read_log, rule_of};

// ---------------------------------------------------------------------------
// GraphBuilder
// ---------------------------------------------------------------------------

/// Accumulates records into a graph; consumed by [`GraphBuilder::finish`].
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: DiGraph<String, ArcInfo>,
    node_map: HashMap<String, NodeIndex>,
    steps: Vec<ProductionStep>,
}

impl GraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the record found at log position `record`.
    pub fn insert(&mut self, record: usize, edge: EdgeRecord) {
        let step = self.steps.len();

        let mut seen: HashSet<&str> = HashSet::new();
        let consumed: Vec<(String, bool)> = edge
            .inputs
            .iter()
            .map(|path| (path, false))
            .chain(edge.headers.iter().map(|path| (path, true)))
            .filter(|&(path, _)| seen.insert(path.as_str()))
            .map(|(path, via_header)| (path.clone(), via_header))
            .collect();

        let input_indices: Vec<(NodeIndex, bool)> = consumed
            .iter()
            .map(|(path, via_header)| (self.ensure_node(path), *via_header))
            .collect();
        let output_idx = self.ensure_node(&edge.output);

        for (input_idx, via_header) in input_indices {
            if self.graph.contains_edge(input_idx, output_idx) {
                continue;
            }
            self.graph.add_edge(
                input_idx,
                output_idx,
                ArcInfo {
                    rule: edge.rule.clone(),
                    step,
                    via_header,
                },
            );
        }

        self.steps.push(ProductionStep {
            record,
            rule: edge.rule,
            output: edge.output,
            inputs: consumed.into_iter().map(|(path, _)| path).collect(),
        });
    }

    /// Run the cycle check and seal the graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CycleDetected`] with the offending node sequence.
    pub fn finish(self) -> Result<BuildGraph> {
        if let Some(cycle) = find_cycle(&self.graph) {
            return Err(Error::CycleDetected { cycle });
        }
        Ok(BuildGraph::from_parts(self.graph, self.node_map, self.steps))
    }

    fn ensure_node(&mut self, path: &str) -> NodeIndex {
        if let Some(idx) = self.node_map.get(path) {
            return *idx;
        }
        let idx = self.graph.add_node(path.to_string());
        self.node_map.insert(path.to_string(), idx);
        idx
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Build a graph from raw log records.
///
/// Records whose rule is rejected by `filter` are skipped before the rest
/// of their fields are validated.
///
/// # Errors
///
/// Returns [`Error::MissingField`] or [`Error::InvalidField`] for a malformed
/// record, and [`Error::CycleDetected`] for a cyclic log.
#[instrument(skip(records), fields(records = records.len()))]
pub fn build_graph(records: &[Value], filter: &RuleFilter) -> Result<BuildGraph> {
    let mut builder = GraphBuilder::new();
    let mut skipped = 0usize;

    for (index, raw) in records.iter().enumerate() {
        if !filter.allows(rule_of(index, raw)?) {
            skipped += 1;
            continue;
        }
        builder.insert(index, normalize_record(index, raw)?);
    }

    let graph = builder.finish()?;
    debug!(
        nodes = graph.node_count(),
        arcs = graph.arc_count(),
        skipped,
        "built dependency graph"
    );
    Ok(graph)
}

/// Read the log at `log_path` and build its graph.
///
/// # Errors
///
/// Returns [`Error::LogRead`] if the log cannot be read or parsed, plus
/// everything [`build_graph`] can return.
pub fn build_graph_from_log(log_path: &Path, filter: &RuleFilter) -> Result<BuildGraph> {
    let records = read_log(log_path)?;
    build_graph(&records, filter)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeRole;
    use serde_json::json;

    fn build(records: &Value) -> Result<BuildGraph> {
        build_graph(records.as_array().unwrap(), &RuleFilter::All)
    }

    #[test]
    fn empty_log_produces_empty_graph() {
        let graph = build(&json!([])).unwrap();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.arc_count(), 0);
        assert!(graph.steps().is_empty());
    }

    #[test]
    fn compile_and_link_chain() {
        let graph = build(&json!([
            {"inputs": ["a.c"], "output": "a.o", "rule": "cc"},
            {"inputs": ["a.o"], "output": "app", "rule": "link"},
        ]))
        .unwrap();

        let nodes: Vec<&str> = graph.nodes().collect();
        assert_eq!(nodes, vec!["a.c", "a.o", "app"]);
        assert_eq!(graph.arc_count(), 2);

        assert_eq!(graph.arc("a.c", "a.o").unwrap().rule, "cc");
        assert_eq!(graph.arc("a.o", "app").unwrap().rule, "link");
        assert!(graph.arc("app", "a.o").is_none(), "no reverse arc");

        assert_eq!(graph.role("a.c"), Some(NodeRole::Source));
        assert_eq!(graph.role("a.o"), Some(NodeRole::Intermediate));
        assert_eq!(graph.role("app"), Some(NodeRole::Target));
    }

    #[test]
    fn headers_become_inputs() {
        let graph = build(&json!([
            {"inputs": ["a.c"], "output": "a.o", "rule": "cc", "headers": ["a.h"]},
        ]))
        .unwrap();

        let arc = graph.arc("a.h", "a.o").unwrap();
        assert!(arc.via_header);
        assert!(!graph.arc("a.c", "a.o").unwrap().via_header);
        assert_eq!(graph.role("a.h"), Some(NodeRole::Header));
        assert_eq!(graph.step(0).unwrap().inputs, vec!["a.c", "a.h"]);
    }

    #[test]
    fn header_also_listed_as_input_is_a_source() {
        let graph = build(&json!([
            {"inputs": ["gen.h"], "output": "gen.stamp", "rule": "stamp"},
            {"inputs": ["a.c"], "output": "a.o", "rule": "cc", "headers": ["gen.h"]},
        ]))
        .unwrap();
        assert_eq!(graph.role("gen.h"), Some(NodeRole::Source));
    }

    #[test]
    fn duplicate_inputs_collapse() {
        let graph = build(&json!([
            {"inputs": ["a.c", "a.c"], "output": "a.o", "rule": "cc", "headers": ["a.c"]},
        ]))
        .unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.arc_count(), 1);
    }

    #[test]
    fn repeated_pair_keeps_first_record() {
        let graph = build(&json!([
            {"inputs": ["a.c"], "output": "a.o", "rule": "cc"},
            {"inputs": ["a.c", "b.c"], "output": "a.o", "rule": "cxx"},
        ]))
        .unwrap();
        assert_eq!(graph.arc_count(), 2);
        assert_eq!(graph.arc("a.c", "a.o").unwrap().rule, "cc");
        assert_eq!(graph.arc("b.c", "a.o").unwrap().step, 1);
    }

    #[test]
    fn shared_input_feeds_several_outputs() {
        let graph = build(&json!([
            {"inputs": ["util.c"], "output": "util.o", "rule": "cc"},
            {"inputs": ["util.o"], "output": "app", "rule": "link"},
            {"inputs": ["util.o"], "output": "libutil.so", "rule": "solink"},
        ]))
        .unwrap();
        assert_eq!(graph.arc_count(), 3);
        assert_eq!(graph.role("util.o"), Some(NodeRole::Intermediate));
    }

    #[test]
    fn zero_input_record_output_is_a_leaf() {
        let graph = build(&json!([
            {"inputs": [], "output": "version.h", "rule": "stamp"},
            {"inputs": ["main.c"], "output": "main.o", "rule": "cc", "headers": ["version.h"]},
        ]))
        .unwrap();
        assert!(graph.is_leaf("version.h"));
        assert_eq!(graph.role("version.h"), Some(NodeRole::Header));
    }

    #[test]
    fn two_node_cycle_is_rejected() {
        let err = build(&json!([
            {"inputs": ["a"], "output": "b", "rule": "cc"},
            {"inputs": ["b"], "output": "a", "rule": "cc"},
        ]))
        .unwrap_err();

        match err {
            Error::CycleDetected { cycle } => assert_eq!(cycle, vec!["a", "b", "a"]),
            other => panic!("expected CycleDetected, got {other:?}"),
        }
    }

    #[test]
    fn self_production_is_a_cycle() {
        let err = build(&json!([
            {"inputs": ["a.o"], "output": "a.o", "rule": "stamp"},
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::CycleDetected { .. }));
    }

    #[test]
    fn missing_field_aborts_build() {
        let err = build(&json!([
            {"inputs": ["a.c"], "output": "a.o", "rule": "cc"},
            {"inputs": ["a.o"], "rule": "link"},
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            Error::MissingField {
                record: 1,
                field: "output"
            }
        ));
    }

    #[test]
    fn rule_filter_skips_records() {
        let records = json!([
            {"inputs": ["a.c"], "output": "a.o", "rule": "cc"},
            {"inputs": ["a.o"], "output": "a.stamp", "rule": "stamp"},
            {"inputs": ["a.o"], "output": "app", "rule": "link"},
        ]);
        let graph = build_graph(records.as_array().unwrap(), &RuleFilter::compile_and_link())
            .unwrap();

        assert!(!graph.contains("a.stamp"));
        assert_eq!(graph.steps().len(), 2);
        assert_eq!(graph.steps()[1].record, 2, "step keeps its log position");
    }

    #[test]
    fn filtered_record_still_needs_a_rule() {
        let records = json!([{"inputs": ["a.c"], "output": "a.o"}]);
        let err = build_graph(records.as_array().unwrap(), &RuleFilter::compile_and_link())
            .unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "rule", .. }));
    }

    #[test]
    fn build_is_deterministic() {
        let records = json!([
            {"inputs": ["b.c", "a.c"], "output": "ab.o", "rule": "cc", "headers": ["x.h"]},
            {"inputs": ["ab.o", "c.o"], "output": "app", "rule": "link"},
        ]);

        let first = build(&records).unwrap();
        let second = build(&records).unwrap();

        assert_eq!(first.nodes().collect::<Vec<_>>(), second.nodes().collect::<Vec<_>>());
        assert_eq!(first.arcs().collect::<Vec<_>>(), second.arcs().collect::<Vec<_>>());
    }
}
