//! On-disk cache file format.
//!
//! ```text
//! travlogs-graph-cache <format> <fingerprint>\n
//! <JSON GraphSnapshot>
//! ```
//!
//! The header line can be checked without parsing the body. The body lists
//! nodes and arcs in index order, so decoding re-adds them in the same order
//! and reproduces identical node and arc indices.

use std::collections::HashMap;

use anyhow::{Context, Result, bail, ensure};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::cache::fingerprint::Fingerprint;
use crate::graph::{ArcInfo, BuildGraph, ProductionStep, find_cycle};

const MAGIC: &str = "travlogs-graph-cache";

/// Bumped whenever [`GraphSnapshot`] changes shape.
pub const CACHE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct GraphSnapshot {
    nodes: Vec<String>,
    arcs: Vec<SnapshotArc>,
    steps: Vec<ProductionStep>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotArc {
    from: usize,
    to: usize,
    #[serde(flatten)]
    info: ArcInfo,
}

/// Serialize `graph` under `fingerprint`.
pub(crate) fn encode(graph: &BuildGraph, fingerprint: &Fingerprint) -> Result<Vec<u8>> {
    let inner = graph.inner();
    let snapshot = GraphSnapshot {
        nodes: graph.nodes().map(str::to_string).collect(),
        arcs: inner
            .raw_edges()
            .iter()
            .map(|edge| SnapshotArc {
                from: edge.source().index(),
                to: edge.target().index(),
                info: edge.weight.clone(),
            })
            .collect(),
        steps: graph.steps().to_vec(),
    };

    let mut bytes = format!("{MAGIC} {CACHE_FORMAT_VERSION} {fingerprint}\n").into_bytes();
    serde_json::to_writer(&mut bytes, &snapshot).context("serialize graph snapshot")?;
    Ok(bytes)
}

/// Read only the fingerprint from a cache file's header line.
pub(crate) fn read_fingerprint(bytes: &[u8]) -> Result<Fingerprint> {
    let (header, _) = split_header(bytes)?;
    parse_header(header)
}

/// Decode a cache file into its fingerprint and graph.
///
/// The decoded graph goes through the same endpoint and cycle checks as a
/// fresh build; anything inconsistent is an error, which callers treat as a
/// cache miss.
pub(crate) fn decode(bytes: &[u8]) -> Result<(Fingerprint, BuildGraph)> {
    let (header, body) = split_header(bytes)?;
    let fingerprint = parse_header(header)?;

    let snapshot: GraphSnapshot =
        serde_json::from_slice(body).context("deserialize graph snapshot")?;

    let mut graph = DiGraph::<String, ArcInfo>::with_capacity(snapshot.nodes.len(), snapshot.arcs.len());
    let mut node_map: HashMap<String, NodeIndex> = HashMap::with_capacity(snapshot.nodes.len());
    for name in snapshot.nodes {
        ensure!(!node_map.contains_key(&name), "duplicate node {name:?}");
        let idx = graph.add_node(name.clone());
        node_map.insert(name, idx);
    }

    let node_count = graph.node_count();
    for arc in snapshot.arcs {
        ensure!(
            arc.from < node_count && arc.to < node_count,
            "arc {} -> {} references a missing node",
            arc.from,
            arc.to
        );
        ensure!(
            arc.info.step < snapshot.steps.len(),
            "arc references missing step {}",
            arc.info.step
        );
        graph.add_edge(NodeIndex::new(arc.from), NodeIndex::new(arc.to), arc.info);
    }

    if let Some(cycle) = find_cycle(&graph) {
        bail!("cached graph contains a cycle: {}", cycle.join(" -> "));
    }

    Ok((fingerprint, BuildGraph::from_parts(graph, node_map, snapshot.steps)))
}

fn split_header(bytes: &[u8]) -> Result<(&str, &[u8])> {
    let newline = bytes
        .iter()
        .position(|&b| b == b'\n')
        .context("cache file has no header line")?;
    let header = std::str::from_utf8(&bytes[..newline]).context("cache header is not UTF-8")?;
    Ok((header, &bytes[newline + 1..]))
}

fn parse_header(header: &str) -> Result<Fingerprint> {
    let mut parts = header.split(' ');
    let (Some(magic), Some(version), Some(fingerprint), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        bail!("malformed cache header {header:?}");
    };

    ensure!(magic == MAGIC, "foreign cache file (magic {magic:?})");
    let version: u32 = version
        .parse()
        .with_context(|| format!("bad cache format version {version:?}"))?;
    ensure!(
        version == CACHE_FORMAT_VERSION,
        "cache format version {version}, expected {CACHE_FORMAT_VERSION}"
    );

    Ok(Fingerprint::from_stored(fingerprint))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleFilter;
    use crate::graph::build_graph;
    use serde_json::json;

    fn sample() -> BuildGraph {
        let records = json!([
            {"inputs": ["a.c"], "output": "a.o", "rule": "cc", "headers": ["a.h"]},
            {"inputs": ["b.c"], "output": "b.o", "rule": "cc"},
            {"inputs": ["a.o", "b.o"], "output": "app", "rule": "link"},
        ]);
        build_graph(records.as_array().unwrap(), &RuleFilter::All).unwrap()
    }

    #[test]
    fn decode_reproduces_graph() {
        let graph = sample();
        let fingerprint = Fingerprint::from_stored("abc123");
        let bytes = encode(&graph, &fingerprint).unwrap();

        let (stored, decoded) = decode(&bytes).unwrap();
        assert_eq!(stored, fingerprint);
        assert_eq!(decoded.nodes().collect::<Vec<_>>(), graph.nodes().collect::<Vec<_>>());
        assert_eq!(decoded.arcs().collect::<Vec<_>>(), graph.arcs().collect::<Vec<_>>());
        assert_eq!(decoded.steps(), graph.steps());
    }

    #[test]
    fn header_is_readable_alone() {
        let bytes = encode(&sample(), &Fingerprint::from_stored("feed")).unwrap();
        assert_eq!(read_fingerprint(&bytes).unwrap().as_str(), "feed");
    }

    #[test]
    fn rejects_foreign_file() {
        assert!(decode(b"# 1a2b3:ffff\n\n# N: 0 E: 0\n").is_err());
        assert!(decode(b"").is_err());
    }

    #[test]
    fn rejects_other_format_version() {
        let bytes = format!("{MAGIC} 999 abc\n{{}}");
        assert!(decode(bytes.as_bytes()).is_err());
    }

    #[test]
    fn rejects_truncated_body() {
        let bytes = encode(&sample(), &Fingerprint::from_stored("abc")).unwrap();
        assert!(decode(&bytes[..bytes.len() / 2]).is_err());
    }

    #[test]
    fn rejects_dangling_arc() {
        let body = json!({
            "nodes": ["a"],
            "arcs": [{"from": 0, "to": 5, "rule": "cc", "step": 0, "via_header": false}],
            "steps": [{"record": 0, "rule": "cc", "output": "b", "inputs": ["a"]}],
        });
        let bytes = format!("{MAGIC} {CACHE_FORMAT_VERSION} abc\n{body}");
        assert!(decode(bytes.as_bytes()).is_err());
    }

    #[test]
    fn rejects_cyclic_snapshot() {
        let body = json!({
            "nodes": ["a", "b"],
            "arcs": [
                {"from": 0, "to": 1, "rule": "cc", "step": 0, "via_header": false},
                {"from": 1, "to": 0, "rule": "cc", "step": 0, "via_header": false},
            ],
            "steps": [{"record": 0, "rule": "cc", "output": "b", "inputs": ["a"]}],
        });
        let bytes = format!("{MAGIC} {CACHE_FORMAT_VERSION} abc\n{body}");
        assert!(decode(bytes.as_bytes()).is_err());
    }
}
