//! Cycle detection for the build graph.
//!
//! A depth-first traversal starts from every unvisited node in index order
//! and keeps the current path on an explicit stack. Reaching a node that is
//! still on the stack means the log describes a file that (transitively)
//! depends on itself.
//!
//! The traversal is iterative, so very deep build chains cannot overflow the
//! call stack.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::graph::ordered_adjacent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Find one cycle in `graph`, if any.
///
/// The returned sequence starts and ends with the same node, e.g.
/// `["a", "b", "a"]`. A self-arc yields `["a", "a"]`.
#[must_use]
pub fn find_cycle<E>(graph: &DiGraph<String, E>) -> Option<Vec<String>> {
    let mut marks = vec![Mark::Unvisited; graph.node_count()];
    let mut path: Vec<NodeIndex> = Vec::new();
    // Each frame: (node, its successors, index of the next successor).
    let mut call_stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> = Vec::new();

    for start in graph.node_indices() {
        if marks[start.index()] != Mark::Unvisited {
            continue;
        }

        marks[start.index()] = Mark::OnStack;
        path.push(start);
        call_stack.push((start, successors(graph, start), 0));

        while let Some(frame) = call_stack.last_mut() {
            let (current, next_nodes, next) = (frame.0, &frame.1, &mut frame.2);

            if *next < next_nodes.len() {
                let neighbor = next_nodes[*next];
                *next += 1;

                match marks[neighbor.index()] {
                    Mark::OnStack => return Some(cycle_from(graph, &path, neighbor)),
                    Mark::Unvisited => {
                        marks[neighbor.index()] = Mark::OnStack;
                        path.push(neighbor);
                        call_stack.push((neighbor, successors(graph, neighbor), 0));
                    }
                    Mark::Done => {}
                }
            } else {
                call_stack.pop();
                path.pop();
                marks[current.index()] = Mark::Done;
            }
        }
    }

    None
}

fn successors<E>(graph: &DiGraph<String, E>, node: NodeIndex) -> Vec<NodeIndex> {
    ordered_adjacent(graph, node, Direction::Outgoing)
        .into_iter()
        .map(|(_, neighbor)| neighbor)
        .collect()
}

/// Slice the active path from the first occurrence of `closing` and close
/// the loop.
fn cycle_from<E>(graph: &DiGraph<String, E>, path: &[NodeIndex], closing: NodeIndex) -> Vec<String> {
    let start = path.iter().position(|&idx| idx == closing).unwrap_or(0);
    path[start..]
        .iter()
        .chain(std::iter::once(&closing))
        .map(|&idx| node_id(graph, idx))
        .collect()
}

fn node_id<E>(graph: &DiGraph<String, E>, idx: NodeIndex) -> String {
    graph
        .node_weight(idx)
        .cloned()
        .unwrap_or_else(|| format!("#{}", idx.index()))
}
