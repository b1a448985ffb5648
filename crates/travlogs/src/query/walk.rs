//! Depth-first reachability with parent tracking.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::graph::BuildGraph;

/// Everything reachable from one start node in one direction.
#[derive(Debug)]
pub(crate) struct Walk {
    pub(crate) start: NodeIndex,
    pub(crate) direction: Direction,
    /// Nodes in discovery order, `start` first.
    pub(crate) visited: Vec<NodeIndex>,
    /// For each visited node except `start`: the node it was discovered
    /// from and the arc used.
    pub(crate) parents: HashMap<NodeIndex, (NodeIndex, EdgeIndex)>,
}

impl Walk {
    /// Walk from `start`, following outgoing arcs (`Outgoing`) or incoming
    /// arcs (`Incoming`).
    ///
    /// Neighbors are explored in arc insertion order. Each node is entered
    /// once, so diamonds are neither double counted nor re-walked.
    pub(crate) fn run(graph: &BuildGraph, start: NodeIndex, direction: Direction) -> Self {
        let mut visited = vec![start];
        let mut parents: HashMap<NodeIndex, (NodeIndex, EdgeIndex)> = HashMap::new();
        let mut stack = vec![start];

        while let Some(current) = stack.pop() {
            // Reverse so the first arc is explored first.
            for (edge, neighbor) in graph.adjacent(current, direction).into_iter().rev() {
                if neighbor == start || parents.contains_key(&neighbor) {
                    continue;
                }
                parents.insert(neighbor, (current, edge));
                visited.push(neighbor);
                stack.push(neighbor);
            }
        }

        Self {
            start,
            direction,
            visited,
            parents,
        }
    }

    /// Visited nodes with no further arcs in the walk direction: leaves for
    /// a backward walk, sinks for a forward walk.
    pub(crate) fn endpoints<'a>(&'a self, graph: &'a BuildGraph) -> impl Iterator<Item = NodeIndex> + 'a {
        self.visited
            .iter()
            .copied()
            .filter(move |&idx| graph.has_no_arcs(idx, self.direction))
    }

    /// Arcs from `start` to `end`, start side first.
    pub(crate) fn arcs_to(&self, end: NodeIndex) -> Vec<EdgeIndex> {
        let mut arcs = Vec::new();
        let mut cursor = end;
        while cursor != self.start {
            let Some(&(parent, edge)) = self.parents.get(&cursor) else {
                break;
            };
            arcs.push(edge);
            cursor = parent;
        }
        arcs.reverse();
        arcs
    }
}
