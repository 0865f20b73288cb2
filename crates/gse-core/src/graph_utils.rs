use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::{HashSet, VecDeque};

/// Labels connected components (breadth-first search) over `node_count`
/// nodes joined by `edges` (pairs of arena positions).
///
/// Islands are returned in order of their lowest member, members sorted
/// ascending, so the labelling is deterministic for a given arena order.
pub fn find_islands(
    node_count: usize,
    edges: impl IntoIterator<Item = (usize, usize)>,
) -> Vec<Vec<usize>> {
    let mut graph: UnGraph<(), ()> = UnGraph::with_capacity(node_count, 0);
    for _ in 0..node_count {
        graph.add_node(());
    }
    for (a, b) in edges {
        graph.add_edge(NodeIndex::new(a), NodeIndex::new(b), ());
    }

    let mut visited = HashSet::new();
    let mut islands = Vec::new();
    for start in graph.node_indices() {
        if visited.contains(&start) {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(start);
        let mut members = Vec::new();
        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            members.push(node.index());
            for neighbor in graph.neighbors(node) {
                if !visited.contains(&neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        members.sort_unstable();
        islands.push(members);
    }
    islands
}
