//! Dependency cycle diagnostics for `order_steps_by_dependencies`.
//!
//! `petgraph::algo::toposort` reports only the single node it was standing
//! on when it detected a cycle. `CycleError` instead carries the full
//! offending ring so a user can see which objects actually reference each
//! other circularly, not just one of them.

use crate::catalog::id::StableId;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone)]
pub struct CycleError {
    pub ring: Vec<StableId>,
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.ring.iter().map(|id| id.to_string()).collect();
        write!(
            f,
            "dependency cycle detected: {} -> {}",
            names.join(" -> "),
            names.first().cloned().unwrap_or_default()
        )
    }
}

impl std::error::Error for CycleError {}

/// Topological sort stable under ties: `petgraph::algo::toposort` is
/// DFS-based and gives no guarantee about the relative order of nodes that
/// aren't constrained with respect to each other. Spec §4.3/§5 require ties
/// to break by original input order, so this runs Kahn's algorithm instead,
/// always picking the lowest-index ready node — which, since node indices
/// are assigned in the caller's original step order, is exactly that order.
///
/// Returns `Ok(order)` on success, or `Err(node)` naming a node still stuck
/// with unsatisfied in-edges when a cycle prevents full ordering (callers
/// feed that node into `find_cycle` to recover the ring).
pub fn stable_toposort(graph: &DiGraph<usize, ()>) -> Result<Vec<NodeIndex>, NodeIndex> {
    let mut in_degree = vec![0usize; graph.node_count()];
    for edge in graph.edge_indices() {
        let (_, target) = graph.edge_endpoints(edge).expect("edge index from this graph");
        in_degree[target.index()] += 1;
    }

    let mut ready: BTreeSet<NodeIndex> = graph
        .node_indices()
        .filter(|n| in_degree[n.index()] == 0)
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(&node) = ready.iter().next() {
        ready.remove(&node);
        order.push(node);
        for neighbor in graph.neighbors(node) {
            in_degree[neighbor.index()] -= 1;
            if in_degree[neighbor.index()] == 0 {
                ready.insert(neighbor);
            }
        }
    }

    if order.len() == graph.node_count() {
        Ok(order)
    } else {
        let stuck = graph
            .node_indices()
            .find(|n| in_degree[n.index()] > 0)
            .expect("incomplete order implies some node still has unsatisfied in-edges");
        Err(stuck)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Find the cycle reachable from `start` in `graph`. `start` is the node
/// `toposort` was visiting when it detected a back-edge, so a cycle
/// starting there is guaranteed to exist; this walks the graph via DFS and
/// returns the ring of nodes from the first repeated node back to itself.
/// Falls back to `[start]` only if the graph's cycle structure somehow
/// isn't reachable via simple DFS from `start` (should not happen given
/// toposort's guarantee, but keeps this function total).
pub fn find_cycle(graph: &DiGraph<usize, ()>, start: NodeIndex) -> Vec<NodeIndex> {
    let mut color = vec![Color::White; graph.node_count()];
    let mut path: Vec<NodeIndex> = vec![start];
    let mut stack: Vec<(NodeIndex, Vec<NodeIndex>)> =
        vec![(start, graph.neighbors(start).collect())];
    color[start.index()] = Color::Gray;

    while let Some((node, neighbors)) = stack.last_mut() {
        let node = *node;
        match neighbors.pop() {
            Some(next) => match color[next.index()] {
                Color::White => {
                    color[next.index()] = Color::Gray;
                    path.push(next);
                    let next_neighbors: Vec<NodeIndex> = graph.neighbors(next).collect();
                    stack.push((next, next_neighbors));
                }
                Color::Gray => {
                    if let Some(pos) = path.iter().position(|&n| n == next) {
                        return path[pos..].to_vec();
                    }
                }
                Color::Black => {}
            },
            None => {
                color[node.index()] = Color::Black;
                path.pop();
                stack.pop();
            }
        }
    }

    vec![start]
}
