use std::collections::VecDeque;

use crate::error::GraphError;
use crate::types::{NodeDefinition, NodeIndex};

/// Kahn sort over child edges. Children come before their parents.
///
/// Out-of-range and absent child indices are ignored here; wiring reports them.
pub fn topo_order(nodes: &[NodeDefinition]) -> Result<Vec<NodeIndex>, GraphError> {
    let len = nodes.len();
    let mut indeg = vec![0usize; len];
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); len];

    for (parent, node) in nodes.iter().enumerate() {
        for child in node.children() {
            let Ok(child) = usize::try_from(child) else {
                continue;
            };
            if child >= len {
                continue;
            }
            adj[child].push(parent);
            indeg[parent] += 1;
        }
    }

    let mut q: VecDeque<usize> = indeg
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(i, _)| i)
        .collect();

    let mut order = Vec::with_capacity(len);
    while let Some(u) = q.pop_front() {
        order.push(u as NodeIndex);
        for &v in &adj[u] {
            indeg[v] -= 1;
            if indeg[v] == 0 {
                q.push_back(v);
            }
        }
    }

    if order.len() != len {
        return Err(GraphError::Cycle);
    }
    Ok(order)
}
