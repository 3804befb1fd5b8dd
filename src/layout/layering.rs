use std::collections::HashMap;

use crate::diagram::{DiagramEdge, DiagramNode};
use crate::error::LayoutError;

/// Assign each node to a discrete layer: nodes nothing depends on (the
/// query root, referenced-only tables) sit at layer 0, and every other
/// node sits one layer per step of the longest chain below them.
///
/// Edges point dependency -> dependent, so the layer of a node is its
/// longest outgoing path length. Self-loops are ignored; cycles (possible
/// in foreign-key graphs) are broken by skipping the closing edge rather
/// than failing the whole layout.
pub fn assign_layers(
    nodes: &[DiagramNode],
    edges: &[DiagramEdge],
) -> Result<HashMap<String, usize>, LayoutError> {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for edge in edges {
        let source = *index
            .get(edge.source.as_str())
            .ok_or_else(|| LayoutError::UnknownNode {
                edge: edge.id.clone(),
                node: edge.source.clone(),
            })?;
        let target = *index
            .get(edge.target.as_str())
            .ok_or_else(|| LayoutError::UnknownNode {
                edge: edge.id.clone(),
                node: edge.target.clone(),
            })?;
        if source != target {
            outgoing[source].push(target);
        }
    }

    let mut memo: Vec<Option<usize>> = vec![None; nodes.len()];
    let mut on_stack: Vec<bool> = vec![false; nodes.len()];
    for i in 0..nodes.len() {
        depth(i, &outgoing, &mut memo, &mut on_stack);
    }

    Ok(nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.clone(), memo[i].unwrap_or(0)))
        .collect())
}

fn depth(
    node: usize,
    outgoing: &[Vec<usize>],
    memo: &mut Vec<Option<usize>>,
    on_stack: &mut Vec<bool>,
) -> usize {
    if let Some(d) = memo[node] {
        return d;
    }
    on_stack[node] = true;
    let mut longest = 0;
    for &next in &outgoing[node] {
        if on_stack[next] {
            // Back edge closing a cycle; skip it.
            continue;
        }
        longest = longest.max(1 + depth(next, outgoing, memo, on_stack));
    }
    on_stack[node] = false;
    memo[node] = Some(longest);
    longest
}
