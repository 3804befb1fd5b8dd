use std::collections::HashMap;

use crate::diagram::{DiagramEdge, DiagramNode};

/// Number of alternating barycenter sweeps; diagrams this size converge
/// within two or three.
const SWEEPS: usize = 4;

/// Order nodes within each layer to reduce edge crossings, using
/// alternating down/up barycenter sweeps seeded by input order.
///
/// With `fixed_ports` set, a neighbor's contribution is offset by the
/// fractional index of the port its edge attaches to, so siblings end up
/// ordered the way the ports are declared (`FIXED_ORDER`) and edges do not
/// cross inside a single node's port list.
pub fn order_layers(
    nodes: &[DiagramNode],
    edges: &[DiagramEdge],
    layers: &HashMap<String, usize>,
    fixed_ports: bool,
) -> Vec<Vec<String>> {
    let layer_count = layers.values().copied().max().map_or(0, |m| m + 1);
    let mut order: Vec<Vec<String>> = vec![Vec::new(); layer_count];
    for node in nodes {
        order[layers[&node.id]].push(node.id.clone());
    }

    // Port id -> fractional offset within its node's declared port list.
    let mut port_fraction: HashMap<&str, f64> = HashMap::new();
    if fixed_ports {
        for node in nodes {
            let count = node.data.ports.len();
            for (i, port) in node.data.ports.iter().enumerate() {
                port_fraction.insert(port.id.as_str(), (i as f64 + 0.5) / count as f64);
            }
        }
    }

    // For each node, neighbors above (smaller layer) and below, with the
    // port offset contributed by the neighbor's end of the edge.
    let mut above: HashMap<&str, Vec<(&str, f64)>> = HashMap::new();
    let mut below: HashMap<&str, Vec<(&str, f64)>> = HashMap::new();
    for edge in edges {
        if edge.source == edge.target {
            continue;
        }
        let (ls, lt) = (layers[&edge.source], layers[&edge.target]);
        if ls == lt {
            continue;
        }
        let source_offset = offset(&port_fraction, edge.source_handle.as_deref());
        let target_offset = offset(&port_fraction, edge.target_handle.as_deref());
        let (upper, upper_offset, lower, lower_offset) = if ls < lt {
            (edge.source.as_str(), source_offset, edge.target.as_str(), target_offset)
        } else {
            (edge.target.as_str(), target_offset, edge.source.as_str(), source_offset)
        };
        above.entry(lower).or_default().push((upper, upper_offset));
        below.entry(upper).or_default().push((lower, lower_offset));
    }

    let mut position: HashMap<String, f64> = HashMap::new();
    reindex(&order, &mut position);

    for sweep in 0..SWEEPS {
        if sweep % 2 == 0 {
            for layer in 1..layer_count {
                sort_layer(&mut order[layer], &position, &above);
                reindex(&order, &mut position);
            }
        } else {
            for layer in (0..layer_count.saturating_sub(1)).rev() {
                sort_layer(&mut order[layer], &position, &below);
                reindex(&order, &mut position);
            }
        }
    }

    order
}

fn offset(port_fraction: &HashMap<&str, f64>, handle: Option<&str>) -> f64 {
    handle
        .and_then(|h| port_fraction.get(h).copied())
        .unwrap_or(0.5)
        - 0.5
}

fn reindex(order: &[Vec<String>], position: &mut HashMap<String, f64>) {
    for layer in order {
        for (i, id) in layer.iter().enumerate() {
            position.insert(id.clone(), i as f64);
        }
    }
}

fn sort_layer(
    layer: &mut [String],
    position: &HashMap<String, f64>,
    neighbors: &HashMap<&str, Vec<(&str, f64)>>,
) {
    let barycenter = |id: &str| -> f64 {
        match neighbors.get(id) {
            Some(list) if !list.is_empty() => {
                list.iter()
                    .map(|(n, offset)| position[*n] + offset)
                    .sum::<f64>()
                    / list.len() as f64
            }
            // Nodes without neighbors on the fixed side stay put.
            _ => position[id],
        }
    };
    layer.sort_by(|a, b| {
        barycenter(a)
            .partial_cmp(&barycenter(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
