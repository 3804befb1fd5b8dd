use tracing::debug;

use crate::diagram::{DiagramEdge, DiagramGraph, DiagramNode, NodeData, NodeKind, Position};
use crate::tree::{QueryTreeNode, RaOp, SqlOp};

/// Dialect-specific data shaping for the generic tree-to-graph transform.
///
/// One implementation per supported tree dialect. Dispatch is a closed
/// `match` over the operator enum, so adding a node kind without a display
/// mapping fails to compile instead of falling through at runtime.
pub trait Dialect {
    /// Which renderer family nodes of this dialect belong to.
    fn node_kind() -> NodeKind;

    /// Short label drawn inside the node.
    fn label(&self) -> String;

    /// Hover-detail lines; empty when the label says everything.
    fn detail(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Build the renderable graph for a query tree.
///
/// Pure: the same tree always yields the same (nodes, edges), in the same
/// depth-first pre-order. `None` (no query selected yet, or still loading)
/// yields an empty graph. Node ids are the decimal form of the
/// backend-assigned ids; every parent-child pair yields exactly one edge
/// pointing child -> parent (data-flow order), with id `"{child}-{parent}"`.
pub fn build_graph<K: Dialect>(root: Option<&QueryTreeNode<K>>) -> DiagramGraph {
    let mut graph = DiagramGraph::default();
    if let Some(root) = root {
        visit(root, None, &mut graph);
        debug!("Built query graph: {}", graph.stats());
    }
    graph
}

fn visit<K: Dialect>(
    node: &QueryTreeNode<K>,
    parent_id: Option<&str>,
    graph: &mut DiagramGraph,
) {
    let id = node.id.to_string();

    graph.nodes.push(DiagramNode {
        id: id.clone(),
        kind: K::node_kind(),
        position: Position::default(),
        size: None,
        data: NodeData {
            label: node.op.label(),
            detail: node.op.detail(),
            executable: node.is_executable(),
            ports: Vec::new(),
        },
    });

    if let Some(parent) = parent_id {
        graph.edges.push(DiagramEdge::new(id.clone(), parent));
    }

    for child in &node.children {
        visit(child, Some(&id), graph);
    }
}

impl Dialect for SqlOp {
    fn node_kind() -> NodeKind {
        NodeKind::Sql
    }

    fn label(&self) -> String {
        match self {
            SqlOp::Table { name } => name.clone(),
            SqlOp::Alias { alias } => format!("AS {}", alias),
            SqlOp::Join { method, .. } => method.as_sql().to_string(),
            SqlOp::Select { distinct: true, .. } => "SELECT DISTINCT".to_string(),
            SqlOp::Select { distinct: false, .. } => "SELECT".to_string(),
            SqlOp::Where { .. } => "WHERE".to_string(),
            SqlOp::GroupBy { .. } => "GROUP BY".to_string(),
            SqlOp::Having { .. } => "HAVING".to_string(),
            SqlOp::OrderBy { .. } => "ORDER BY".to_string(),
            SqlOp::SetOp { operator, all: false } => operator.as_sql().to_string(),
            SqlOp::SetOp { operator, all: true } => format!("{} ALL", operator.as_sql()),
        }
    }

    fn detail(&self) -> Vec<String> {
        match self {
            SqlOp::Table { .. } | SqlOp::Alias { .. } | SqlOp::SetOp { .. } => Vec::new(),
            SqlOp::Join { condition, .. } => condition.iter().map(|c| format!("ON {}", c)).collect(),
            SqlOp::Select { columns, .. } => columns.clone(),
            SqlOp::Where { condition } | SqlOp::Having { condition } => vec![condition.clone()],
            SqlOp::GroupBy { keys } => keys.clone(),
            SqlOp::OrderBy { keys } => keys
                .iter()
                .map(|k| {
                    if k.descending {
                        format!("{} DESC", k.column)
                    } else {
                        k.column.clone()
                    }
                })
                .collect(),
        }
    }
}

impl Dialect for RaOp {
    fn node_kind() -> NodeKind {
        NodeKind::Ra
    }

    fn label(&self) -> String {
        match self {
            RaOp::Relation { name } => name.clone(),
            RaOp::Projection { attributes } => format!("π {}", attributes.join(", ")),
            RaOp::Selection { condition } => format!("σ {}", condition),
            RaOp::Rename { name } => format!("ρ {}", name),
            RaOp::Join { condition: Some(c) } => format!("⨝ {}", c),
            RaOp::Join { condition: None } => "⨝".to_string(),
            RaOp::Product => "×".to_string(),
            RaOp::Division => "÷".to_string(),
            RaOp::Union => "∪".to_string(),
            RaOp::Intersection => "∩".to_string(),
            RaOp::Difference => "−".to_string(),
        }
    }
}
