use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Default rendered size assumed for a node before the embedding shell has
/// measured it (first paint happens before DOM layout).
pub const DEFAULT_NODE_WIDTH: f64 = 256.0;
pub const DEFAULT_NODE_HEIGHT: f64 = 48.0;

/// Top-left anchored position of a rendered node.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Default for Size {
    fn default() -> Self {
        Self {
            width: DEFAULT_NODE_WIDTH,
            height: DEFAULT_NODE_HEIGHT,
        }
    }
}

/// Which renderer a diagram node is drawn with.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Table,
    Ra,
    Sql,
}

/// A named anchor point on a node that an edge can attach to, used by the
/// schema diagram where each column exposes an inbound and an outbound
/// anchor. Port ids are fully qualified `table.column` strings and their
/// declaration order is fixed during layout.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Port {
    pub id: String,
    pub label: String,
}

/// Display payload carried by every diagram node: everything the renderer
/// needs for label, hover detail and interaction gating.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NodeData {
    pub label: String,
    /// Additional lines shown on hover (conditions, keys, column types).
    #[serde(default)]
    pub detail: Vec<String>,
    /// False when the source node carries validation errors; the execution
    /// trigger renders disabled and the controller refuses the node.
    pub executable: bool,
    #[serde(default)]
    pub ports: Vec<Port>,
}

/// One renderable node. Owned by the diagram surface's render state and
/// rebuilt, never mutated, whenever the source tree or schema changes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DiagramNode {
    pub id: String,
    pub kind: NodeKind,
    pub position: Position,
    /// Measured rendered size; `None` until the shell reports one.
    #[serde(default)]
    pub size: Option<Size>,
    pub data: NodeData,
}

impl DiagramNode {
    /// Measured size, or the documented default before measurement.
    pub fn size_or_default(&self) -> Size {
        self.size.unwrap_or_default()
    }
}

/// One directed edge. Direction always points from the dependency (child,
/// evaluated first) to the dependent (parent, evaluated after) for both
/// tree dialects; schema edges point from the referencing column to the
/// referenced one. Handles are port ids on schema diagrams, absent on
/// query-tree diagrams.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DiagramEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, rename = "sourceHandle")]
    pub source_handle: Option<String>,
    #[serde(default, rename = "targetHandle")]
    pub target_handle: Option<String>,
}

impl DiagramEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: format!("{}-{}", source, target),
            source,
            target,
            source_handle: None,
            target_handle: None,
        }
    }
}

/// The (nodes, edges) pair a builder produces and the layout engine and
/// surface consume.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DiagramGraph {
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
}

impl DiagramGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn get_node(&self, id: &str) -> Option<&DiagramNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn stats(&self) -> String {
        format!("Nodes: {}, Edges: {}", self.nodes.len(), self.edges.len())
    }

    /// Check that node ids are unique and every edge endpoint resolves to a
    /// node. Duplicate source ids or dangling references are backend
    /// contract violations; this makes them visible in tests and logs
    /// instead of silently producing a broken drawing.
    pub fn verify_integrity(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let mut seen: HashSet<&str> = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                errors.push(format!("Node id:[{}] is duplicated", node.id));
            }
        }

        for edge in &self.edges {
            if !seen.contains(edge.source.as_str()) {
                errors.push(format!(
                    "Edge id:[{}] source {:?} not found in nodes",
                    edge.id, edge.source
                ));
            }
            if !seen.contains(edge.target.as_str()) {
                errors.push(format!(
                    "Edge id:[{}] target {:?} not found in nodes",
                    edge.id, edge.target
                ));
            }
        }

        if errors.is_empty() {
            debug!("All edges have valid source and target nodes");
            Ok(())
        } else {
            Err(errors)
        }
    }
}
