//! Layered layout for the diagram surface.
//!
//! The engine is an explicit configuration object, not a shared singleton:
//! every call works from its own inputs, so concurrent layouts (schema and
//! query graphs are computed unconditionally) cannot interfere.

mod coords;
mod layering;
mod ordering;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::diagram::{DiagramEdge, DiagramGraph, DiagramNode, Position, Size};
use crate::error::LayoutError;

/// Layering direction: where layer 0 (the nodes nothing depends on, such
/// as the query root or referenced-only tables) is drawn.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    #[default]
    TopToBottom,
    BottomToTop,
    LeftToRight,
}

/// Whether node ports may be reordered to reduce crossings. Schema
/// diagrams declare `FixedOrder`: column anchors keep declaration order
/// and the orderer works around them.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PortConstraints {
    #[default]
    Free,
    FixedOrder,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct LayoutOptions {
    pub direction: Direction,
    pub port_constraints: PortConstraints,
    /// Gap between neighboring nodes within one layer.
    pub node_gap: f64,
    /// Gap between consecutive layers.
    pub layer_gap: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            direction: Direction::default(),
            port_constraints: PortConstraints::default(),
            node_gap: 40.0,
            layer_gap: 80.0,
        }
    }
}

impl LayoutOptions {
    /// Options used for query-tree diagrams.
    pub fn query_tree() -> Self {
        Self::default()
    }

    /// Options used for schema diagrams: horizontal layering with fixed
    /// column ports.
    pub fn schema() -> Self {
        Self {
            direction: Direction::LeftToRight,
            port_constraints: PortConstraints::FixedOrder,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LayoutEngine {
    pub options: LayoutOptions,
}

impl LayoutEngine {
    pub fn new(options: LayoutOptions) -> Self {
        Self { options }
    }

    /// Compute positions for the given graph.
    ///
    /// Node sizes are fixed inputs: the measured size where the shell has
    /// reported one, the documented default otherwise. The result repeats
    /// the input nodes in input order with positions replaced; the same
    /// input always produces the same output.
    pub fn layout(
        &self,
        nodes: &[DiagramNode],
        edges: &[DiagramEdge],
    ) -> Result<Vec<DiagramNode>, LayoutError> {
        if nodes.is_empty() {
            return Ok(Vec::new());
        }

        let sizes: HashMap<String, Size> = nodes
            .iter()
            .map(|n| (n.id.clone(), n.size_or_default()))
            .collect();

        let layers = layering::assign_layers(nodes, edges)?;
        let order = ordering::order_layers(
            nodes,
            edges,
            &layers,
            self.options.port_constraints == PortConstraints::FixedOrder,
        );
        let positions = coords::assign_positions(&order, &sizes, &self.options);

        debug!(
            "Layout computed for {} nodes across {} layers",
            nodes.len(),
            order.len()
        );

        Ok(nodes
            .iter()
            .map(|n| {
                let mut node = n.clone();
                if let Some(position) = positions.get(&n.id) {
                    node.position = *position;
                }
                node
            })
            .collect())
    }

    /// Deferred variant for the render path: the computation runs off the
    /// async executor once node sizes are known.
    pub async fn layout_async(
        &self,
        nodes: Vec<DiagramNode>,
        edges: Vec<DiagramEdge>,
    ) -> Result<Vec<DiagramNode>, LayoutError> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.layout(&nodes, &edges))
            .await
            .map_err(|_| LayoutError::Cancelled)?
    }
}

/// Layout with the degraded fallback the surface relies on: if the
/// computation fails, every node is left at the origin and the failure is
/// logged, never surfaced to the user.
pub async fn layout_or_origin(engine: &LayoutEngine, graph: &DiagramGraph) -> Vec<DiagramNode> {
    match engine
        .layout_async(graph.nodes.clone(), graph.edges.clone())
        .await
    {
        Ok(nodes) => nodes,
        Err(err) => {
            warn!("Layout failed, rendering nodes unpositioned: {}", err);
            graph
                .nodes
                .iter()
                .map(|n| {
                    let mut node = n.clone();
                    node.position = Position::default();
                    node
                })
                .collect()
        }
    }
}
