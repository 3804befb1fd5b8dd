use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::{Notifier, SchemaFetcher, TreeFetcher};
use crate::builder::{build_graph, Dialect};
use crate::diagram::{DiagramEdge, DiagramGraph, DiagramNode, Position, Size};
use crate::layout::{layout_or_origin, LayoutEngine, LayoutOptions};
use crate::schema::{build_schema_graph, Schema};
use crate::tree::QueryTreeNode;

/// Margin kept around the fitted node set.
pub const FIT_MARGIN: f64 = 64.0;
/// The fitted content is pinned this far below the viewport top.
pub const FIT_TOP_OFFSET: f64 = 32.0;
pub const FIT_MIN_ZOOM: f64 = 0.5;
pub const FIT_MAX_ZOOM: f64 = 2.0;
pub const FIT_DURATION_MS: u64 = 500;

/// Which graph source currently populates the canvas.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActiveView {
    #[default]
    Schema,
    Query,
}

/// Viewport animation target produced by fit-to-view.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct ViewportTransform {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
    pub duration_ms: u64,
}

/// Owns the live render state of the diagram canvas.
///
/// Both graph sources are kept populated at all times; switching the
/// active view only flips which one the renderer reads, so a tab switch is
/// instantaneous and never shows a loading flash for data that is already
/// there. Node drags and measured sizes mutate render state only; the
/// source tree/schema is owned elsewhere and is never written back to.
pub struct DiagramSurface {
    active: ActiveView,
    schema: DiagramGraph,
    query: DiagramGraph,
    schema_engine: LayoutEngine,
    query_engine: LayoutEngine,
}

impl Default for DiagramSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagramSurface {
    pub fn new() -> Self {
        Self {
            active: ActiveView::default(),
            schema: DiagramGraph::default(),
            query: DiagramGraph::default(),
            schema_engine: LayoutEngine::new(LayoutOptions::schema()),
            query_engine: LayoutEngine::new(LayoutOptions::query_tree()),
        }
    }

    pub fn active_view(&self) -> ActiveView {
        self.active
    }

    pub fn set_active_view(&mut self, view: ActiveView) {
        self.active = view;
    }

    pub fn nodes(&self) -> &[DiagramNode] {
        &self.active_graph().nodes
    }

    pub fn edges(&self) -> &[DiagramEdge] {
        &self.active_graph().edges
    }

    fn active_graph(&self) -> &DiagramGraph {
        match self.active {
            ActiveView::Schema => &self.schema,
            ActiveView::Query => &self.query,
        }
    }

    fn active_graph_mut(&mut self) -> &mut DiagramGraph {
        match self.active {
            ActiveView::Schema => &mut self.schema,
            ActiveView::Query => &mut self.query,
        }
    }

    /// Replace the query-side render state from a (possibly absent) tree.
    pub fn set_query_tree<K: Dialect>(&mut self, tree: Option<&QueryTreeNode<K>>) {
        self.query = build_graph(tree);
    }

    /// Replace the schema-side render state.
    pub fn set_schema(&mut self, schema: &Schema) {
        self.schema = build_schema_graph(schema);
    }

    /// Fetch and rebuild the query graph. A failed fetch is surfaced once
    /// through the notifier and the previous render state stays in place.
    pub async fn refresh_query<K: Dialect + Send + Sync + 'static>(
        &mut self,
        fetcher: &dyn TreeFetcher<K>,
        notifier: &dyn Notifier,
        root_id: i64,
    ) {
        match fetcher.fetch_tree(root_id).await {
            Ok(tree) => self.set_query_tree(Some(&tree)),
            Err(err) => {
                warn!("Failed to fetch query tree {}: {}", root_id, err);
                notifier.notify_error("Error loading query tree").await;
            }
        }
    }

    /// Fetch and rebuild the schema graph; same failure contract as
    /// [`Self::refresh_query`].
    pub async fn refresh_schema(
        &mut self,
        fetcher: &dyn SchemaFetcher,
        notifier: &dyn Notifier,
        database_id: i64,
    ) {
        match fetcher.fetch_schema(database_id).await {
            Ok(schema) => self.set_schema(&schema),
            Err(err) => {
                warn!("Failed to fetch schema {}: {}", database_id, err);
                notifier.notify_error("Error loading database schema").await;
            }
        }
    }

    /// Record the size the shell measured for a rendered node.
    pub fn set_measured_size(&mut self, view: ActiveView, node_id: &str, size: Size) {
        let graph = match view {
            ActiveView::Schema => &mut self.schema,
            ActiveView::Query => &mut self.query,
        };
        if let Some(node) = graph.nodes.iter_mut().find(|n| n.id == node_id) {
            node.size = Some(size);
        }
    }

    /// Recompute positions for both graphs. Runs unconditionally for the
    /// inactive source too, so the next view switch needs no layout pass.
    pub async fn relayout(&mut self) {
        self.query.nodes = layout_or_origin(&self.query_engine, &self.query).await;
        self.schema.nodes = layout_or_origin(&self.schema_engine, &self.schema).await;
        debug!(
            "Relayout done: query {}, schema {}",
            self.query.stats(),
            self.schema.stats()
        );
    }

    /// Apply a node drag to the render state. Layout is ephemeral; the
    /// source data is not touched and the next rebuild discards the move.
    pub fn apply_node_drag(&mut self, node_id: &str, position: Position) {
        if let Some(node) = self
            .active_graph_mut()
            .nodes
            .iter_mut()
            .find(|n| n.id == node_id)
        {
            node.position = position;
        }
    }

    /// Compute the viewport transform framing all active nodes
    /// top-centered. `None` when there is nothing to fit.
    pub fn fit_view(&self, viewport_width: f64, viewport_height: f64) -> Option<ViewportTransform> {
        let nodes = self.nodes();
        if nodes.is_empty() {
            return None;
        }

        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for node in nodes {
            let size = node.size_or_default();
            min_x = min_x.min(node.position.x);
            min_y = min_y.min(node.position.y);
            max_x = max_x.max(node.position.x + size.width);
            max_y = max_y.max(node.position.y + size.height);
        }
        let width = max_x - min_x;
        let height = max_y - min_y;

        let zoom_x = (viewport_width - 2.0 * FIT_MARGIN) / width;
        let zoom_y = (viewport_height - 2.0 * FIT_MARGIN) / height;
        let zoom = zoom_x.min(zoom_y).clamp(FIT_MIN_ZOOM, FIT_MAX_ZOOM);

        Some(ViewportTransform {
            x: (viewport_width - width * zoom) / 2.0 - min_x * zoom,
            y: FIT_TOP_OFFSET - min_y * zoom,
            zoom,
            duration_ms: FIT_DURATION_MS,
        })
    }
}
