use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diagram::{
    DiagramGraph, DiagramNode, NodeData, NodeKind, Port, Position, DEFAULT_NODE_HEIGHT,
    DEFAULT_NODE_WIDTH,
};

/// A database schema as delivered by the backend: tables to columns, both
/// in declaration order. Order matters: it fixes the port order on the
/// schema diagram.
pub type Schema = IndexMap<String, IndexMap<String, ColumnDef>>;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ColumnDef {
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default, rename = "primaryKey")]
    pub primary_key: bool,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub references: Option<ColumnRef>,
}

/// Foreign-key pointer from one column to another table's column.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

/// Seed grid for table nodes before the layout engine has run: row-major,
/// three tables per row.
const GRID_COLUMNS: usize = 3;
const GRID_GAP_X: f64 = 80.0;
const GRID_GAP_Y: f64 = 160.0;

fn qualified(table: &str, column: &str) -> String {
    format!("{}.{}", table, column)
}

/// Build the schema diagram: one node per table with one port per column,
/// one edge per foreign-key column. Edge handles are the fully qualified
/// `table.column` port ids on each end, which the port-constrained layout
/// resolves to column-level anchors.
///
/// A column referencing a table or column that does not exist still emits
/// its edge as declared; the schema contract is the backend's to keep
/// consistent.
pub fn build_schema_graph(schema: &Schema) -> DiagramGraph {
    let mut graph = DiagramGraph::default();

    for (index, (table, columns)) in schema.iter().enumerate() {
        let col = index % GRID_COLUMNS;
        let row = index / GRID_COLUMNS;

        let ports = columns
            .iter()
            .map(|(column, _)| Port {
                id: qualified(table, column),
                label: column.clone(),
            })
            .collect();

        let detail = columns
            .iter()
            .map(|(column, def)| {
                let mut line = format!("{}: {}", column, def.column_type);
                if def.primary_key {
                    line.push_str(" PK");
                }
                if def.nullable {
                    line.push_str(" NULL");
                }
                line
            })
            .collect();

        graph.nodes.push(DiagramNode {
            id: table.clone(),
            kind: NodeKind::Table,
            position: Position {
                x: col as f64 * (DEFAULT_NODE_WIDTH + GRID_GAP_X),
                y: row as f64 * (DEFAULT_NODE_HEIGHT + GRID_GAP_Y),
            },
            size: None,
            data: NodeData {
                label: table.clone(),
                detail,
                executable: false,
                ports,
            },
        });
    }

    for (table, columns) in schema {
        for (column, def) in columns {
            if let Some(reference) = &def.references {
                let source_handle = qualified(table, column);
                let target_handle = qualified(&reference.table, &reference.column);
                graph.edges.push(crate::diagram::DiagramEdge {
                    id: format!("{}-{}", source_handle, target_handle),
                    source: table.clone(),
                    target: reference.table.clone(),
                    source_handle: Some(source_handle),
                    target_handle: Some(target_handle),
                });
            }
        }
    }

    debug!("Built schema graph: {}", graph.stats());
    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(column_type: &str) -> ColumnDef {
        ColumnDef {
            column_type: column_type.to_string(),
            primary_key: false,
            nullable: false,
            references: None,
        }
    }

    fn two_table_schema() -> Schema {
        let mut users: IndexMap<String, ColumnDef> = IndexMap::new();
        users.insert(
            "id".to_string(),
            ColumnDef {
                primary_key: true,
                ..column("integer")
            },
        );
        users.insert("name".to_string(), column("text"));

        let mut orders: IndexMap<String, ColumnDef> = IndexMap::new();
        orders.insert(
            "id".to_string(),
            ColumnDef {
                primary_key: true,
                ..column("integer")
            },
        );
        orders.insert(
            "user_id".to_string(),
            ColumnDef {
                references: Some(ColumnRef {
                    table: "users".to_string(),
                    column: "id".to_string(),
                }),
                ..column("integer")
            },
        );

        let mut schema = Schema::new();
        schema.insert("users".to_string(), users);
        schema.insert("orders".to_string(), orders);
        schema
    }

    #[test]
    fn empty_schema_yields_empty_graph() {
        let graph = build_schema_graph(&Schema::new());
        assert!(graph.is_empty());
    }

    #[test]
    fn foreign_key_becomes_port_addressed_edge() {
        let graph = build_schema_graph(&two_table_schema());
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);

        let edge = &graph.edges[0];
        assert_eq!(edge.id, "orders.user_id-users.id");
        assert_eq!(edge.source, "orders");
        assert_eq!(edge.target, "users");
        assert_eq!(edge.source_handle.as_deref(), Some("orders.user_id"));
        assert_eq!(edge.target_handle.as_deref(), Some("users.id"));
        assert!(graph.verify_integrity().is_ok());
    }

    #[test]
    fn ports_follow_column_declaration_order() {
        let graph = build_schema_graph(&two_table_schema());
        let users = graph.get_node("users").unwrap();
        let port_ids: Vec<&str> = users.data.ports.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(port_ids, ["users.id", "users.name"]);
        assert_eq!(users.data.detail[0], "id: integer PK");
    }

    #[test]
    fn seed_positions_form_a_row_major_grid() {
        let mut schema = two_table_schema();
        for name in ["a", "b"] {
            let mut cols: IndexMap<String, ColumnDef> = IndexMap::new();
            cols.insert("id".to_string(), column("integer"));
            schema.insert(name.to_string(), cols);
        }

        let graph = build_schema_graph(&schema);
        assert_eq!(graph.nodes.len(), 4);
        // Fourth table wraps to the second row, first column.
        assert_eq!(graph.nodes[3].position.x, 0.0);
        assert!(graph.nodes[3].position.y > 0.0);
        assert_eq!(graph.nodes[1].position.y, 0.0);
    }

    #[test]
    fn dangling_reference_still_emits_the_declared_edge() {
        let mut schema = two_table_schema();
        schema.get_mut("orders").unwrap().insert(
            "product_id".to_string(),
            ColumnDef {
                references: Some(ColumnRef {
                    table: "products".to_string(),
                    column: "id".to_string(),
                }),
                ..column("integer")
            },
        );

        let graph = build_schema_graph(&schema);
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.edges[1].target, "products");
        // The integrity check reports the dangling target.
        assert!(graph.verify_integrity().is_err());
    }
}
