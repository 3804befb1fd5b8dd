use serde::{Deserialize, Serialize};

/// One node of a backend-produced query tree.
///
/// The backend delivers the whole tree as one JSON document and rebuilds it
/// wholesale on every fetch; nothing in this crate patches a tree in place.
/// `id` is assigned by the backend and is unique within one snapshot; it
/// becomes the diagram node identity, so re-renders of the same snapshot
/// keep stable ids.
///
/// The kind-specific payload `K` is one of the two dialect enums below
/// ([`SqlOp`] or [`RaOp`]), flattened into the node object under a `kind`
/// discriminant.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct QueryTreeNode<K> {
    pub id: u64,
    #[serde(flatten)]
    pub op: K,
    #[serde(default = "Vec::new")]
    pub children: Vec<QueryTreeNode<K>>,
    #[serde(default, rename = "validationErrors")]
    pub validation_errors: Vec<ValidationError>,
}

/// A structural or semantic error the backend attached to a node.
/// A subtree is executable iff every node in it carries none.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ValidationError {
    pub message: String,
}

impl<K> QueryTreeNode<K> {
    /// Whether this node's own subtree root is free of validation errors.
    pub fn is_executable(&self) -> bool {
        self.validation_errors.is_empty()
    }

    /// Total number of nodes in this subtree, root included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }

    pub fn find(&self, id: u64) -> Option<&QueryTreeNode<K>> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}

//
// SQL dialect
//

/// Node kinds of the SQL-style query tree.
///
/// Each variant carries only the immutable display attributes the diagram
/// needs; expressions arrive as pre-rendered text, never parsed here.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SqlOp {
    Table {
        name: String,
    },
    Alias {
        alias: String,
    },
    Join {
        method: JoinMethod,
        #[serde(default)]
        condition: Option<String>,
    },
    Select {
        columns: Vec<String>,
        #[serde(default)]
        distinct: bool,
    },
    Where {
        condition: String,
    },
    GroupBy {
        keys: Vec<String>,
    },
    Having {
        condition: String,
    },
    OrderBy {
        keys: Vec<OrderKey>,
    },
    SetOp {
        operator: SetOperator,
        #[serde(default)]
        all: bool,
    },
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JoinMethod {
    Inner,
    Left,
    Right,
    Full,
    Cross,
    Natural,
}

impl JoinMethod {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinMethod::Inner => "INNER JOIN",
            JoinMethod::Left => "LEFT JOIN",
            JoinMethod::Right => "RIGHT JOIN",
            JoinMethod::Full => "FULL JOIN",
            JoinMethod::Cross => "CROSS JOIN",
            JoinMethod::Natural => "NATURAL JOIN",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SetOperator {
    Union,
    Intersect,
    Except,
}

impl SetOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SetOperator::Union => "UNION",
            SetOperator::Intersect => "INTERSECT",
            SetOperator::Except => "EXCEPT",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderKey {
    pub column: String,
    #[serde(default)]
    pub descending: bool,
}

//
// Relational-algebra dialect
//

/// Node kinds of the relational-algebra operator tree. Uniform shape: an
/// operator plus optional argument text, rendered with the usual symbols.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RaOp {
    Relation {
        name: String,
    },
    Projection {
        attributes: Vec<String>,
    },
    Selection {
        condition: String,
    },
    Rename {
        name: String,
    },
    Join {
        #[serde(default)]
        condition: Option<String>,
    },
    Product,
    Division,
    Union,
    Intersection,
    Difference,
}
