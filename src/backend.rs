//! Collaborator contracts supplied by the embedding application shell.
//!
//! The core never talks to the network itself: tree/schema retrieval,
//! subquery execution, user notification and the shared result slot are
//! all injected behind these traits. Which backend route a call maps to
//! (saved query vs graded attempt) is the implementor's concern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::FetchError;
use crate::schema::Schema;
use crate::tree::QueryTreeNode;

/// Tabular result of executing a query subtree.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

/// Retrieves the full query tree for a root query.
#[async_trait]
pub trait TreeFetcher<K: Send + Sync + 'static>: Send + Sync {
    async fn fetch_tree(&self, root_id: i64) -> Result<QueryTreeNode<K>, FetchError>;
}

/// Retrieves the table/column/foreign-key schema of a database.
#[async_trait]
pub trait SchemaFetcher: Send + Sync {
    async fn fetch_schema(&self, database_id: i64) -> Result<Schema, FetchError>;
}

/// Executes the subtree rooted at one node of a root query.
#[async_trait]
pub trait SubqueryExecutor: Send + Sync {
    async fn execute_subquery(&self, root_id: i64, node_id: u64) -> anyhow::Result<ResultTable>;
}

/// Fire-and-forget user-facing notification sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_error(&self, title: &str);
}

/// Single-slot holder of the most recently produced result. Publishing
/// replaces, never appends; `None` clears the results view.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn set_query_result(&self, result: Option<ResultTable>);
}

/// Notifier that only logs, used where no UI is attached.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_error(&self, title: &str) {
        error!("{}", title);
    }
}

/// Result sink that only logs, used where no results view is attached.
pub struct LogResultSink;

#[async_trait]
impl ResultSink for LogResultSink {
    async fn set_query_result(&self, result: Option<ResultTable>) {
        match result {
            Some(table) => info!(
                "Query result: {} columns, {} rows",
                table.columns.len(),
                table.rows.len()
            ),
            None => info!("Query result cleared"),
        }
    }
}
