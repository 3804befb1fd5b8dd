use thiserror::Error;

/// Failure to retrieve a query tree or database schema from the backend.
///
/// Surfaced once through the notification collaborator; the diagram keeps
/// its last-known (or empty) state and waits for the next manual refetch.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed")]
    Transport(#[source] anyhow::Error),
    #[error("malformed payload")]
    Malformed(#[from] serde_json::Error),
}

/// Failure to execute a subquery for a single diagram node.
///
/// Never fatal: the node returns to idle and no partial result is
/// published.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("node {0} has validation errors and cannot be executed")]
    NotExecutable(String),
    #[error("node id {0} is not a backend-assigned numeric id")]
    InvalidNodeId(String),
    #[error("subquery execution failed")]
    Backend(#[source] anyhow::Error),
}

/// Failure inside the layout computation.
///
/// Recovered locally by leaving nodes at the origin; logged, never shown
/// to the user.
#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("edge {edge} references unknown node {node}")]
    UnknownNode { edge: String, node: String },
    #[error("layout task was cancelled")]
    Cancelled,
}
