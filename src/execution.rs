use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::backend::{Notifier, ResultSink, SubqueryExecutor};
use crate::diagram::DiagramNode;
use crate::error::ExecutionError;

/// Async execution state of one diagram node. Created lazily on first
/// trigger, reset when the controller is cleared, never persisted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecutionState {
    pub is_executing: bool,
    pub last_error: Option<String>,
}

/// Drives per-node subquery execution for one root query.
///
/// Every node owns an independent state machine (idle -> executing ->
/// idle); concurrent executions on different nodes do not interact beyond
/// the shared single-slot result sink, where the last click wins. A second
/// trigger on a node that is already executing is a no-op, so two
/// identical requests can never race each other.
#[derive(Clone)]
pub struct ExecutionController {
    root_id: i64,
    executor: Arc<dyn SubqueryExecutor>,
    sink: Arc<dyn ResultSink>,
    notifier: Arc<dyn Notifier>,
    states: Arc<RwLock<HashMap<String, ExecutionState>>>,
    // Bumped on reset; responses from an older generation are dropped.
    generation: Arc<AtomicU64>,
}

impl ExecutionController {
    pub fn new(
        root_id: i64,
        executor: Arc<dyn SubqueryExecutor>,
        sink: Arc<dyn ResultSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            root_id,
            executor,
            sink,
            notifier,
            states: Arc::new(RwLock::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn root_id(&self) -> i64 {
        self.root_id
    }

    /// Execute the subtree rooted at `node` and publish the result.
    ///
    /// Nodes the graph builder marked non-executable are refused without
    /// touching the backend. On failure the notifier receives exactly one
    /// error toast and the sink stays untouched.
    pub async fn execute(&self, node: &DiagramNode) -> Result<(), ExecutionError> {
        if !node.data.executable {
            debug!("Ignoring trigger on non-executable node {}", node.id);
            return Err(ExecutionError::NotExecutable(node.id.clone()));
        }
        let node_id: u64 = node
            .id
            .parse()
            .map_err(|_| ExecutionError::InvalidNodeId(node.id.clone()))?;

        let generation = self.generation.load(Ordering::SeqCst);
        {
            let mut states = self.states.write().await;
            let state = states.entry(node.id.clone()).or_default();
            if state.is_executing {
                debug!("Node {} is already executing, ignoring trigger", node.id);
                return Ok(());
            }
            state.is_executing = true;
            state.last_error = None;
        }

        info!("Executing subquery {}/{}", self.root_id, node_id);
        let outcome = self.executor.execute_subquery(self.root_id, node_id).await;

        let stale = self.generation.load(Ordering::SeqCst) != generation;
        let mut states = self.states.write().await;
        let state = states.entry(node.id.clone()).or_default();
        state.is_executing = false;

        if stale {
            debug!("Dropping stale response for node {}", node.id);
            return Ok(());
        }

        match outcome {
            Ok(table) => {
                drop(states);
                self.sink.set_query_result(Some(table)).await;
                Ok(())
            }
            Err(err) => {
                state.last_error = Some(err.to_string());
                drop(states);
                self.notifier.notify_error("Error executing subquery").await;
                Err(ExecutionError::Backend(err))
            }
        }
    }

    /// Whether a node is currently executing (drives the disabled state of
    /// its trigger).
    pub async fn is_executing(&self, node_id: &str) -> bool {
        self.states
            .read()
            .await
            .get(node_id)
            .map(|s| s.is_executing)
            .unwrap_or(false)
    }

    pub async fn state(&self, node_id: &str) -> ExecutionState {
        self.states
            .read()
            .await
            .get(node_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Forget all node state and invalidate in-flight requests; used when
    /// the root query is switched and the diagram unmounts.
    pub async fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.states.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ResultTable;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::{Mutex, Notify};

    fn node(id: &str, executable: bool) -> DiagramNode {
        use crate::diagram::{NodeData, NodeKind, Position};
        DiagramNode {
            id: id.to_string(),
            kind: NodeKind::Ra,
            position: Position::default(),
            size: None,
            data: NodeData {
                label: id.to_string(),
                detail: Vec::new(),
                executable,
                ports: Vec::new(),
            },
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        results: Mutex<Vec<Option<ResultTable>>>,
    }

    #[async_trait]
    impl ResultSink for RecordingSink {
        async fn set_query_result(&self, result: Option<ResultTable>) {
            self.results.lock().await.push(result);
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        titles: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify_error(&self, title: &str) {
            self.titles.lock().await.push(title.to_string());
        }
    }

    struct FixedExecutor {
        calls: AtomicUsize,
        table: ResultTable,
    }

    impl FixedExecutor {
        fn new(table: ResultTable) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                table,
            }
        }
    }

    #[async_trait]
    impl SubqueryExecutor for FixedExecutor {
        async fn execute_subquery(&self, _root_id: i64, _node_id: u64) -> anyhow::Result<ResultTable> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.table.clone())
        }
    }

    struct FailingExecutor;

    #[async_trait]
    impl SubqueryExecutor for FailingExecutor {
        async fn execute_subquery(&self, _root_id: i64, _node_id: u64) -> anyhow::Result<ResultTable> {
            anyhow::bail!("syntax error at or near SELECT")
        }
    }

    /// Blocks until released, to hold a node in the executing state.
    struct GatedExecutor {
        calls: AtomicUsize,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl SubqueryExecutor for GatedExecutor {
        async fn execute_subquery(&self, _root_id: i64, _node_id: u64) -> anyhow::Result<ResultTable> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(ResultTable::default())
        }
    }

    fn controller(
        executor: Arc<dyn SubqueryExecutor>,
    ) -> (ExecutionController, Arc<RecordingSink>, Arc<RecordingNotifier>) {
        let sink = Arc::new(RecordingSink::default());
        let notifier = Arc::new(RecordingNotifier::default());
        (
            ExecutionController::new(42, executor, sink.clone(), notifier.clone()),
            sink,
            notifier,
        )
    }

    #[tokio::test]
    async fn success_publishes_result_once_and_returns_to_idle() {
        let table = ResultTable {
            columns: vec!["id".to_string()],
            rows: vec![vec![Some("1".to_string())]],
        };
        let (controller, sink, notifier) = controller(Arc::new(FixedExecutor::new(table.clone())));

        controller.execute(&node("7", true)).await.unwrap();

        let results = sink.results.lock().await;
        assert_eq!(results.as_slice(), &[Some(table)]);
        assert!(notifier.titles.lock().await.is_empty());
        assert!(!controller.is_executing("7").await);
    }

    #[tokio::test]
    async fn failure_notifies_once_and_leaves_sink_untouched() {
        let (controller, sink, notifier) = controller(Arc::new(FailingExecutor));

        let err = controller.execute(&node("7", true)).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Backend(_)));

        let titles = notifier.titles.lock().await;
        assert_eq!(titles.len(), 1);
        assert!(titles[0].contains("Error"));
        assert!(sink.results.lock().await.is_empty());
        assert!(!controller.is_executing("7").await);
        assert!(controller.state("7").await.last_error.is_some());
    }

    #[tokio::test]
    async fn non_executable_node_never_reaches_the_backend() {
        let executor = Arc::new(FixedExecutor::new(ResultTable::default()));
        let (controller, sink, _) = controller(executor.clone());

        let err = controller.execute(&node("7", false)).await.unwrap_err();
        assert!(matches!(err, ExecutionError::NotExecutable(_)));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
        assert!(sink.results.lock().await.is_empty());
    }

    #[tokio::test]
    async fn reentrant_trigger_is_a_no_op() {
        let gate = Arc::new(Notify::new());
        let executor = Arc::new(GatedExecutor {
            calls: AtomicUsize::new(0),
            gate: gate.clone(),
        });
        let (controller, _, _) = controller(executor.clone());

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.execute(&node("7", true)).await })
        };
        // Let the first request reach the backend and park.
        while executor.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert!(controller.is_executing("7").await);

        controller.execute(&node("7", true)).await.unwrap();
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);

        gate.notify_one();
        first.await.unwrap().unwrap();
        assert!(!controller.is_executing("7").await);
    }

    #[tokio::test]
    async fn response_arriving_after_reset_is_dropped() {
        let gate = Arc::new(Notify::new());
        let executor = Arc::new(GatedExecutor {
            calls: AtomicUsize::new(0),
            gate: gate.clone(),
        });
        let (controller, sink, _) = controller(executor.clone());

        let inflight = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.execute(&node("7", true)).await })
        };
        while executor.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        controller.reset().await;
        gate.notify_one();
        inflight.await.unwrap().unwrap();

        assert!(sink.results.lock().await.is_empty());
    }

    #[tokio::test]
    async fn executions_on_different_nodes_are_independent() {
        let (controller, sink, _) =
            controller(Arc::new(FixedExecutor::new(ResultTable::default())));

        controller.execute(&node("1", true)).await.unwrap();
        controller.execute(&node("2", true)).await.unwrap();

        // Last write wins in the single result slot.
        assert_eq!(sink.results.lock().await.len(), 2);
        assert!(!controller.is_executing("1").await);
        assert!(!controller.is_executing("2").await);
    }
}
