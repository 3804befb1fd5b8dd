use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Persists editor content; the embedding shell decides the route.
#[async_trait]
pub trait SaveOperation: Send + Sync {
    async fn save(&self, content: &str) -> anyhow::Result<()>;
}

/// Lifecycle of the debounced save machine. `Pending` means a timer is
/// armed; rescheduling rewinds it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AutosaveStatus {
    #[default]
    Idle,
    Pending,
    Saving,
    Saved,
    Error,
}

/// Debounced autosave for the text editors that sit beside the diagram.
///
/// An explicit timer-based state machine: every `schedule` call replaces
/// the armed timer, so a burst of keystrokes collapses into one save of
/// the latest content once the delay elapses.
#[derive(Clone)]
pub struct Autosaver {
    delay: Duration,
    operation: Arc<dyn SaveOperation>,
    status: Arc<RwLock<AutosaveStatus>>,
    pending: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Autosaver {
    pub fn new(operation: Arc<dyn SaveOperation>, delay: Duration) -> Self {
        Self {
            delay,
            operation,
            status: Arc::new(RwLock::new(AutosaveStatus::default())),
            pending: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn status(&self) -> AutosaveStatus {
        *self.status.read().await
    }

    /// Arm (or rewind) the save timer for the given content.
    pub async fn schedule(&self, content: String) {
        let mut pending = self.pending.lock().await;
        if let Some(timer) = pending.take() {
            timer.abort();
        }
        *self.status.write().await = AutosaveStatus::Pending;

        let this = self.clone();
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(this.delay).await;
            this.run_save(&content).await;
        }));
    }

    async fn run_save(&self, content: &str) {
        *self.status.write().await = AutosaveStatus::Saving;
        match self.operation.save(content).await {
            Ok(()) => {
                debug!("Autosave completed ({} bytes)", content.len());
                *self.status.write().await = AutosaveStatus::Saved;
            }
            Err(err) => {
                warn!("Autosave failed: {}", err);
                *self.status.write().await = AutosaveStatus::Error;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSave {
        saves: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SaveOperation for RecordingSave {
        async fn save(&self, content: &str) -> anyhow::Result<()> {
            self.saves.lock().await.push(content.to_string());
            Ok(())
        }
    }

    struct FailingSave;

    #[async_trait]
    impl SaveOperation for FailingSave {
        async fn save(&self, _content: &str) -> anyhow::Result<()> {
            anyhow::bail!("409 conflict")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_edits_collapse_into_one_save_of_the_latest_content() {
        let operation = Arc::new(RecordingSave::default());
        let saver = Autosaver::new(operation.clone(), Duration::from_millis(500));

        saver.schedule("SELECT 1".to_string()).await;
        saver.schedule("SELECT 1, 2".to_string()).await;
        assert_eq!(saver.status().await, AutosaveStatus::Pending);

        tokio::time::sleep(Duration::from_millis(600)).await;
        tokio::task::yield_now().await;

        assert_eq!(
            operation.saves.lock().await.as_slice(),
            &["SELECT 1, 2".to_string()]
        );
        assert_eq!(saver.status().await, AutosaveStatus::Saved);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_ends_in_error_state() {
        let saver = Autosaver::new(Arc::new(FailingSave), Duration::from_millis(100));
        saver.schedule("SELECT".to_string()).await;

        tokio::time::sleep(Duration::from_millis(200)).await;
        tokio::task::yield_now().await;

        assert_eq!(saver.status().await, AutosaveStatus::Error);
    }
}
