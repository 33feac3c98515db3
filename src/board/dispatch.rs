#![forbid(unsafe_code)]

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::board::controller::StatusChangeRequester;
use crate::task::model::{Task, TaskStatus};
use crate::task::storage::TaskStorage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub task_id: String,
    pub status: TaskStatus,
}

#[derive(Debug)]
pub struct StatusChangeResult {
    pub change: StatusChange,
    pub outcome: Result<Task, String>,
}

/// Fire-and-forget requester: queues the change and returns immediately.
#[derive(Debug, Clone)]
pub struct StatusDispatcher {
    tx: mpsc::UnboundedSender<StatusChange>,
}

impl StatusDispatcher {
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<StatusChange>) -> Self {
        Self { tx }
    }

    /// A dispatcher plus the receiving end to hand to [`spawn_status_worker`].
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StatusChange>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl StatusChangeRequester for StatusDispatcher {
    fn request_status_change(&mut self, task_id: &str, new_status: TaskStatus) {
        let change = StatusChange {
            task_id: task_id.to_owned(),
            status: new_status,
        };
        if self.tx.send(change).is_err() {
            tracing::warn!(task_id, "status worker gone; change dropped");
        }
    }
}

/// Applies queued status changes to `storage` in arrival order and reports each result.
///
/// Every change is attempted once. The worker stops when either channel closes.
pub fn spawn_status_worker(
    storage: TaskStorage,
    mut requests: mpsc::UnboundedReceiver<StatusChange>,
    results: mpsc::UnboundedSender<StatusChangeResult>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(change) = requests.recv().await {
            let store = storage.clone();
            let req = change.clone();
            let write =
                tokio::task::spawn_blocking(move || store.update_status(&req.task_id, req.status));
            let outcome = match write.await {
                Ok(Ok(task)) => Ok(task),
                Ok(Err(e)) => Err(format!("{e:#}")),
                Err(e) => Err(format!("status update task failed: {e}")),
            };

            match &outcome {
                Ok(_) => tracing::info!(
                    task_id = %change.task_id,
                    status = %change.status,
                    "status change applied"
                ),
                Err(e) => tracing::warn!(
                    task_id = %change.task_id,
                    status = %change.status,
                    error = %e,
                    "status change failed"
                ),
            }

            if results.send(StatusChangeResult { change, outcome }).is_err() {
                break;
            }
        }
    })
}
