use crate::client::RemoteIndex;
use crate::error::Result;
use crate::types::TaskId;
use indexmap::IndexMap;
use std::sync::Arc;

/// Highest outstanding task of one index, with the handle to wait on it.
///
/// The handle is kept so waiting never needs a fresh lookup, which for some
/// clients would recreate an index that was just deleted.
#[derive(Clone)]
pub struct PendingTask {
    pub index: Arc<dyn RemoteIndex>,
    pub task_id: TaskId,
}

/// Tracks, per index, the most recent remote task.
///
/// Task ids grow monotonically per index, so once the highest one is
/// published every earlier write is too.
#[derive(Default)]
pub struct TaskTracker {
    pending: IndexMap<String, PendingTask>,
}

impl TaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, index: &Arc<dyn RemoteIndex>, task_id: TaskId) {
        let name = index.name();
        match self.pending.get(name) {
            Some(existing) if existing.task_id >= task_id => {}
            _ => {
                tracing::debug!("[SYNC {}] tracking task {}", name, task_id);
                self.pending.insert(
                    name.to_string(),
                    PendingTask {
                        index: Arc::clone(index),
                        task_id,
                    },
                );
            }
        }
    }

    pub fn pending_task(&self, index_name: &str) -> Option<TaskId> {
        self.pending.get(index_name).map(|p| p.task_id)
    }

    /// Stop tracking `index_name`, for indexes that no longer exist.
    pub fn forget(&mut self, index_name: &str) {
        self.pending.shift_remove(index_name);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Wait for every tracked task. An index is forgotten as soon as its task
    /// is published; on error the remaining entries stay tracked.
    pub async fn wait_all(&mut self) -> Result<()> {
        while let Some((name, pending)) = self.pending.first() {
            let name = name.clone();
            let pending = pending.clone();
            tracing::info!("[SYNC {}] waiting for task {}", name, pending.task_id);
            pending.index.wait_task(pending.task_id).await?;
            self.pending.shift_remove(&name);
        }
        Ok(())
    }
}
