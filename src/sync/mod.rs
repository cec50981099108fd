//! Automatic synchronization driven by the host store's unit of work.
//!
//! The store adapter calls [`TransactionHooks::on_before_commit`] with the
//! pending changes while entities still hold their pre-commit state, then
//! [`TransactionHooks::on_after_commit`] once the local transaction is
//! durable. Nothing is sent remotely before the local commit succeeds.

pub mod commit;
pub mod staged;

use crate::config::SyncConfig;
use crate::error::Result;
use crate::indexer::Indexer;
use crate::types::{ChangeSet, Entity, FieldSnapshot};
use async_trait::async_trait;
use commit::IndexBatches;
use staged::StagedChanges;
use std::sync::Arc;

/// Changes scheduled in the host unit of work.
#[derive(Clone, Default)]
pub struct PendingChanges {
    pub insertions: Vec<Arc<dyn Entity>>,
    pub updates: Vec<(Arc<dyn Entity>, ChangeSet)>,
    /// Deleted entities with their field values as loaded from the store.
    pub deletions: Vec<(Arc<dyn Entity>, FieldSnapshot)>,
}

impl PendingChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, entity: Arc<dyn Entity>) -> Self {
        self.insertions.push(entity);
        self
    }

    pub fn update(mut self, entity: Arc<dyn Entity>, changes: ChangeSet) -> Self {
        self.updates.push((entity, changes));
        self
    }

    pub fn delete(mut self, entity: Arc<dyn Entity>, original: FieldSnapshot) -> Self {
        self.deletions.push((entity, original));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.insertions.is_empty() && self.updates.is_empty() && self.deletions.is_empty()
    }
}

/// Lifecycle callbacks a store adapter drives around each local commit.
#[async_trait]
pub trait TransactionHooks: Send {
    fn on_before_commit(&mut self, pending: &PendingChanges) -> Result<()>;

    async fn on_after_commit(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Detecting,
    Committing,
}

/// Change collector and commit processor bound to one unit-of-work
/// lifecycle.
pub struct SyncSubscriber {
    indexer: Indexer,
    staged: StagedChanges,
    catch_and_log_exceptions: bool,
    state: SyncState,
}

impl SyncSubscriber {
    pub fn new(indexer: Indexer) -> Self {
        SyncSubscriber {
            indexer,
            staged: StagedChanges::new(),
            catch_and_log_exceptions: false,
            state: SyncState::Idle,
        }
    }

    pub fn from_config(indexer: Indexer, config: &SyncConfig) -> Self {
        Self::new(indexer).catch_and_log_exceptions(config.catch_and_log_exceptions)
    }

    /// Log detection and commit failures instead of returning them.
    pub fn catch_and_log_exceptions(mut self, enabled: bool) -> Self {
        self.catch_and_log_exceptions = enabled;
        self
    }

    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    pub fn indexer_mut(&mut self) -> &mut Indexer {
        &mut self.indexer
    }

    pub fn staged(&self) -> &StagedChanges {
        &self.staged
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub async fn wait_for_tasks(&mut self) -> Result<()> {
        self.indexer.wait_for_tasks().await
    }

    /// Classes without a mapping, or mapped with auto-indexing off, are left
    /// to the manual indexer.
    fn is_auto_indexed(&mut self, class: &str) -> bool {
        self.indexer
            .registry_mut()
            .resolve(class)
            .is_some_and(|meta| meta.index.auto_index)
    }

    fn detect(&mut self, pending: &PendingChanges) -> Result<()> {
        for entity in &pending.insertions {
            if !self.is_auto_indexed(entity.class_name()) {
                continue;
            }
            self.staged
                .schedule_creation(&mut self.indexer, Arc::clone(entity), None, true)?;
        }

        for (entity, changes) in &pending.updates {
            if !self.is_auto_indexed(entity.class_name()) {
                continue;
            }
            self.staged
                .schedule_update(&mut self.indexer, Arc::clone(entity), changes.clone())?;
        }

        for (entity, original) in &pending.deletions {
            if !self.is_auto_indexed(entity.class_name()) {
                continue;
            }
            self.staged
                .schedule_deletion(&mut self.indexer, entity.as_ref(), Some(original))?;
        }

        tracing::debug!("[SYNC] staged {} records", self.staged.len());
        Ok(())
    }

    async fn commit(&mut self, staged: StagedChanges) -> Result<()> {
        let batches = IndexBatches::build(&mut self.indexer, &staged)?;
        batches.execute(&mut self.indexer).await
    }

    fn handle_failure(&self, phase: &str, result: Result<()>) -> Result<()> {
        match result {
            Err(e) if self.catch_and_log_exceptions => {
                tracing::error!("[SYNC] {} failed: {}", phase, e);
                Ok(())
            }
            other => other,
        }
    }
}

#[async_trait]
impl TransactionHooks for SyncSubscriber {
    fn on_before_commit(&mut self, pending: &PendingChanges) -> Result<()> {
        self.state = SyncState::Detecting;
        self.staged.clear();

        let result = self.detect(pending);
        if result.is_err() {
            self.staged.clear();
        }

        self.state = SyncState::Idle;
        self.handle_failure("change detection", result)
    }

    async fn on_after_commit(&mut self) -> Result<()> {
        self.state = SyncState::Committing;
        let staged = std::mem::take(&mut self.staged);

        let result = if staged.is_empty() {
            Ok(())
        } else {
            self.commit(staged).await
        };

        self.state = SyncState::Idle;
        self.handle_failure("commit", result)
    }
}
