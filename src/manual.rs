//! Explicit indexing outside the automatic pipeline: bulk reindex, clear,
//! and ad-hoc index/unindex of entity lists.

use crate::error::{Result, SyncError};
use crate::indexer::Indexer;
use crate::sync::commit::IndexBatches;
use crate::sync::staged::StagedChanges;
use crate::types::{Entity, Record, TaskId};
use std::sync::Arc;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Suffix of the scratch index a safe reindex writes into.
pub const TEMP_INDEX_SUFFIX: &str = "__TEMP";

/// Read access to the local store.
pub trait EntityStore: Send + Sync {
    /// Every entity class the store manages.
    fn entity_classes(&self) -> Vec<String>;

    /// Canonical class for a user-supplied entity name or alias.
    fn resolve_class(&self, name: &str) -> Option<String>;

    fn count(&self, class: &str) -> Result<usize>;

    /// Entities `offset..offset + limit` in a stable order.
    fn load_batch(&self, class: &str, offset: usize, limit: usize) -> Result<Vec<Arc<dyn Entity>>>;

    /// Look up one entity by its identifier values.
    fn find(&self, class: &str, id: &Record) -> Result<Option<Arc<dyn Entity>>>;
}

pub struct ManualIndexer<'a> {
    indexer: &'a mut Indexer,
    store: &'a dyn EntityStore,
}

impl<'a> ManualIndexer<'a> {
    pub fn new(indexer: &'a mut Indexer, store: &'a dyn EntityStore) -> Self {
        ManualIndexer { indexer, store }
    }

    /// Send the entities that pass their predicates, in full. `index_name`
    /// is a final remote name overriding the class's index.
    pub async fn index(
        &mut self,
        entities: &[Arc<dyn Entity>],
        index_name: Option<&str>,
    ) -> Result<usize> {
        let mut staged = StagedChanges::new();
        let mut count = 0;
        for entity in entities {
            if staged.schedule_creation(
                self.indexer,
                Arc::clone(entity),
                index_name.map(str::to_string),
                true,
            )? {
                count += 1;
            }
        }
        self.send(&staged).await?;
        Ok(count)
    }

    pub async fn unindex(&mut self, entities: &[Arc<dyn Entity>]) -> Result<usize> {
        let mut staged = StagedChanges::new();
        for entity in entities {
            staged.schedule_deletion(self.indexer, entity.as_ref(), None)?;
        }
        let count = staged.deletions.len();
        self.send(&staged).await?;
        Ok(count)
    }

    /// Remove every object from the class's index. Settings are kept.
    pub async fn clear(&mut self, class: &str) -> Result<TaskId> {
        let index_name = self.indexer.index_name(class)?;
        let index = self.indexer.index(&index_name);
        let task_id = index.clear_objects().await?;
        tracing::info!("[SYNC {}] cleared, task {}", index_name, task_id);
        self.indexer.record_task(&index_name, task_id);
        Ok(task_id)
    }

    /// Rebuild the class's index from the store.
    ///
    /// Unsafe mode writes in place, leaving objects that no longer exist
    /// locally. Safe mode writes a scratch index carrying the live settings
    /// and then moves it over the live one.
    pub async fn reindex(&mut self, class: &str, batch_size: usize, safe: bool) -> Result<usize> {
        let batch_size = if batch_size == 0 {
            tracing::warn!(
                "[SYNC] invalid batch size 0, assuming {}",
                DEFAULT_BATCH_SIZE
            );
            DEFAULT_BATCH_SIZE
        } else {
            batch_size
        };

        let live_name = self.indexer.index_name(class)?;
        let temp_name = format!("{}{}", live_name, TEMP_INDEX_SUFFIX);
        let target: &str = if safe { &temp_name } else { &live_name };
        let settings_copied = safe && self.copy_settings(&live_name, &temp_name).await?;

        let total = self.store.count(class)?;
        tracing::info!(
            "[SYNC {}] reindexing {} {} entities in batches of {}",
            target,
            total,
            class,
            batch_size
        );

        let mut indexed = 0;
        let mut offset = 0;
        while offset < total {
            let entities = self.store.load_batch(class, offset, batch_size)?;
            if entities.is_empty() {
                break;
            }
            offset += entities.len();
            indexed += self.index(&entities, Some(target)).await?;
            tracing::debug!("[SYNC {}] {}/{} loaded", target, offset, total);
        }

        if safe {
            if indexed == 0 && !settings_copied {
                // The scratch index was never written, so it does not exist remotely.
                self.clear(class).await?;
            } else {
                let task_id = self
                    .indexer
                    .client()
                    .move_index(&temp_name, &live_name)
                    .await?;
                tracing::info!(
                    "[SYNC {}] moved {} over it, task {}",
                    live_name,
                    temp_name,
                    task_id
                );
                self.indexer.forget_index(&temp_name);
                self.indexer.record_task(&live_name, task_id);
            }
        }

        Ok(indexed)
    }

    /// Reindex every mapped store class, or the single class `filter`
    /// resolves to. Returns the number of entities indexed.
    pub async fn reindex_all(
        &mut self,
        filter: Option<&str>,
        batch_size: usize,
        safe: bool,
    ) -> Result<usize> {
        let mut indexed = 0;
        for class in self.classes(filter)? {
            indexed += self.reindex(&class, batch_size, safe).await?;
        }
        Ok(indexed)
    }

    /// Clear every mapped store class, or the one `filter` resolves to.
    /// Returns the number of indexes cleared.
    pub async fn clear_all(&mut self, filter: Option<&str>) -> Result<usize> {
        let classes = self.classes(filter)?;
        for class in &classes {
            self.clear(class).await?;
        }
        Ok(classes.len())
    }

    fn classes(&mut self, filter: Option<&str>) -> Result<Vec<String>> {
        let wanted = match filter {
            Some(name) => Some(
                self.store
                    .resolve_class(name)
                    .ok_or_else(|| SyncError::UnknownEntity(format!("Unknown entity `{}`", name)))?,
            ),
            None => None,
        };

        let mut classes = Vec::new();
        for class in self.store.entity_classes() {
            if wanted.as_ref().is_some_and(|w| *w != class) {
                continue;
            }
            if self.indexer.has_metadata(&class) {
                classes.push(class);
            }
        }
        Ok(classes)
    }

    /// Returns whether anything was copied.
    async fn copy_settings(&mut self, from: &str, to: &str) -> Result<bool> {
        let source = self.indexer.index(from);
        let settings = match source.get_settings().await? {
            Some(settings) if !settings.is_empty() => settings,
            _ => return Ok(false),
        };
        let scratch = self.indexer.index(to);
        let task_id = scratch.set_settings(settings).await?;
        self.indexer.record_task(to, task_id);
        Ok(true)
    }

    async fn send(&mut self, staged: &StagedChanges) -> Result<()> {
        if staged.is_empty() {
            return Ok(());
        }
        IndexBatches::build(self.indexer, staged)?
            .execute(self.indexer)
            .await
    }
}
