//! Commit processor: turns staged records into per-index batches and sends
//! them.

use crate::error::Result;
use crate::indexer::Indexer;
use crate::sync::staged::StagedChanges;
use crate::types::{ObjectId, Record};
use indexmap::IndexMap;
use serde_json::Value;

/// Writes bound for one remote index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexBatch {
    pub deletions: Vec<ObjectId>,
    /// Full records, created or replaced.
    pub creations: Vec<Record>,
    /// Partial records; only the listed attributes are touched.
    pub updates: Vec<Record>,
}

impl IndexBatch {
    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.creations.is_empty() && self.updates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.deletions.len() + self.creations.len() + self.updates.len()
    }
}

/// Batches keyed by remote index name, in first-touched order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexBatches {
    batches: IndexMap<String, IndexBatch>,
}

fn with_object_id(mut fields: Record, object_id: ObjectId) -> Record {
    fields.insert("objectID".to_string(), Value::String(object_id));
    fields
}

impl IndexBatches {
    /// Compute every batch from `staged`. Keys and fields are read now, after
    /// the local commit, so freshly generated identifiers are visible.
    pub fn build(indexer: &mut Indexer, staged: &StagedChanges) -> Result<Self> {
        let mut batches = IndexBatches::default();

        for creation in &staged.creations {
            let entity = creation.entity.as_ref();
            let index_name = match &creation.index_name {
                Some(name) => name.clone(),
                None => indexer.index_name(entity.class_name())?,
            };
            let key = indexer.primary_key(entity, None)?;
            let fields = indexer.fields(entity, None)?;
            if fields.is_empty() {
                tracing::debug!("[SYNC {}] skipping creation with no fields", index_name);
                continue;
            }
            batches
                .entry(&index_name)
                .creations
                .push(with_object_id(fields, key.key));
        }

        for update in &staged.updates {
            let entity = update.entity.as_ref();
            let index_name = indexer.index_name(entity.class_name())?;
            let key = indexer.primary_key(entity, Some(&update.changes))?;

            match key.old_key {
                Some(old_key) => {
                    let fields = indexer.fields(entity, None)?;
                    let batch = batches.entry(&index_name);
                    batch.deletions.push(old_key);
                    if fields.is_empty() {
                        tracing::debug!("[SYNC {}] re-keyed object has no fields", index_name);
                    } else {
                        batch.creations.push(with_object_id(fields, key.key));
                    }
                }
                None => {
                    let fields = indexer.fields(entity, Some(&update.changes))?;
                    if fields.is_empty() {
                        tracing::debug!("[SYNC {}] skipping update with no fields", index_name);
                        continue;
                    }
                    batches
                        .entry(&index_name)
                        .updates
                        .push(with_object_id(fields, key.key));
                }
            }
        }

        for deletion in &staged.deletions {
            batches
                .entry(&deletion.index_name)
                .deletions
                .push(deletion.object_id.clone());
        }

        Ok(batches)
    }

    fn entry(&mut self, index_name: &str) -> &mut IndexBatch {
        self.batches.entry(index_name.to_string()).or_default()
    }

    pub fn get(&self, index_name: &str) -> Option<&IndexBatch> {
        self.batches.get(index_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexBatch)> {
        self.batches.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.batches.values().all(IndexBatch::is_empty)
    }

    /// Send every batch. Per index the order is deletions, then full writes,
    /// then partial updates, so a re-keyed object is removed before its new
    /// key is written. Each task id is handed to the tracker.
    pub async fn execute(self, indexer: &mut Indexer) -> Result<()> {
        for (index_name, batch) in self.batches {
            let index = indexer.index(&index_name);

            if !batch.deletions.is_empty() {
                let count = batch.deletions.len();
                let task_id = index.delete_objects(batch.deletions).await?;
                tracing::info!(
                    "[SYNC {}] deleted {} objects, task {}",
                    index_name,
                    count,
                    task_id
                );
                indexer.record_task(&index_name, task_id);
            }

            if !batch.creations.is_empty() {
                let count = batch.creations.len();
                let task_id = index.save_objects(batch.creations).await?;
                tracing::info!(
                    "[SYNC {}] saved {} objects, task {}",
                    index_name,
                    count,
                    task_id
                );
                indexer.record_task(&index_name, task_id);
            }

            if !batch.updates.is_empty() {
                let count = batch.updates.len();
                let task_id = index.partial_update_objects(batch.updates).await?;
                tracing::info!(
                    "[SYNC {}] updated {} objects, task {}",
                    index_name,
                    count,
                    task_id
                );
                indexer.record_task(&index_name, task_id);
            }
        }
        Ok(())
    }
}
