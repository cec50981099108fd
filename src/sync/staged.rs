//! Records staged during the detect phase, waiting for the local commit.

use crate::error::Result;
use crate::indexer::conditions::{self, Transition};
use crate::indexer::Indexer;
use crate::types::{ChangeSet, Entity, FieldSnapshot, ObjectId};
use std::sync::Arc;

/// Entity to send in full. The object id is only read at commit time since a
/// freshly inserted entity may not have one yet.
#[derive(Clone)]
pub struct Creation {
    pub entity: Arc<dyn Entity>,
    /// Target index override; defaults to the class's index.
    pub index_name: Option<String>,
}

/// Entity to patch. The change-set is captured now, it is gone after commit.
#[derive(Clone)]
pub struct Update {
    pub entity: Arc<dyn Entity>,
    pub changes: ChangeSet,
}

/// Object to remove, keyed while the entity was still readable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deletion {
    pub object_id: ObjectId,
    pub index_name: String,
}

/// One cycle's staged work.
#[derive(Clone, Default)]
pub struct StagedChanges {
    pub creations: Vec<Creation>,
    pub updates: Vec<Update>,
    pub deletions: Vec<Deletion>,
}

impl StagedChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.creations.len() + self.updates.len() + self.deletions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.creations.clear();
        self.updates.clear();
        self.deletions.clear();
    }

    /// Stage `entity` for a full write when its predicates allow it. Pass
    /// `check_conditions = false` when the caller already evaluated them.
    pub fn schedule_creation(
        &mut self,
        indexer: &mut Indexer,
        entity: Arc<dyn Entity>,
        index_name: Option<String>,
        check_conditions: bool,
    ) -> Result<bool> {
        if check_conditions {
            let meta = indexer.metadata(entity.class_name())?;
            if !conditions::should_index(&meta, entity.as_ref()) {
                tracing::debug!("[SYNC] {} filtered out on creation", entity.class_name());
                return Ok(false);
            }
        }
        self.creations.push(Creation { entity, index_name });
        Ok(true)
    }

    pub fn schedule_update(
        &mut self,
        indexer: &mut Indexer,
        entity: Arc<dyn Entity>,
        changes: ChangeSet,
    ) -> Result<Transition> {
        let meta = indexer.metadata(entity.class_name())?;
        let transition =
            conditions::should_index_for_update(&meta, entity.as_ref(), &changes).transition();
        tracing::debug!(
            "[SYNC] {} update classified as {:?}",
            entity.class_name(),
            transition
        );

        match transition {
            Transition::Update => self.updates.push(Update { entity, changes }),
            Transition::Enter => {
                self.schedule_creation(indexer, entity, None, false)?;
            }
            Transition::Leave => self.push_deletion(indexer, entity.as_ref(), Some(&changes))?,
            Transition::Skip => {}
        }
        Ok(transition)
    }

    /// Stage removal of `entity`. With an original snapshot, entities whose
    /// predicates did not hold before the deletion are skipped: they were never
    /// indexed.
    pub fn schedule_deletion(
        &mut self,
        indexer: &mut Indexer,
        entity: &dyn Entity,
        original: Option<&FieldSnapshot>,
    ) -> Result<bool> {
        if let Some(original) = original {
            let meta = indexer.metadata(entity.class_name())?;
            if !conditions::should_have_been_indexed(&meta, entity, original) {
                tracing::debug!(
                    "[SYNC] {} was never indexed, skipping deletion",
                    entity.class_name()
                );
                return Ok(false);
            }
        }

        self.push_deletion(indexer, entity, None)?;
        Ok(true)
    }

    /// The remote object still carries the pre-update key when the same update
    /// also changed an identifier field.
    fn push_deletion(
        &mut self,
        indexer: &mut Indexer,
        entity: &dyn Entity,
        changes: Option<&ChangeSet>,
    ) -> Result<()> {
        let key = indexer.primary_key(entity, changes)?;
        let index_name = indexer.index_name(entity.class_name())?;
        self.deletions.push(Deletion {
            object_id: key.old_key.unwrap_or(key.key),
            index_name,
        });
        Ok(())
    }
}
