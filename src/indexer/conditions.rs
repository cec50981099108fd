//! Conditional indexing: whether an entity belongs in its index.

use crate::mapping::IndexMetadata;
use crate::types::{ChangeSet, Entity, FieldSnapshot};

/// Index membership of an entity across a pending update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub needs_indexing_now: bool,
    pub was_indexed_before: bool,
}

/// What a pending update means for the remote index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Indexed before and after: patch the changed fields.
    Update,
    /// Became visible: send the full record.
    Enter,
    /// Stopped being visible: remove it.
    Leave,
    /// Invisible before and after.
    Skip,
}

impl Visibility {
    pub fn transition(&self) -> Transition {
        match (self.needs_indexing_now, self.was_indexed_before) {
            (true, true) => Transition::Update,
            (true, false) => Transition::Enter,
            (false, true) => Transition::Leave,
            (false, false) => Transition::Skip,
        }
    }
}

pub fn should_index(meta: &IndexMetadata, entity: &dyn Entity) -> bool {
    meta.index_ifs.iter().all(|cond| cond.evaluate(entity))
}

/// Both flags are conjunctions over all predicates, so every diff is
/// evaluated even once one flag is already false.
pub fn should_index_for_update(
    meta: &IndexMetadata,
    entity: &dyn Entity,
    changes: &ChangeSet,
) -> Visibility {
    let mut visibility = Visibility {
        needs_indexing_now: true,
        was_indexed_before: true,
    };
    for cond in &meta.index_ifs {
        let (now, before) = cond.diff(entity, changes);
        visibility.needs_indexing_now &= now;
        visibility.was_indexed_before &= before;
    }
    visibility
}

pub fn should_have_been_indexed(
    meta: &IndexMetadata,
    entity: &dyn Entity,
    original: &FieldSnapshot,
) -> bool {
    meta.index_ifs
        .iter()
        .all(|cond| cond.evaluate_with(entity, original))
}
