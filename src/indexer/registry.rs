use crate::error::{Result, SyncError};
use crate::mapping::{IndexMetadata, MetadataLoader};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Per-class metadata cache in front of a [`MetadataLoader`].
///
/// A class is looked up through the loader at most once: mapped classes are
/// cached, unmapped ones land in the ignored set for the registry's lifetime.
pub struct MetadataRegistry {
    loader: Arc<dyn MetadataLoader>,
    resolved: HashMap<String, Arc<IndexMetadata>>,
    ignored: HashSet<String>,
}

impl MetadataRegistry {
    pub fn new(loader: Arc<dyn MetadataLoader>) -> Self {
        MetadataRegistry {
            loader,
            resolved: HashMap::new(),
            ignored: HashSet::new(),
        }
    }

    pub fn resolve(&mut self, class: &str) -> Option<Arc<IndexMetadata>> {
        if self.ignored.contains(class) {
            return None;
        }
        if let Some(meta) = self.resolved.get(class) {
            return Some(Arc::clone(meta));
        }

        match self.loader.load(class) {
            Some(meta) => {
                tracing::debug!("[SYNC] resolved metadata for {}", class);
                let meta = Arc::new(meta);
                self.resolved.insert(class.to_string(), Arc::clone(&meta));
                Some(meta)
            }
            None => {
                tracing::debug!("[SYNC] {} has no index mapping, ignoring", class);
                self.ignored.insert(class.to_string());
                None
            }
        }
    }

    pub fn has_metadata(&mut self, class: &str) -> bool {
        self.resolve(class).is_some()
    }

    /// Metadata that must exist.
    pub fn get(&mut self, class: &str) -> Result<Arc<IndexMetadata>> {
        self.resolve(class).ok_or_else(|| {
            SyncError::UnknownEntity(format!("No entity class `{}` in metadata index", class))
        })
    }

    pub fn is_ignored(&self, class: &str) -> bool {
        self.ignored.contains(class)
    }

    /// Classes resolved so far.
    pub fn resolved(&self) -> impl Iterator<Item = (&str, &Arc<IndexMetadata>)> {
        self.resolved.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn reset(&mut self) {
        self.resolved.clear();
        self.ignored.clear();
    }
}
