//! The [`Indexer`] owns everything shared by the sync pipeline, the manual
//! indexer and the settings reconciler: the metadata registry, index naming,
//! the remote index handles and the task tracker.

pub mod conditions;
pub mod extract;
pub mod registry;
pub mod tasks;

use crate::client::{RemoteIndex, SearchClient};
use crate::config::SyncConfig;
use crate::error::Result;
use crate::mapping::{IndexMetadata, MetadataLoader};
use crate::types::{ChangeSet, Entity, Record, TaskId};
use extract::{Extractor, PrimaryKey};
use registry::MetadataRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use tasks::TaskTracker;

/// How a caller-supplied index name is turned into the remote name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexNameOptions {
    /// Append the environment suffix.
    pub per_environment: bool,
    /// Apply any transformation at all. Off when the name is already the
    /// remote one.
    pub adapt_index_name: bool,
}

impl Default for IndexNameOptions {
    fn default() -> Self {
        IndexNameOptions {
            per_environment: true,
            adapt_index_name: true,
        }
    }
}

impl IndexNameOptions {
    /// The name is already final.
    pub fn exact() -> Self {
        IndexNameOptions {
            per_environment: false,
            adapt_index_name: false,
        }
    }
}

pub struct Indexer {
    client: Arc<dyn SearchClient>,
    registry: MetadataRegistry,
    environment: String,
    index_name_prefix: Option<String>,
    indices: HashMap<String, Arc<dyn RemoteIndex>>,
    tasks: TaskTracker,
}

impl Indexer {
    pub fn new(
        client: Arc<dyn SearchClient>,
        loader: Arc<dyn MetadataLoader>,
        environment: impl Into<String>,
    ) -> Self {
        Indexer {
            client,
            registry: MetadataRegistry::new(loader),
            environment: environment.into(),
            index_name_prefix: None,
            indices: HashMap::new(),
            tasks: TaskTracker::new(),
        }
    }

    pub fn from_config(
        client: Arc<dyn SearchClient>,
        loader: Arc<dyn MetadataLoader>,
        config: &SyncConfig,
    ) -> Self {
        let mut indexer = Self::new(client, loader, config.environment.clone());
        indexer.index_name_prefix = config.index_name_prefix.clone();
        indexer
    }

    pub fn with_index_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.index_name_prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn client(&self) -> &Arc<dyn SearchClient> {
        &self.client
    }

    pub fn registry(&self) -> &MetadataRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut MetadataRegistry {
        &mut self.registry
    }

    pub fn tasks(&self) -> &TaskTracker {
        &self.tasks
    }

    pub fn metadata(&mut self, class: &str) -> Result<Arc<IndexMetadata>> {
        self.registry.get(class)
    }

    pub fn has_metadata(&mut self, class: &str) -> bool {
        self.registry.has_metadata(class)
    }

    pub fn extractor(&mut self) -> Extractor<'_> {
        Extractor::new(&mut self.registry)
    }

    pub fn primary_key(
        &mut self,
        entity: &dyn Entity,
        changes: Option<&ChangeSet>,
    ) -> Result<PrimaryKey> {
        self.extractor().primary_key(entity, changes)
    }

    pub fn fields(&mut self, entity: &dyn Entity, changes: Option<&ChangeSet>) -> Result<Record> {
        self.extractor().fields(entity, changes, 0)
    }

    /// Remote index name of an entity class:
    /// `[prefix_]name[_environment]`.
    pub fn index_name(&mut self, class: &str) -> Result<String> {
        let meta = self.registry.get(class)?;
        let mut name = match &self.index_name_prefix {
            Some(prefix) => format!("{}_{}", prefix, meta.index.name),
            None => meta.index.name.clone(),
        };
        if meta.index.per_environment && !self.environment.is_empty() {
            name.push('_');
            name.push_str(&self.environment);
        }
        Ok(name)
    }

    pub fn make_env_index_name(&self, name: &str, per_environment: bool) -> String {
        if per_environment && !self.environment.is_empty() {
            format!("{}_{}", name, self.environment)
        } else {
            name.to_string()
        }
    }

    pub fn resolve_index_name(&self, name: &str, options: IndexNameOptions) -> String {
        if options.adapt_index_name {
            self.make_env_index_name(name, options.per_environment)
        } else {
            name.to_string()
        }
    }

    /// Memoized handle for a remote index name.
    pub fn index(&mut self, name: &str) -> Arc<dyn RemoteIndex> {
        if let Some(index) = self.indices.get(name) {
            return Arc::clone(index);
        }
        let index = self.client.init_index(name);
        self.indices.insert(name.to_string(), Arc::clone(&index));
        index
    }

    /// Drop the cached handle and pending task of an index that was moved
    /// or deleted remotely.
    pub fn forget_index(&mut self, name: &str) {
        self.indices.remove(name);
        self.tasks.forget(name);
    }

    pub fn record_task(&mut self, index_name: &str, task_id: TaskId) {
        let index = self.index(index_name);
        self.tasks.record(&index, task_id);
    }

    pub async fn delete_index(&mut self, name: &str, options: IndexNameOptions) -> Result<TaskId> {
        let name = self.resolve_index_name(name, options);
        let index = self.index(&name);
        let task_id = self.client.delete_index(&name).await?;
        tracing::info!("[SYNC {}] index deleted, task {}", name, task_id);
        self.tasks.record(&index, task_id);
        self.indices.remove(&name);
        Ok(task_id)
    }

    pub async fn set_index_settings(
        &mut self,
        name: &str,
        settings: Record,
        options: IndexNameOptions,
    ) -> Result<TaskId> {
        let name = self.resolve_index_name(name, options);
        let index = self.index(&name);
        let task_id = index.set_settings(settings).await?;
        self.tasks.record(&index, task_id);
        Ok(task_id)
    }

    /// Block until every remote write issued so far has been applied.
    pub async fn wait_for_tasks(&mut self) -> Result<()> {
        self.tasks.wait_all().await
    }
}
