//! Remote search-index capabilities consumed by the pipeline.
//!
//! Every write returns the remote task id; the remote service applies the
//! write asynchronously and [`RemoteIndex::wait_task`] blocks until it has.

use crate::error::Result;
use crate::types::{ObjectId, Record, TaskId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Raw search response. `hits` carry the remote `objectID`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Vec<Record>,
    #[serde(rename = "nbHits", default)]
    pub nb_hits: u64,
    #[serde(default)]
    pub page: u64,
    #[serde(rename = "nbPages", default)]
    pub nb_pages: u64,
    #[serde(rename = "hitsPerPage", default)]
    pub hits_per_page: u64,
    #[serde(default)]
    pub query: String,
    /// Everything else the service returned (facets, processing time, ...).
    #[serde(flatten)]
    pub extra: Record,
}

/// Handle to one remote index.
#[async_trait]
pub trait RemoteIndex: Send + Sync {
    fn name(&self) -> &str;

    /// Create or fully replace objects. Each record carries its `objectID`.
    async fn save_objects(&self, objects: Vec<Record>) -> Result<TaskId>;

    /// Patch the listed attributes of existing objects.
    async fn partial_update_objects(&self, objects: Vec<Record>) -> Result<TaskId>;

    async fn delete_objects(&self, object_ids: Vec<ObjectId>) -> Result<TaskId>;

    /// Remove every object, keeping settings.
    async fn clear_objects(&self) -> Result<TaskId>;

    /// `None` when the index does not exist remotely.
    async fn get_settings(&self) -> Result<Option<Record>>;

    async fn set_settings(&self, settings: Record) -> Result<TaskId>;

    async fn search(&self, query: &str, params: &Record) -> Result<SearchResponse>;

    async fn wait_task(&self, task_id: TaskId) -> Result<()>;
}

/// Application-level client: hands out index handles and runs index-level
/// operations.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Local handle only; no network round-trip, and the index is not created
    /// remotely until something is written to it.
    fn init_index(&self, name: &str) -> Arc<dyn RemoteIndex>;

    async fn delete_index(&self, name: &str) -> Result<TaskId>;

    /// Atomically replace `destination` with `source`. The returned task
    /// belongs to `destination`.
    async fn move_index(&self, source: &str, destination: &str) -> Result<TaskId>;
}
