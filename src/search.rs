//! Raw and hydrated search against the remote indexes.

use crate::client::SearchResponse;
use crate::error::{Result, SyncError};
use crate::indexer::extract::deserialize_primary_key;
use crate::indexer::{IndexNameOptions, Indexer};
use crate::manual::EntityStore;
use crate::types::{Entity, Record};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Search parameters plus the two naming options, which are never sent.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub per_environment: bool,
    pub adapt_index_name: bool,
    /// Remote search parameters (`hitsPerPage`, `filters`, ...).
    pub params: Record,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            per_environment: true,
            adapt_index_name: true,
            params: Record::new(),
        }
    }
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a loose option map: `perEnvironment` and `adaptIndexName` become
    /// naming options, everything else is a search parameter.
    pub fn from_params(mut params: Record) -> Self {
        let mut options = SearchOptions::default();
        if let Some(Value::Bool(b)) = params.remove("perEnvironment") {
            options.per_environment = b;
        }
        if let Some(Value::Bool(b)) = params.remove("adaptIndexName") {
            options.adapt_index_name = b;
        }
        options.params = params;
        options
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn per_environment(mut self, per_environment: bool) -> Self {
        self.per_environment = per_environment;
        self
    }

    pub fn adapt_index_name(mut self, adapt: bool) -> Self {
        self.adapt_index_name = adapt;
        self
    }

    fn naming(&self) -> IndexNameOptions {
        IndexNameOptions {
            per_environment: self.per_environment,
            adapt_index_name: self.adapt_index_name,
        }
    }
}

pub struct SearchResult {
    pub response: SearchResponse,
    /// Local entities for each hit, when searched by class.
    pub hydrated: Option<Vec<Arc<dyn Entity>>>,
}

impl fmt::Debug for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hydrated: Option<Vec<&str>> = self
            .hydrated
            .as_ref()
            .map(|entities| entities.iter().map(|e| e.class_name()).collect());
        f.debug_struct("SearchResult")
            .field("response", &self.response)
            .field("hydrated", &hydrated)
            .finish()
    }
}

impl SearchResult {
    pub fn is_hydrated(&self) -> bool {
        self.hydrated.is_some()
    }

    pub fn hits(&self) -> &[Record] {
        &self.response.hits
    }

    pub fn nb_hits(&self) -> u64 {
        self.response.nb_hits
    }
}

impl Indexer {
    pub async fn raw_search(
        &mut self,
        index_name: &str,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResult> {
        let index_name = self.resolve_index_name(index_name, options.naming());
        let index = self.index(&index_name);
        let response = index.search(query, &options.params).await?;
        tracing::debug!(
            "[SYNC {}] query {:?} returned {} hits",
            index_name,
            query,
            response.nb_hits
        );
        Ok(SearchResult {
            response,
            hydrated: None,
        })
    }

    /// Search the index of `entity_name` and load every hit from `store`.
    /// Hits the store no longer has are dropped.
    pub async fn search(
        &mut self,
        store: &dyn EntityStore,
        entity_name: &str,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResult> {
        let class = store
            .resolve_class(entity_name)
            .unwrap_or_else(|| entity_name.to_string());
        if !self.has_metadata(&class) {
            return Err(SyncError::NotAnAlgoliaEntity {
                field: String::new(),
                class,
            });
        }

        let index_name = self.index_name(&class)?;
        let options = options.clone().adapt_index_name(false);
        let mut result = self.raw_search(&index_name, query, &options).await?;

        let mut hydrated = Vec::with_capacity(result.response.hits.len());
        for hit in &result.response.hits {
            let Some(object_id) = hit.get("objectID").and_then(Value::as_str) else {
                tracing::warn!("[SYNC {}] hit without objectID", index_name);
                continue;
            };
            let id = deserialize_primary_key(object_id)?;
            match store.find(&class, &id)? {
                Some(entity) => hydrated.push(entity),
                None => tracing::debug!(
                    "[SYNC {}] hit {} missing from the store",
                    index_name,
                    object_id
                ),
            }
        }

        result.hydrated = Some(hydrated);
        Ok(result)
    }
}
