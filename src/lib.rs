//! # flapjack-sync
//!
//! Keeps a remote Algolia-compatible search index (flapjack or Algolia
//! itself) in step with a local entity store.
//!
//! Entity classes are mapped to indexes through [`IndexMetadata`]: which
//! fields are sent, which derived values are computed, which predicates
//! decide membership and which fields form the object id. The
//! [`SyncSubscriber`] hooks into the store's unit of work: it stages changes
//! before the local commit and sends them, batched per index, once the commit
//! is durable.
//!
//! ```rust,no_run
//! use flapjack_sync::{Indexer, IndexMetadata, PendingChanges, StaticLoader, SyncSubscriber,
//!     TransactionHooks};
//! use std::sync::Arc;
//!
//! # async fn run(client: Arc<dyn flapjack_sync::SearchClient>) -> flapjack_sync::Result<()> {
//! let loader = StaticLoader::new().with(
//!     IndexMetadata::new("app::Article")
//!         .property("title")
//!         .index_if("published", |a| a.bool_field("published")),
//! );
//! let indexer = Indexer::new(client, Arc::new(loader), "prod");
//! let mut sync = SyncSubscriber::new(indexer);
//!
//! sync.on_before_commit(&PendingChanges::new())?;
//! // ... local commit ...
//! sync.on_after_commit().await?;
//! sync.wait_for_tasks().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Outside the automatic pipeline, [`ManualIndexer`] reindexes and clears
//! whole classes and [`SettingsReconciler`] pushes declared index settings.

pub mod client;
pub mod config;
pub mod error;
pub mod indexer;
pub mod manual;
pub mod mapping;
pub mod search;
pub mod settings;
pub mod sync;
pub mod types;

pub use client::{RemoteIndex, SearchClient, SearchResponse};
pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use indexer::extract::{deserialize_primary_key, serialize_primary_key, PrimaryKey};
pub use indexer::{IndexNameOptions, Indexer};
pub use manual::{EntityStore, ManualIndexer, DEFAULT_BATCH_SIZE};
pub use mapping::{
    Index, IndexIf, IndexMetadata, IndexSettings, MetadataLoader, Method, Property, StaticLoader,
    ALGOLIA_SETTINGS_KEYS,
};
pub use search::{SearchOptions, SearchResult};
pub use settings::{DiffStatus, IndexDiff, SettingDelta, SettingsReconciler, SettingsReport};
pub use sync::{PendingChanges, SyncState, SyncSubscriber, TransactionHooks};
pub use types::*;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install a fmt subscriber filtered by `RUST_LOG` (default `info`). Does
/// nothing when a global subscriber is already set.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
