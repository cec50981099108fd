//! Per-class index mappings: which fields go where, and when.

pub mod index;
pub mod metadata;

pub use index::{Index, IndexSettings, ALGOLIA_SETTINGS_KEYS};
pub use metadata::{IndexIf, IndexMetadata, MetadataLoader, Method, Property, StaticLoader};
