//! HTTP implementation of the `flapjack-sync` remote client traits.
//!
//! Talks to the Algolia REST API, either hosted (`https://{app}-dsn.algolia.net`)
//! or served by a flapjack instance configured through `SyncConfig::host`.

pub mod client;
pub mod types;

pub use client::{HttpIndex, HttpSearchClient};
