//! Multi-source marketing analytics query layer.
//!
//! Five backend sources are fetched through one uniform interface: a
//! [`QueryClient`] hands out per-source controllers that share a cache,
//! deduplicate concurrent identical requests, and normalize each source's
//! payload into a stable [`CanonicalDataset`].

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod query;
pub mod source;

#[cfg(test)]
mod testing;

pub use cache::{CacheStore, FetchExecutor, HttpTransport, RawResponse, Subscription, Transport};
pub use client::QueryClient;
pub use config::Config;
pub use error::{Error, Result};
pub use normalize::CanonicalDataset;
pub use query::{
  CacheEntry, ErrorInfo, ErrorKind, OverviewAggregator, QueryKey, QueryOptions, QueryStatus,
  SourceQuery,
};
pub use source::{EndpointRegistry, SourceId};
