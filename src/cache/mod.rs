//! Cache store and the fetch machinery that fills it.
//!
//! - [`CacheStore`] holds one [`CacheEntry`](crate::query::CacheEntry) per
//!   query key and notifies subscribers of every change
//! - [`FetchExecutor`] issues requests, deduplicates them per key, and commits
//!   generation-checked results into the store
//! - [`Transport`] is the network seam; [`HttpTransport`] is the real one

mod executor;
mod store;
mod transport;

pub use executor::FetchExecutor;
pub use store::{CacheStore, Callback, Subscription};
pub use transport::{HttpTransport, RawResponse, Transport};
