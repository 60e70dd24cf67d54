//! Query keys, cache entry state, and the per-source controllers built on them.

mod controller;
mod key;
pub(crate) mod state;

pub use controller::{OverviewAggregator, QueryOptions, SourceQuery};
pub use key::QueryKey;
pub use state::{CacheEntry, ErrorInfo, ErrorKind, QueryStatus};
