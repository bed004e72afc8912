//! Keyed, time-aware caching of read results.
//!
//! This module provides a resource-agnostic query cache that:
//! - Serves fresh entries without touching the network
//! - Collapses concurrent reads of one key into a single request
//! - Keeps the last good value when a refetch fails
//! - Lets writes invalidate, overwrite or drop entries by key prefix
//! - Purges entries nobody has read for a while

mod key;
mod layer;
mod state;

pub use key::{user_keys, KeyPart, QueryKey};
pub use layer::{CacheOptions, QueryCache};
pub use state::{CacheResult, CacheSource, ListState, QueryState};
