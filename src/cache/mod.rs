//! Revalidating content cache.
//!
//! Serves upstream documents and listings from a pluggable [`Store`] and keeps
//! them fresh in the background:
//!
//! - **Hit**: answer from the store, then check the entry's timestamp off the
//!   request path and refresh it when older than the staleness interval.
//! - **Miss**: fetch from origin, relocate image assets, write payload and
//!   timestamp, answer.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! staleness_seconds = 3600
//! corrupt_entry_policy = "refetch"
//! ```

mod clock;
mod config;
mod keys;
mod lock;
mod revalidate;
pub mod store;

use thiserror::Error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, CorruptEntryPolicy};
pub use keys::{CacheKey, Slot, StoreKey, UNFILTERED};
pub use revalidate::RevalidatingCache;
pub use store::{FixtureStore, FsStore, MemoryStore, RedisStore, Store, StoreError};

use crate::application::upstream::OriginError;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache key is missing its {part}")]
    InvalidKey { part: &'static str },
    #[error("cache store unavailable")]
    Unavailable(#[source] StoreError),
    #[error("failed to fetch `{key}` from origin")]
    UpstreamFetchFailed {
        key: String,
        #[source]
        source: OriginError,
    },
    #[error("cache entry `{key}` is corrupt")]
    CorruptEntry {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode cache entry `{key}`: {message}")]
    Encode { key: String, message: String },
}
