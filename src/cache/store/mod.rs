//! Byte-level storage behind the revalidating cache.
//!
//! Each backend maps a [`StoreKey`] to an opaque byte payload. The cache never
//! relies on two writes landing together; a payload without a timestamp is a
//! valid state.

mod fixture;
mod fs;
mod memory;
mod redis;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use super::keys::StoreKey;

pub use fixture::FixtureStore;
pub use fs::FsStore;
pub(crate) use fs::write_atomically;
pub use memory::MemoryStore;
pub use redis::RedisStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{backend} store is unreachable: {message}")]
    Unreachable {
        backend: &'static str,
        message: String,
    },
    #[error("{backend} store failed on `{key}`")]
    Io {
        backend: &'static str,
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("fixture `{path}` is unusable: {message}")]
    Fixture { path: String, message: String },
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &StoreKey) -> Result<Option<Bytes>, StoreError>;

    async fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StoreError>;

    /// Whether hits on this store should schedule freshness checks.
    fn revalidates(&self) -> bool {
        true
    }
}
