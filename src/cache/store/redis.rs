use async_trait::async_trait;
use bytes::Bytes;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::info;

use super::{Store, StoreError};
use crate::cache::keys::StoreKey;

const BACKEND: &str = "redis";

/// Networked store shared by every instance pointing at the same server.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(unreachable)?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(unreachable)?;
        info!(target = "quaderno::cache::store", backend = BACKEND, "Connected to store");
        Ok(Self { connection })
    }
}

fn unreachable(err: redis::RedisError) -> StoreError {
    StoreError::Unreachable {
        backend: BACKEND,
        message: err.to_string(),
    }
}

#[async_trait]
impl Store for RedisStore {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn get(&self, key: &StoreKey) -> Result<Option<Bytes>, StoreError> {
        let mut connection = self.connection.clone();
        let value: Option<Vec<u8>> = connection
            .get(key.to_string())
            .await
            .map_err(unreachable)?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        connection
            .set::<_, _, ()>(key.to_string(), value.as_ref())
            .await
            .map_err(unreachable)
    }
}
