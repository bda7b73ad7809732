use std::{collections::HashMap, sync::RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use super::{Store, StoreError};
use crate::cache::{
    keys::StoreKey,
    lock::{rw_read, rw_write},
};

/// In-process store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw access by the rendered key, mostly for assertions.
    pub fn get_raw(&self, key: &str) -> Option<Bytes> {
        rw_read(&self.entries, "cache::store::memory", "get_raw")
            .get(key)
            .cloned()
    }

    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<Bytes>) {
        rw_write(&self.entries, "cache::store::memory", "insert_raw")
            .insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, "cache::store::memory", "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &StoreKey) -> Result<Option<Bytes>, StoreError> {
        Ok(self.get_raw(&key.to_string()))
    }

    async fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StoreError> {
        self.insert_raw(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;

    #[tokio::test]
    async fn payload_and_timestamp_are_separate_slots() {
        let store = MemoryStore::new();
        let entry = CacheKey::records("doc").expect("key");

        store
            .set(&StoreKey::payload(&entry), Bytes::from_static(b"[]"))
            .await
            .expect("set");

        assert_eq!(store.get_raw("doc").as_deref(), Some(&b"[]"[..]));
        assert!(
            store
                .get(&StoreKey::timestamp(&entry))
                .await
                .expect("get")
                .is_none()
        );
    }
}
