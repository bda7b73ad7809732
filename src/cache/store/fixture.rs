use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use quaderno_notion_types::{BlockChildrenResponse, QueryDatabaseResponse};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::{Store, StoreError};
use crate::{
    cache::keys::{CacheKey, Slot, StoreKey},
    domain::entities::slug_entries_from_rows,
};

pub const DOCUMENT_FIXTURE: &str = "notionPost.json";
pub const LISTING_FIXTURE: &str = "posts.json";

/// Canned responses for offline development.
///
/// Every document key answers with the same recorded document and every
/// listing key with the same recorded query. Writes are accepted and dropped,
/// and hits never schedule revalidation.
#[derive(Debug, Clone)]
pub struct FixtureStore {
    records: Bytes,
    listing: Bytes,
}

impl FixtureStore {
    pub async fn load(directory: &Path) -> Result<Self, StoreError> {
        let document: BlockChildrenResponse =
            read_fixture(&directory.join(DOCUMENT_FIXTURE)).await?;
        let query: QueryDatabaseResponse = read_fixture(&directory.join(LISTING_FIXTURE)).await?;

        let records = encode(&directory.join(DOCUMENT_FIXTURE), &document.results)?;
        let listing = encode(
            &directory.join(LISTING_FIXTURE),
            &slug_entries_from_rows(query.results),
        )?;

        info!(
            target = "quaderno::cache::store",
            directory = %directory.display(),
            "Loaded fixture store"
        );
        Ok(Self { records, listing })
    }
}

async fn read_fixture<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let fixture_error = |message: String| StoreError::Fixture {
        path: path.display().to_string(),
        message,
    };
    let contents = tokio::fs::read(path)
        .await
        .map_err(|err| fixture_error(err.to_string()))?;
    serde_json::from_slice(&contents).map_err(|err| fixture_error(err.to_string()))
}

fn encode<T: serde::Serialize>(path: &Path, value: &T) -> Result<Bytes, StoreError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|err| StoreError::Fixture {
            path: path.display().to_string(),
            message: err.to_string(),
        })
}

#[async_trait]
impl Store for FixtureStore {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn get(&self, key: &StoreKey) -> Result<Option<Bytes>, StoreError> {
        let value = match (&key.entry, key.slot) {
            (_, Slot::Timestamp) => None,
            (CacheKey::Records { .. }, Slot::Payload) => Some(self.records.clone()),
            (CacheKey::Listing { .. }, Slot::Payload) => Some(self.listing.clone()),
        };
        Ok(value)
    }

    async fn set(&self, key: &StoreKey, _value: Bytes) -> Result<(), StoreError> {
        debug!(
            target = "quaderno::cache::store",
            key = %key,
            "Fixture store ignored write"
        );
        Ok(())
    }

    fn revalidates(&self) -> bool {
        false
    }
}
