//! Stale-while-revalidate cache over the origin client.
//!
//! A read answers from the store whenever a payload exists. Hits schedule a
//! detached freshness check; misses populate synchronously. Populating means
//! fetch, relocate image assets, then two independent writes (payload first,
//! timestamp second).

use std::{sync::Arc, time::Instant};

use bytes::Bytes;
use dashmap::DashSet;
use metrics::{counter, histogram};
use quaderno_notion_types::{DatabaseRow, SlugEntry};
use serde::{Serialize, de::DeserializeOwned};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{Instrument, debug, info, info_span, warn};

use super::{
    CacheError,
    clock::Clock,
    config::{CacheConfig, CorruptEntryPolicy},
    keys::{CacheKey, StoreKey},
    store::Store,
};
use crate::{
    application::upstream::{AssetRelocator, OriginClient},
    domain::{
        entities::slug_entries_from_rows,
        records::{Record, RecordKind, record_id},
    },
};

const METRIC_CACHE_HIT: &str = "quaderno_cache_hit_total";
const METRIC_CACHE_MISS: &str = "quaderno_cache_miss_total";
const METRIC_CACHE_CORRUPT: &str = "quaderno_cache_corrupt_total";
const METRIC_CACHE_REVALIDATE: &str = "quaderno_cache_revalidate_total";
const METRIC_CACHE_REVALIDATE_FAILED: &str = "quaderno_cache_revalidate_failed_total";
const METRIC_ASSET_RELOCATION_FAILED: &str = "quaderno_asset_relocation_failed_total";
const METRIC_ORIGIN_FETCH_MS: &str = "quaderno_origin_fetch_ms";

/// Outcome of a fetch-transform-write pass.
enum Populated {
    Written(Bytes),
    /// The origin refused the request; nothing was written.
    RateLimited,
}

/// Raw origin answer, before relocation and encoding.
enum Fetched {
    Records(Vec<Record>),
    Rows(Vec<DatabaseRow>),
}

/// Cheaply cloneable handle; clones share the store and the in-flight set.
#[derive(Clone)]
pub struct RevalidatingCache {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn Store>,
    origin: Arc<dyn OriginClient>,
    relocator: Arc<dyn AssetRelocator>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    in_flight: DashSet<String>,
}

impl RevalidatingCache {
    pub fn new(
        store: Arc<dyn Store>,
        origin: Arc<dyn OriginClient>,
        relocator: Arc<dyn AssetRelocator>,
        clock: Arc<dyn Clock>,
        config: CacheConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                origin,
                relocator,
                clock,
                config,
                in_flight: DashSet::new(),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// The ordered child records of document `id`.
    pub async fn records(&self, id: &str) -> Result<Vec<Record>, CacheError> {
        self.read(CacheKey::records(id)?).await
    }

    /// Listing entries of database `id` narrowed by `filter`.
    pub async fn listing(&self, id: &str, filter: &str) -> Result<Vec<SlugEntry>, CacheError> {
        self.read(CacheKey::listing(id, filter)?).await
    }

    /// Number of background checks currently running.
    pub fn pending_revalidations(&self) -> usize {
        self.inner.in_flight.len()
    }

    async fn read<T: DeserializeOwned>(&self, key: CacheKey) -> Result<Vec<T>, CacheError> {
        let cached = self
            .inner
            .store
            .get(&StoreKey::payload(&key))
            .await
            .map_err(CacheError::Unavailable)?;

        match cached {
            Some(bytes) => match serde_json::from_slice::<Vec<T>>(&bytes) {
                Ok(value) => {
                    counter!(METRIC_CACHE_HIT).increment(1);
                    debug!(target = "quaderno::cache", key = %key, "Cache hit");
                    self.schedule(&key, Check::Freshness);
                    return Ok(value);
                }
                Err(err) => {
                    counter!(METRIC_CACHE_CORRUPT).increment(1);
                    warn!(
                        target = "quaderno::cache",
                        key = %key,
                        policy = %self.inner.config.corrupt_entry_policy,
                        error = %err,
                        "Cached payload failed to decode"
                    );
                    if self.inner.config.corrupt_entry_policy == CorruptEntryPolicy::Empty {
                        self.schedule(&key, Check::Repair);
                        return Ok(Vec::new());
                    }
                }
            },
            None => {
                counter!(METRIC_CACHE_MISS).increment(1);
                debug!(target = "quaderno::cache", key = %key, "Cache miss");
            }
        }

        match self.inner.populate(&key).await? {
            Populated::Written(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| CacheError::CorruptEntry {
                    key: key.to_string(),
                    source,
                })
            }
            Populated::RateLimited => Ok(Vec::new()),
        }
    }

    fn schedule(&self, key: &CacheKey, check: Check) {
        if !self.inner.store.revalidates() {
            return;
        }

        let rendered = key.to_string();
        if !self.inner.in_flight.insert(rendered.clone()) {
            debug!(
                target = "quaderno::cache",
                key = %rendered,
                "Revalidation already in flight"
            );
            return;
        }

        let span = info_span!("cache.revalidate", key = %rendered);
        let guard = InFlight {
            inner: Arc::clone(&self.inner),
            key: rendered,
        };
        let key = key.clone();
        tokio::spawn(
            async move {
                guard.inner.run_check(&key, check).await;
                drop(guard);
            }
            .instrument(span),
        );
    }
}

#[derive(Debug, Clone, Copy)]
enum Check {
    /// Revalidate only when the timestamp is older than the staleness interval.
    Freshness,
    /// Revalidate unconditionally.
    Repair,
}

/// Releases the per-key in-flight marker however the task ends.
struct InFlight {
    inner: Arc<Inner>,
    key: String,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.inner.in_flight.remove(&self.key);
    }
}

impl Inner {
    async fn run_check(&self, key: &CacheKey, check: Check) {
        if matches!(check, Check::Repair) {
            self.revalidate(key).await;
            return;
        }

        let stamp_key = StoreKey::timestamp(key);
        let stamp = match self.store.get(&stamp_key).await {
            Ok(stamp) => stamp,
            Err(err) => {
                warn!(
                    target = "quaderno::cache",
                    key = %key,
                    error = %err,
                    "Failed to read freshness timestamp"
                );
                return;
            }
        };

        let Some(stamp) = stamp else {
            // A payload without a timestamp is adopted as fresh from now on.
            if let Err(err) = self.write_timestamp(key).await {
                warn!(
                    target = "quaderno::cache",
                    key = %key,
                    error = %err,
                    "Failed to write missing freshness timestamp"
                );
            }
            return;
        };

        match decode_timestamp(&stamp) {
            Ok(refreshed_at) => {
                let age = self.clock.now() - refreshed_at;
                if age > self.config.staleness {
                    self.revalidate(key).await;
                } else {
                    debug!(
                        target = "quaderno::cache",
                        key = %key,
                        age_seconds = age.whole_seconds(),
                        "Entry still fresh"
                    );
                }
            }
            Err(reason) => {
                warn!(
                    target = "quaderno::cache",
                    key = %key,
                    reason = %reason,
                    "Unreadable freshness timestamp; revalidating"
                );
                self.revalidate(key).await;
            }
        }
    }

    async fn revalidate(&self, key: &CacheKey) {
        counter!(METRIC_CACHE_REVALIDATE).increment(1);
        match self.populate(key).await {
            Ok(Populated::Written(bytes)) => info!(
                target = "quaderno::cache",
                key = %key,
                bytes = bytes.len(),
                "Revalidated cache entry"
            ),
            Ok(Populated::RateLimited) => warn!(
                target = "quaderno::cache",
                key = %key,
                "Origin rate limited revalidation; keeping stale entry"
            ),
            Err(err) => {
                counter!(METRIC_CACHE_REVALIDATE_FAILED).increment(1);
                warn!(
                    target = "quaderno::cache",
                    key = %key,
                    error = %err,
                    "Revalidation failed; keeping stale entry"
                );
            }
        }
    }

    async fn populate(&self, key: &CacheKey) -> Result<Populated, CacheError> {
        let started_at = Instant::now();
        let fetched = match key {
            CacheKey::Records { id } => self.origin.block_children(id).await.map(Fetched::Records),
            CacheKey::Listing { id, filter } => {
                self.origin.query_database(id, filter).await.map(Fetched::Rows)
            }
        };
        histogram!(METRIC_ORIGIN_FETCH_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        let fetched = match fetched {
            Ok(fetched) => fetched,
            Err(err) if err.is_rate_limited() => {
                warn!(
                    target = "quaderno::cache",
                    key = %key,
                    error = %err,
                    "Origin rate limited the request"
                );
                return Ok(Populated::RateLimited);
            }
            Err(source) => {
                return Err(CacheError::UpstreamFetchFailed {
                    key: key.to_string(),
                    source,
                });
            }
        };

        let payload = match fetched {
            Fetched::Records(mut records) => {
                self.relocate_images(&mut records).await;
                encode(key, &records)?
            }
            Fetched::Rows(rows) => encode(key, &slug_entries_from_rows(rows))?,
        };

        self.store
            .set(&StoreKey::payload(key), payload.clone())
            .await
            .map_err(CacheError::Unavailable)?;
        self.write_timestamp(key).await?;

        Ok(Populated::Written(payload))
    }

    async fn relocate_images(&self, records: &mut [Record]) {
        for record in records.iter_mut() {
            if !matches!(RecordKind::of(record), Ok(RecordKind::Image)) {
                continue;
            }
            if let Err(err) = self.relocator.relocate(record).await {
                counter!(METRIC_ASSET_RELOCATION_FAILED).increment(1);
                warn!(
                    target = "quaderno::cache",
                    record_id = record_id(record),
                    error = %err,
                    "Image relocation failed; keeping origin url"
                );
            }
        }
    }

    async fn write_timestamp(&self, key: &CacheKey) -> Result<(), CacheError> {
        let stamp = encode_timestamp(key, self.clock.now())?;
        self.store
            .set(&StoreKey::timestamp(key), stamp)
            .await
            .map_err(CacheError::Unavailable)
    }
}

fn encode<T: Serialize>(key: &CacheKey, value: &T) -> Result<Bytes, CacheError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|err| CacheError::Encode {
            key: key.to_string(),
            message: err.to_string(),
        })
}

/// Timestamps are stored as a JSON string in RFC 3339 form.
fn encode_timestamp(key: &CacheKey, at: OffsetDateTime) -> Result<Bytes, CacheError> {
    let formatted = at.format(&Rfc3339).map_err(|err| CacheError::Encode {
        key: key.to_string(),
        message: err.to_string(),
    })?;
    encode(key, &formatted)
}

fn decode_timestamp(raw: &[u8]) -> Result<OffsetDateTime, String> {
    let text: String = serde_json::from_slice(raw).map_err(|err| err.to_string())?;
    OffsetDateTime::parse(&text, &Rfc3339).map_err(|err| err.to_string())
}
