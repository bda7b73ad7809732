#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use quaderno::{
    application::upstream::{AssetRelocationError, AssetRelocator, OriginClient, OriginError},
    cache::{CacheConfig, ManualClock, MemoryStore, RevalidatingCache, Store},
    domain::records::{Record, record_id},
};
use quaderno_notion_types::{DatabaseRow, RichText, RichTextProperty, RowProperties, TitleProperty};
use serde_json::{Value, json};
use time::macros::datetime;
use tokio::sync::Semaphore;

/// How the stub origin answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Data,
    RateLimited,
    ServerError,
}

/// In-process origin with per-document data, call counting and an optional gate.
#[derive(Default)]
pub struct StubOrigin {
    documents: Mutex<HashMap<String, Vec<Record>>>,
    rows: Mutex<Vec<DatabaseRow>>,
    answer: Mutex<Option<Answer>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    children_calls: AtomicUsize,
    query_calls: AtomicUsize,
    last_filter: Mutex<Option<String>>,
}

impl StubOrigin {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_document(&self, id: &str, records: Vec<Record>) {
        self.documents
            .lock()
            .expect("documents lock")
            .insert(id.to_string(), records);
    }

    pub fn set_rows(&self, rows: Vec<DatabaseRow>) {
        *self.rows.lock().expect("rows lock") = rows;
    }

    pub fn answer_with(&self, answer: Answer) {
        *self.answer.lock().expect("answer lock") = Some(answer);
    }

    /// Hold every origin call until [`StubOrigin::open_gate`].
    pub fn close_gate(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().expect("gate lock") = Some(Arc::clone(&gate));
        gate
    }

    pub fn open_gate(gate: &Semaphore) {
        gate.add_permits(64);
    }

    pub fn children_calls(&self) -> usize {
        self.children_calls.load(Ordering::SeqCst)
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn last_filter(&self) -> Option<String> {
        self.last_filter.lock().expect("filter lock").clone()
    }

    async fn wait_for_gate(&self) {
        let gate = self.gate.lock().expect("gate lock").clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.expect("gate open");
        }
    }

    fn failure(&self) -> Option<OriginError> {
        match *self.answer.lock().expect("answer lock") {
            Some(Answer::RateLimited) => Some(OriginError::RateLimited {
                retry_after_secs: Some(1),
            }),
            Some(Answer::ServerError) => Some(OriginError::Status {
                status: 500,
                body: "internal".to_string(),
            }),
            Some(Answer::Data) | None => None,
        }
    }
}

#[async_trait]
impl OriginClient for StubOrigin {
    async fn block_children(&self, block_id: &str) -> Result<Vec<Record>, OriginError> {
        self.children_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;
        if let Some(err) = self.failure() {
            return Err(err);
        }
        Ok(self
            .documents
            .lock()
            .expect("documents lock")
            .get(block_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn query_database(
        &self,
        _database_id: &str,
        filter: &str,
    ) -> Result<Vec<DatabaseRow>, OriginError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_filter.lock().expect("filter lock") = Some(filter.to_string());
        self.wait_for_gate().await;
        if let Some(err) = self.failure() {
            return Err(err);
        }
        Ok(self.rows.lock().expect("rows lock").clone())
    }
}

/// Rewrites image urls to `/images/<id>.png` without touching the network.
#[derive(Default)]
pub struct StubRelocator {
    fail: bool,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubRelocator {
    pub fn working() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    /// Succeeds after sleeping `delay` per image.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetRelocator for StubRelocator {
    async fn relocate(&self, record: &mut Record) -> Result<(), AssetRelocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let id = record_id(record).to_string();
        if self.fail {
            return Err(AssetRelocationError::Download {
                url: "https://s3.example/expired".to_string(),
                message: "403 Forbidden".to_string(),
            });
        }
        if let Some(url) = record.pointer_mut("/image/file/url") {
            *url = Value::String(format!("/images/{id}.png"));
        }
        Ok(())
    }
}

pub struct Harness {
    pub cache: RevalidatingCache,
    pub store: Arc<MemoryStore>,
    pub origin: Arc<StubOrigin>,
    pub relocator: Arc<StubRelocator>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(StubRelocator::working(), CacheConfig::default())
    }

    pub fn with(relocator: Arc<StubRelocator>, config: CacheConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let origin = StubOrigin::new();
        let clock = Arc::new(ManualClock::new(datetime!(2024-05-01 12:00 UTC)));
        let cache = RevalidatingCache::new(
            Arc::clone(&store) as Arc<dyn Store>,
            Arc::clone(&origin) as Arc<dyn OriginClient>,
            Arc::clone(&relocator) as Arc<dyn AssetRelocator>,
            Arc::clone(&clock) as Arc<dyn quaderno::cache::Clock>,
            config,
        );
        Self {
            cache,
            store,
            origin,
            relocator,
            clock,
        }
    }

    /// Wait until no background check is running.
    pub async fn settle(&self) {
        settle(&self.cache).await;
    }
}

pub async fn settle(cache: &RevalidatingCache) {
    for _ in 0..400 {
        if cache.pending_revalidations() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("background revalidation did not finish");
}

pub fn paragraph(id: &str, text: &str) -> Record {
    json!({
        "object": "block",
        "id": id,
        "type": "paragraph",
        "paragraph": {"rich_text": [
            {"type": "text", "text": {"content": text, "link": null}, "plain_text": text}
        ]}
    })
}

pub fn heading(level: u8, id: &str, text: &str) -> Record {
    let kind = format!("heading_{level}");
    json!({
        "object": "block",
        "id": id,
        "type": &kind,
        kind.clone(): {"rich_text": [
            {"type": "text", "text": {"content": text, "link": null}, "plain_text": text}
        ]}
    })
}

pub fn divider(id: &str) -> Record {
    json!({"object": "block", "id": id, "type": "divider", "divider": {}})
}

pub fn hosted_image(id: &str, url: &str) -> Record {
    json!({
        "object": "block",
        "id": id,
        "type": "image",
        "image": {"type": "file", "caption": [], "file": {"url": url, "expiry_time": null}}
    })
}

pub fn row(id: &str, slug: &str, title: &str) -> DatabaseRow {
    let run = |text: &str| RichText {
        plain_text: text.to_string(),
        ..Default::default()
    };
    DatabaseRow {
        id: id.to_string(),
        created_time: "2024-03-01T00:00:00.000Z".to_string(),
        last_edited_time: String::new(),
        properties: RowProperties {
            slug: Some(RichTextProperty {
                rich_text: vec![run(slug)],
            }),
            name: Some(TitleProperty {
                title: vec![run(title)],
            }),
        },
    }
}
