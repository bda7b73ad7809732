//! HTTP client for the Notion API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use quaderno_notion_types::{BlockChildrenResponse, DatabaseRow, QueryDatabaseResponse};
use reqwest::{Client, RequestBuilder, StatusCode, header};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::{
    application::upstream::{OriginClient, OriginError},
    cache::UNFILTERED,
    domain::records::Record,
    infra::error::InfraError,
};

const PAGE_SIZE: u32 = 100;
const TAG_PROPERTY: &str = "Tags";

#[derive(Debug, Clone)]
pub struct NotionConfig {
    pub base_url: Url,
    pub token: String,
    pub api_version: String,
    pub timeout: Duration,
}

impl From<&crate::config::NotionSettings> for NotionConfig {
    fn from(settings: &crate::config::NotionSettings) -> Self {
        Self {
            base_url: settings.api_base_url.clone(),
            token: settings.token.clone(),
            api_version: settings.api_version.clone(),
            timeout: settings.timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotionClient {
    client: Client,
    config: NotionConfig,
}

impl NotionClient {
    pub fn new(config: NotionConfig) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(user_agent())
            .timeout(config.timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> Result<Url, OriginError> {
        self.config
            .base_url
            .join(path)
            .map_err(|err| OriginError::transport(format!("invalid url for `{path}`: {err}")))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.config.token)
            .header("Notion-Version", &self.config.api_version)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> Result<T, OriginError> {
        let started_at = Instant::now();
        let response = request.send().await.map_err(OriginError::transport)?;
        let status = response.status();
        debug!(
            target = "quaderno::infra::notion",
            endpoint,
            status = status.as_u16(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Origin responded"
        );

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse().ok());
            warn!(
                target = "quaderno::infra::notion",
                endpoint,
                retry_after_secs,
                "Origin rate limit hit"
            );
            return Err(OriginError::RateLimited { retry_after_secs });
        }

        let bytes = response.bytes().await.map_err(OriginError::transport)?;
        if !status.is_success() {
            return Err(OriginError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        serde_json::from_slice(&bytes).map_err(OriginError::decode)
    }
}

/// Notion object ids are hex, optionally hyphenated into UUID groups.
fn object_id(id: &str) -> Result<&str, OriginError> {
    let valid = !id.is_empty()
        && id.bytes().all(|byte| byte.is_ascii_hexdigit() || byte == b'-')
        && id.bytes().any(|byte| byte.is_ascii_hexdigit());
    if valid {
        Ok(id)
    } else {
        Err(OriginError::InvalidId { id: id.to_string() })
    }
}

fn user_agent() -> &'static str {
    concat!("quaderno/", env!("CARGO_PKG_VERSION"))
}

/// Query body for one page of a database listing.
fn query_body(filter: &str, cursor: Option<&str>) -> Value {
    let mut body = json!({ "page_size": PAGE_SIZE });
    if !filter.eq_ignore_ascii_case(UNFILTERED) {
        body["filter"] = json!({
            "property": TAG_PROPERTY,
            "multi_select": { "contains": filter },
        });
    }
    if let Some(cursor) = cursor {
        body["start_cursor"] = Value::from(cursor);
    }
    body
}

#[async_trait]
impl OriginClient for NotionClient {
    async fn block_children(&self, block_id: &str) -> Result<Vec<Record>, OriginError> {
        let block_id = object_id(block_id)?;
        let mut url = self.url(&format!("blocks/{block_id}/children"))?;
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            {
                let mut pairs = url.query_pairs_mut();
                pairs.clear().append_pair("page_size", &PAGE_SIZE.to_string());
                if let Some(cursor) = cursor.as_deref() {
                    pairs.append_pair("start_cursor", cursor);
                }
            }
            let page: BlockChildrenResponse = self
                .send("blocks.children", self.authorized(self.client.get(url.clone())))
                .await?;
            records.extend(page.results);

            match page.next_cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        Ok(records)
    }

    async fn query_database(
        &self,
        database_id: &str,
        filter: &str,
    ) -> Result<Vec<DatabaseRow>, OriginError> {
        let database_id = object_id(database_id)?;
        let url = self.url(&format!("databases/{database_id}/query"))?;
        let mut rows = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let request = self
                .authorized(self.client.post(url.clone()))
                .json(&query_body(filter, cursor.as_deref()));
            let page: QueryDatabaseResponse = self.send("databases.query", request).await?;
            rows.extend(page.results);

            match page.next_cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        Ok(rows)
    }
}
