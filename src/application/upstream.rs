//! Traits describing the upstream adapters the cache depends on.

use async_trait::async_trait;
use quaderno_notion_types::DatabaseRow;
use thiserror::Error;

use crate::domain::records::Record;

#[derive(Debug, Error)]
pub enum OriginError {
    /// The origin asked us to back off. Kept apart from [`OriginError::Status`]
    /// so callers can decide not to treat it as an outage.
    #[error("origin rate limit hit (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },
    #[error("origin responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("origin request failed: {0}")]
    Transport(String),
    #[error("origin response could not be decoded: {0}")]
    Decode(String),
    #[error("`{id}` is not an origin object id")]
    InvalidId { id: String },
}

impl OriginError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Read access to the third-party content API.
#[async_trait]
pub trait OriginClient: Send + Sync {
    /// Every child record of a document, in document order.
    async fn block_children(&self, block_id: &str) -> Result<Vec<Record>, OriginError>;

    /// Every row of a database query, narrowed by `filter`.
    async fn query_database(
        &self,
        database_id: &str,
        filter: &str,
    ) -> Result<Vec<DatabaseRow>, OriginError>;
}

#[derive(Debug, Error)]
pub enum AssetRelocationError {
    #[error("record `{id}` is not an image record")]
    NotAnImage { id: String },
    #[error("image record `{id}` carries no hosted file url")]
    MissingUrl { id: String },
    #[error("image record id `{id}` cannot be used as a file name")]
    InvalidId { id: String },
    #[error("failed to download `{url}`: {message}")]
    Download { url: String, message: String },
    #[error("failed to persist image `{id}`")]
    Write {
        id: String,
        #[source]
        source: std::io::Error,
    },
}

/// Re-hosts the perishable asset an image record points at.
#[async_trait]
pub trait AssetRelocator: Send + Sync {
    /// Download the asset behind `record` and rewrite its URL in place.
    ///
    /// On error the record is left untouched.
    async fn relocate(&self, record: &mut Record) -> Result<(), AssetRelocationError>;
}
