//! Read-side service consumed by the HTTP boundary.

use quaderno_notion_types::SlugEntry;
use tracing::{debug, instrument};

use super::{
    error::AppError,
    ledger,
    render::{RenderSummary, render_document},
};
use crate::{cache::RevalidatingCache, domain::entities::BookEntry};

/// Upstream identifiers the site reads from.
#[derive(Debug, Clone, Default)]
pub struct SiteSources {
    pub database_id: String,
    pub reading_now_block_id: String,
}

impl From<&crate::config::NotionSettings> for SiteSources {
    fn from(settings: &crate::config::NotionSettings) -> Self {
        Self {
            database_id: settings.database_id.clone(),
            reading_now_block_id: settings.reading_now_block_id.clone(),
        }
    }
}

/// A rendered post body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostBody {
    pub html: String,
    pub summary: RenderSummary,
}

#[derive(Clone)]
pub struct SiteService {
    cache: RevalidatingCache,
    sources: SiteSources,
}

impl SiteService {
    pub fn new(cache: RevalidatingCache, sources: SiteSources) -> Self {
        Self { cache, sources }
    }

    pub fn cache(&self) -> &RevalidatingCache {
        &self.cache
    }

    pub fn sources(&self) -> &SiteSources {
        &self.sources
    }

    #[instrument(skip(self))]
    pub async fn post_html(&self, id: &str) -> Result<PostBody, AppError> {
        let records = self.cache.records(id).await?;
        let mut html = String::new();
        let summary = render_document(&records, &mut html);
        debug!(
            target = "quaderno::application::site",
            fragments = summary.fragments,
            skipped = summary.skipped,
            "Rendered post"
        );
        Ok(PostBody { html, summary })
    }

    /// Listing rows narrowed by `filter`; `all` disables filtering.
    #[instrument(skip(self))]
    pub async fn listing(&self, filter: &str) -> Result<Vec<SlugEntry>, AppError> {
        Ok(self
            .cache
            .listing(&self.sources.database_id, filter)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn reading_now(&self) -> Result<Vec<BookEntry>, AppError> {
        let records = self
            .cache
            .records(&self.sources.reading_now_block_id)
            .await?;
        Ok(ledger::aggregate(&records))
    }
}
