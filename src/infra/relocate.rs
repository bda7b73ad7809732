//! Re-hosts image assets whose origin URLs expire.
//!
//! The origin signs hosted file URLs for about an hour. Before an image record
//! is cached, its bytes are copied into a flat local directory as `<id>.png`
//! and the record is pointed at `<prefix><id>.png` instead.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    application::upstream::{AssetRelocationError, AssetRelocator},
    cache::store::write_atomically,
    domain::records::{Record, RecordKind, record_id},
    infra::error::InfraError,
};

const FILE_URL_POINTER: &str = "/image/file/url";
const IMAGE_EXTENSION: &str = "png";

#[derive(Debug, Clone)]
pub struct RelocatorConfig {
    pub directory: PathBuf,
    /// Prepended to `<id>.png` to form the rewritten URL.
    pub url_prefix: String,
    pub timeout: Duration,
}

impl RelocatorConfig {
    /// The local prefix is used in development, the public one otherwise.
    pub fn from_settings(settings: &crate::config::AssetSettings, dev: bool) -> Self {
        let url_prefix = if dev {
            settings.local_prefix.clone()
        } else {
            settings.public_prefix.clone()
        };
        Self {
            directory: settings.directory.clone(),
            url_prefix,
            timeout: settings.download_timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageRelocator {
    client: Client,
    config: RelocatorConfig,
}

impl ImageRelocator {
    pub fn new(config: RelocatorConfig) -> Result<Self, InfraError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    fn file_name(id: &str) -> String {
        format!("{id}.{IMAGE_EXTENSION}")
    }

    fn relocated_url(&self, id: &str) -> String {
        format!("{}{}", self.config.url_prefix, Self::file_name(id))
    }

    async fn download(&self, url: &str) -> Result<bytes::Bytes, AssetRelocationError> {
        let download_error = |err: reqwest::Error| AssetRelocationError::Download {
            url: url.to_string(),
            message: err.to_string(),
        };
        self.client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(download_error)?
            .bytes()
            .await
            .map_err(download_error)
    }

    async fn persist(
        &self,
        id: &str,
        contents: bytes::Bytes,
    ) -> Result<PathBuf, AssetRelocationError> {
        let write_error = |source| AssetRelocationError::Write {
            id: id.to_string(),
            source,
        };
        tokio::fs::create_dir_all(&self.config.directory)
            .await
            .map_err(write_error)?;

        let path = self.config.directory.join(Self::file_name(id));
        write_atomically(&self.config.directory, &path, contents)
            .await
            .map_err(write_error)?;
        Ok(path)
    }
}

/// Ids become file names, so anything that could leave the directory is refused.
fn usable_id(id: &str) -> bool {
    !id.is_empty()
        && !id.contains("..")
        && !id.contains(['/', '\\'])
        && !id.chars().any(char::is_control)
}

#[async_trait]
impl AssetRelocator for ImageRelocator {
    async fn relocate(&self, record: &mut Record) -> Result<(), AssetRelocationError> {
        let id = record_id(record).to_string();
        if !matches!(RecordKind::of(record), Ok(RecordKind::Image)) {
            return Err(AssetRelocationError::NotAnImage { id });
        }

        if record.pointer("/image/type").and_then(Value::as_str) == Some("external") {
            debug!(
                target = "quaderno::infra::relocate",
                record_id = %id,
                "External image needs no relocation"
            );
            return Ok(());
        }

        let Some(origin_url) = record
            .pointer(FILE_URL_POINTER)
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
        else {
            return Err(AssetRelocationError::MissingUrl { id });
        };

        if !usable_id(&id) {
            return Err(AssetRelocationError::InvalidId { id });
        }

        let relocated = self.relocated_url(&id);
        if origin_url == relocated {
            return Ok(());
        }

        let contents = self.download(&origin_url).await?;
        let bytes = contents.len();
        let path = self.persist(&id, contents).await?;

        if let Some(url) = record.pointer_mut(FILE_URL_POINTER) {
            *url = Value::String(relocated.clone());
        }
        info!(
            target = "quaderno::infra::relocate",
            record_id = %id,
            path = %path.display(),
            bytes,
            url = %relocated,
            "Relocated image asset"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn relocator(dir: &Path) -> ImageRelocator {
        ImageRelocator::new(RelocatorConfig {
            directory: dir.to_path_buf(),
            url_prefix: "/images/".to_string(),
            timeout: Duration::from_secs(5),
        })
        .expect("relocator")
    }

    #[test]
    fn path_like_ids_are_refused() {
        assert!(usable_id("3f1c2a"));
        assert!(!usable_id(""));
        assert!(!usable_id("../etc"));
        assert!(!usable_id("a/b"));
        assert!(!usable_id("a\\b"));
    }

    #[tokio::test]
    async fn non_image_records_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut record = json!({"id": "p", "type": "paragraph", "paragraph": {}});
        let err = relocator(dir.path())
            .relocate(&mut record)
            .await
            .expect_err("not an image");
        assert!(matches!(err, AssetRelocationError::NotAnImage { .. }));
    }

    #[tokio::test]
    async fn already_relocated_records_are_left_alone() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut record = json!({
            "id": "img1",
            "type": "image",
            "image": {"type": "file", "file": {"url": "/images/img1.png"}}
        });
        let before = record.clone();
        relocator(dir.path())
            .relocate(&mut record)
            .await
            .expect("no-op");
        assert_eq!(record, before);
    }

    #[tokio::test]
    async fn external_images_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut record = json!({
            "id": "ext",
            "type": "image",
            "image": {"type": "external", "external": {"url": "https://example.com/a.png"}}
        });
        relocator(dir.path())
            .relocate(&mut record)
            .await
            .expect("skip");
        assert_eq!(record["image"]["external"]["url"], "https://example.com/a.png");
    }
}
