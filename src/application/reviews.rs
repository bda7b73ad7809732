//! Markdown book reviews kept next to the binary.
//!
//! Each `*.md` file under the reviews directory starts with a YAML front
//! matter block:
//!
//! ```text
//! ---
//! Title: The Dispossessed
//! Slug: the-dispossessed
//! Published: 14-3-2024
//! ---
//! ```
//!
//! `Published` is `day-month-year` without padding. Files are read on every
//! request; the directory is small and edited by hand.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use comrak::{Arena, format_html, nodes::NodeValue, options::Options, parse_document};
use serde::Deserialize;
use thiserror::Error;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};
use tracing::{debug, warn};

const FRONT_MATTER_DELIMITER: &str = "---";
const PUBLISHED_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day padding:none]-[month padding:none]-[year]");
const DISPLAY_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day padding:none] [month repr:long] [year]");

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("failed to read reviews from `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("review `{path}` has no front matter")]
    MissingFrontMatter { path: PathBuf },
    #[error("review `{path}` has unreadable front matter")]
    FrontMatter {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("review `{path}` could not be rendered: {message}")]
    Render { path: PathBuf, message: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FrontMatter {
    title: String,
    slug: String,
    #[serde(default)]
    published: Option<String>,
}

/// Listing entry for one review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSummary {
    pub title: String,
    pub slug: String,
    /// `None` when the front matter date is missing or unreadable.
    pub published: Option<Date>,
}

impl ReviewSummary {
    pub fn published_label(&self) -> String {
        self.published
            .and_then(|date| date.format(DISPLAY_FORMAT).ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub summary: ReviewSummary,
    pub html: String,
}

#[derive(Debug, Clone)]
pub struct ReviewLibrary {
    directory: PathBuf,
}

impl ReviewLibrary {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Every readable review, newest first. Undated reviews sort last.
    pub async fn list(&self) -> Result<Vec<ReviewSummary>, ReviewError> {
        let mut summaries = Vec::new();
        for path in self.markdown_files().await? {
            let source = read(&path).await?;
            match front_matter(&path, &source) {
                Ok(summary) => summaries.push(summary),
                Err(err) => warn!(
                    target = "quaderno::application::reviews",
                    path = %path.display(),
                    error = %err,
                    "Skipping review"
                ),
            }
        }
        summaries.sort_by(|a, b| {
            b.published
                .cmp(&a.published)
                .then_with(|| a.title.cmp(&b.title))
        });
        Ok(summaries)
    }

    /// The review whose front matter carries `slug`, rendered to HTML.
    pub async fn find(&self, slug: &str) -> Result<Option<Review>, ReviewError> {
        for path in self.markdown_files().await? {
            let source = read(&path).await?;
            let Ok(summary) = front_matter(&path, &source) else {
                continue;
            };
            if summary.slug != slug {
                continue;
            }
            let html = render_markdown(&path, &source)?;
            debug!(
                target = "quaderno::application::reviews",
                slug,
                path = %path.display(),
                "Rendered review"
            );
            return Ok(Some(Review { summary, html }));
        }
        Ok(None)
    }

    /// `*.md` files anywhere below the directory, in path order. A missing
    /// directory holds no reviews.
    async fn markdown_files(&self) -> Result<Vec<PathBuf>, ReviewError> {
        let mut files = Vec::new();
        let mut pending = vec![self.directory.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(source) => return Err(ReviewError::Io { path: dir, source }),
            };
            loop {
                let entry = entries.next_entry().await.map_err(|source| ReviewError::Io {
                    path: dir.clone(),
                    source,
                })?;
                let Some(entry) = entry else {
                    break;
                };
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(|source| ReviewError::Io {
                    path: path.clone(),
                    source,
                })?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if path.extension().is_some_and(|ext| ext == "md") {
                    files.push(path);
                }
            }
        }

        files.sort();
        Ok(files)
    }
}

async fn read(path: &Path) -> Result<String, ReviewError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ReviewError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn markdown_options() -> Options<'static> {
    let mut options = Options::default();
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.footnotes = true;
    ext.front_matter_delimiter = Some(FRONT_MATTER_DELIMITER.to_string());

    let render = &mut options.render;
    render.r#unsafe = true;
    render.github_pre_lang = true;
    options
}

/// Summary fields from the YAML block opening `source`.
fn front_matter(path: &Path, source: &str) -> Result<ReviewSummary, ReviewError> {
    let options = markdown_options();
    let arena = Arena::new();
    let root = parse_document(&arena, source, &options);

    let raw = root
        .children()
        .find_map(|node| match &node.data.borrow().value {
            NodeValue::FrontMatter(raw) => Some(raw.clone()),
            _ => None,
        })
        .ok_or_else(|| ReviewError::MissingFrontMatter {
            path: path.to_path_buf(),
        })?;
    let yaml: String = raw
        .lines()
        .filter(|line| line.trim() != FRONT_MATTER_DELIMITER)
        .collect::<Vec<_>>()
        .join("\n");

    let parsed: FrontMatter =
        serde_yaml::from_str(&yaml).map_err(|source| ReviewError::FrontMatter {
            path: path.to_path_buf(),
            source,
        })?;

    let published = parsed.published.as_deref().and_then(|value| {
        Date::parse(value.trim(), PUBLISHED_FORMAT)
            .inspect_err(|err| {
                warn!(
                    target = "quaderno::application::reviews",
                    path = %path.display(),
                    value,
                    error = %err,
                    "Unreadable review date"
                );
            })
            .ok()
    });

    Ok(ReviewSummary {
        title: parsed.title,
        slug: parsed.slug,
        published,
    })
}

/// Body HTML; the front matter block is not rendered.
fn render_markdown(path: &Path, source: &str) -> Result<String, ReviewError> {
    let options = markdown_options();
    let arena = Arena::new();
    let root = parse_document(&arena, source, &options);
    let mut html = String::new();
    format_html(root, &options, &mut html).map_err(|err| ReviewError::Render {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    Ok(html)
}
