//! Wire types for the Notion API endpoints consumed by quaderno.
//!
//! Only the fields the site reads are modelled. Unknown fields are ignored on
//! decode, so block payloads are kept as raw [`serde_json::Value`]s wherever
//! they need to survive a round trip untouched.

use serde::{Deserialize, Serialize};

/// Paginated list envelope returned by list and query endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedList<T> {
    #[serde(default)]
    pub object: String,
    pub results: Vec<T>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

/// `GET /blocks/{id}/children`. Blocks stay raw so they can be cached verbatim.
pub type BlockChildrenResponse = PaginatedList<serde_json::Value>;

/// `POST /databases/{id}/query`.
pub type QueryDatabaseResponse = PaginatedList<DatabaseRow>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub code: bool,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub link: Option<Link>,
}

/// One inline run of rich text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichText {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<TextContent>,
    #[serde(default)]
    pub annotations: Annotations,
    #[serde(default)]
    pub plain_text: String,
    #[serde(default)]
    pub href: Option<String>,
}

impl RichText {
    /// Authored text content, falling back to the plain-text rendition for
    /// mention and equation runs that carry no `text` object.
    pub fn content(&self) -> &str {
        match &self.text {
            Some(text) => text.content.as_str(),
            None => self.plain_text.as_str(),
        }
    }

    /// The hyperlink carried by a text run, if any.
    pub fn link_url(&self) -> Option<&str> {
        self.text
            .as_ref()
            .and_then(|text| text.link.as_ref())
            .map(|link| link.url.as_str())
            .filter(|url| !url.is_empty())
    }
}

/// Concatenate the content of every run.
pub fn joined_content(runs: &[RichText]) -> String {
    runs.iter().map(RichText::content).collect()
}

/// Payload shared by every rich-text bearing block type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichTextBody {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphBlock {
    pub id: String,
    pub paragraph: RichTextBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading1Block {
    pub id: String,
    pub heading_1: RichTextBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading2Block {
    pub id: String,
    pub heading_2: RichTextBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading3Block {
    pub id: String,
    pub heading_3: RichTextBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulletedListItemBlock {
    pub id: String,
    pub bulleted_list_item: RichTextBody,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBody {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
    #[serde(default)]
    pub caption: Vec<RichText>,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub id: String,
    pub code: CodeBody,
}

/// A hosted (`file`) or linked (`external`) asset reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileObject {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub expiry_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBody {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub caption: Vec<RichText>,
    #[serde(default)]
    pub file: Option<FileObject>,
    #[serde(default)]
    pub external: Option<FileObject>,
}

impl ImageBody {
    /// The URL to display: the hosted file when present, else the external link.
    pub fn url(&self) -> Option<&str> {
        self.file
            .as_ref()
            .or(self.external.as_ref())
            .map(|file| file.url.as_str())
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBlock {
    pub id: String,
    pub image: ImageBody,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichTextProperty {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleProperty {
    #[serde(default)]
    pub title: Vec<RichText>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowProperties {
    #[serde(default)]
    pub slug: Option<RichTextProperty>,
    #[serde(rename = "Name", default)]
    pub name: Option<TitleProperty>,
}

/// One row (page) returned by a database query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseRow {
    pub id: String,
    #[serde(default)]
    pub created_time: String,
    #[serde(default)]
    pub last_edited_time: String,
    #[serde(default)]
    pub properties: RowProperties,
}

impl DatabaseRow {
    /// Plain text of the first slug run, when non-empty.
    pub fn slug(&self) -> Option<&str> {
        self.properties
            .slug
            .as_ref()
            .and_then(|slug| slug.rich_text.first())
            .map(|run| run.plain_text.as_str())
            .filter(|slug| !slug.is_empty())
    }

    /// Plain text of the first title run, when non-empty.
    pub fn title(&self) -> Option<&str> {
        self.properties
            .name
            .as_ref()
            .and_then(|name| name.title.first())
            .map(|run| run.plain_text.as_str())
            .filter(|title| !title.is_empty())
    }
}

/// Listing record persisted in the cache for index pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlugEntry {
    pub id: String,
    pub title: String,
    pub created_time: String,
    pub slug: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn paragraph_decodes_links_and_plain_runs() {
        let value = json!({
            "object": "block",
            "id": "p1",
            "type": "paragraph",
            "paragraph": {
                "rich_text": [
                    {"type": "text", "text": {"content": "see ", "link": null}, "plain_text": "see "},
                    {"type": "text", "text": {"content": "docs", "link": {"url": "https://example.com"}}, "plain_text": "docs"}
                ],
                "color": "default"
            }
        });

        let block: ParagraphBlock = serde_json::from_value(value).expect("paragraph");
        let runs = &block.paragraph.rich_text;
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].link_url(), None);
        assert_eq!(runs[1].link_url(), Some("https://example.com"));
        assert_eq!(joined_content(runs), "see docs");
    }

    #[test]
    fn image_prefers_hosted_file_url() {
        let body = ImageBody {
            kind: "file".into(),
            file: Some(FileObject {
                url: "https://s3.example/a.png".into(),
                expiry_time: None,
            }),
            external: Some(FileObject {
                url: "https://elsewhere/b.png".into(),
                expiry_time: None,
            }),
            ..Default::default()
        };
        assert_eq!(body.url(), Some("https://s3.example/a.png"));
        assert_eq!(ImageBody::default().url(), None);
    }

    #[test]
    fn database_row_reads_slug_and_title() {
        let value = json!({
            "object": "page",
            "id": "row-1",
            "created_time": "2024-01-02T03:04:05.000Z",
            "properties": {
                "slug": {"id": "s", "type": "rich_text", "rich_text": [{"plain_text": "hello-world"}]},
                "Name": {"id": "title", "type": "title", "title": [{"plain_text": "Hello"}]},
                "Tags": {"multi_select": []}
            }
        });

        let row: DatabaseRow = serde_json::from_value(value).expect("row");
        assert_eq!(row.slug(), Some("hello-world"));
        assert_eq!(row.title(), Some("Hello"));
    }

    #[test]
    fn database_row_without_properties_has_no_slug() {
        let row: DatabaseRow = serde_json::from_value(json!({"id": "bare"})).expect("row");
        assert_eq!(row.slug(), None);
        assert_eq!(row.title(), None);
    }
}
