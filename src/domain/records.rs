//! Opaque upstream records and their closed set of understood shapes.

use quaderno_notion_types::{
    BulletedListItemBlock, CodeBlock, Heading1Block, Heading2Block, Heading3Block, ImageBlock,
    ParagraphBlock,
};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// A record exactly as the origin returned it.
pub type Record = Value;

/// Discriminant of a record, read from its `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    BulletedListItem,
    Image,
    Code,
    Divider,
    Other,
}

impl RecordKind {
    pub fn from_discriminant(value: &str) -> Self {
        match value {
            "paragraph" => Self::Paragraph,
            "heading_1" => Self::Heading1,
            "heading_2" => Self::Heading2,
            "heading_3" => Self::Heading3,
            "bulleted_list_item" => Self::BulletedListItem,
            "image" => Self::Image,
            "code" => Self::Code,
            "divider" => Self::Divider,
            _ => Self::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Heading1 => "heading_1",
            Self::Heading2 => "heading_2",
            Self::Heading3 => "heading_3",
            Self::BulletedListItem => "bulleted_list_item",
            Self::Image => "image",
            Self::Code => "code",
            Self::Divider => "divider",
            Self::Other => "other",
        }
    }

    /// Read the discriminant of an opaque record.
    pub fn of(record: &Record) -> Result<Self, RecordDecodeError> {
        record
            .get("type")
            .and_then(Value::as_str)
            .map(Self::from_discriminant)
            .ok_or_else(|| RecordDecodeError::MissingDiscriminant {
                id: record_id(record).to_string(),
            })
    }
}

/// The `id` of a record, or an empty string when absent.
pub fn record_id(record: &Record) -> &str {
    record.get("id").and_then(Value::as_str).unwrap_or_default()
}

#[derive(Debug, Error)]
pub enum RecordDecodeError {
    #[error("record `{id}` has no `type` discriminant")]
    MissingDiscriminant { id: String },
    #[error("record `{id}` does not match the `{kind}` shape")]
    Shape {
        kind: &'static str,
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A record decoded into the shape its discriminant promises.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(ParagraphBlock),
    Heading1(Heading1Block),
    Heading2(Heading2Block),
    Heading3(Heading3Block),
    BulletedListItem(BulletedListItemBlock),
    Image(ImageBlock),
    Code(CodeBlock),
    Divider,
    /// Any discriminant outside the understood set, kept by name only.
    Unsupported(String),
}

impl Block {
    pub fn decode(record: &Record) -> Result<Self, RecordDecodeError> {
        let kind = RecordKind::of(record)?;
        let block = match kind {
            RecordKind::Paragraph => Self::Paragraph(shape(kind, record)?),
            RecordKind::Heading1 => Self::Heading1(shape(kind, record)?),
            RecordKind::Heading2 => Self::Heading2(shape(kind, record)?),
            RecordKind::Heading3 => Self::Heading3(shape(kind, record)?),
            RecordKind::BulletedListItem => Self::BulletedListItem(shape(kind, record)?),
            RecordKind::Image => Self::Image(shape(kind, record)?),
            RecordKind::Code => Self::Code(shape(kind, record)?),
            RecordKind::Divider => Self::Divider,
            RecordKind::Other => Self::Unsupported(
                record
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            ),
        };
        Ok(block)
    }
}

/// Decode a record into one concrete shape.
pub fn shape<'de, T: Deserialize<'de>>(
    kind: RecordKind,
    record: &'de Record,
) -> Result<T, RecordDecodeError> {
    T::deserialize(record).map_err(|source| RecordDecodeError::Shape {
        kind: kind.as_str(),
        id: record_id(record).to_string(),
        source,
    })
}
