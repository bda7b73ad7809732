//! Entities derived from cached upstream content.

use quaderno_notion_types::{DatabaseRow, SlugEntry};
use serde::{Deserialize, Serialize};

/// One book on the reading-now page, accumulated between two dividers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookEntry {
    pub title: String,
    pub author: String,
    pub progress: String,
    pub image_url: String,
    pub comments: String,
}

/// Derive listing entries from query rows.
///
/// Rows with an empty or missing slug or title are dropped; upstream databases
/// routinely contain half-written drafts.
pub fn slug_entries_from_rows(rows: impl IntoIterator<Item = DatabaseRow>) -> Vec<SlugEntry> {
    rows.into_iter()
        .filter_map(|row| {
            let slug = row.slug()?.to_string();
            let title = row.title()?.to_string();
            Some(SlugEntry {
                id: row.id,
                title,
                created_time: row.created_time,
                slug,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use quaderno_notion_types::{RichText, RichTextProperty, RowProperties, TitleProperty};

    use super::*;

    fn row(id: &str, slug: Option<&str>, title: Option<&str>) -> DatabaseRow {
        let run = |text: &str| RichText {
            plain_text: text.to_string(),
            ..Default::default()
        };
        DatabaseRow {
            id: id.to_string(),
            created_time: "2024-03-01T00:00:00.000Z".to_string(),
            last_edited_time: String::new(),
            properties: RowProperties {
                slug: slug.map(|value| RichTextProperty {
                    rich_text: vec![run(value)],
                }),
                name: title.map(|value| TitleProperty {
                    title: vec![run(value)],
                }),
            },
        }
    }

    #[test]
    fn rows_with_empty_slug_are_dropped() {
        let entries = slug_entries_from_rows([
            row("a", Some(""), Some("A")),
            row("b", Some("b"), Some("B")),
        ]);
        assert_eq!(
            entries,
            vec![SlugEntry {
                id: "b".to_string(),
                title: "B".to_string(),
                created_time: "2024-03-01T00:00:00.000Z".to_string(),
                slug: "b".to_string(),
            }]
        );
    }

    #[test]
    fn rows_missing_slug_or_title_runs_are_dropped() {
        let mut no_runs = row("c", Some("c"), Some("C"));
        no_runs.properties.name = Some(TitleProperty { title: Vec::new() });

        let entries = slug_entries_from_rows([
            row("a", None, Some("A")),
            row("b", Some("b"), None),
            no_runs,
        ]);
        assert!(entries.is_empty());
    }

    #[test]
    fn row_order_is_preserved() {
        let entries = slug_entries_from_rows([
            row("1", Some("one"), Some("One")),
            row("2", Some("two"), Some("Two")),
        ]);
        let slugs: Vec<_> = entries.iter().map(|entry| entry.slug.as_str()).collect();
        assert_eq!(slugs, ["one", "two"]);
    }
}
