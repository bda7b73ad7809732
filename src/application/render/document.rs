use std::fmt;

use tracing::warn;

use super::render_block;
use crate::domain::records::{Record, record_id};

/// Tally of one document render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderSummary {
    pub fragments: usize,
    /// Records that failed to decode or render and were left out.
    pub skipped: usize,
}

/// Render `records` in order into `sink`.
///
/// A record that fails is logged and skipped. Output the failed record may
/// have partially written before failing is left in place.
pub fn render_document<W>(records: &[Record], sink: &mut W) -> RenderSummary
where
    W: fmt::Write + ?Sized,
{
    let mut summary = RenderSummary::default();
    for (position, record) in records.iter().enumerate() {
        match render_block(record, sink) {
            Ok(fragments) => summary.fragments += fragments,
            Err(err) => {
                summary.skipped += 1;
                warn!(
                    target = "quaderno::application::render",
                    position,
                    record_id = record_id(record),
                    error = %err,
                    "Skipping record that failed to render"
                );
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn paragraph(id: &str, text: &str) -> Record {
        json!({
            "id": id,
            "type": "paragraph",
            "paragraph": {"rich_text": [
                {"type": "text", "text": {"content": text}, "plain_text": text}
            ]}
        })
    }

    #[test]
    fn unknown_types_do_not_count_or_fail() {
        let records = vec![
            paragraph("a", "first"),
            json!({"id": "x", "type": "synced_block", "synced_block": {}}),
            paragraph("b", "second"),
        ];
        let mut html = String::new();
        let summary = render_document(&records, &mut html);

        assert_eq!(
            summary,
            RenderSummary {
                fragments: 2,
                skipped: 0
            }
        );
        assert_eq!(
            html,
            r#"<p class="block-paragraph">first</p><p class="block-paragraph">second</p>"#
        );
    }

    #[test]
    fn malformed_record_is_isolated() {
        let records = vec![
            paragraph("a", "before"),
            json!({"id": "bad", "type": "heading_1", "heading_1": 42}),
            json!({"id": "untyped"}),
            paragraph("b", "after"),
        ];
        let mut html = String::new();
        let summary = render_document(&records, &mut html);

        assert_eq!(summary.fragments, 2);
        assert_eq!(summary.skipped, 2);
        assert!(html.contains("before"));
        assert!(html.ends_with(r#"<p class="block-paragraph">after</p>"#));
    }
}
