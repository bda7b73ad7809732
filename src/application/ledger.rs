//! Folds the reading-now document into book entries.
//!
//! The document is a flat run of blocks where a divider closes one book and
//! opens the next:
//!
//! ```text
//! heading_1  title
//! heading_2  author
//! heading_3  progress
//! image      cover
//! paragraph  comments
//! divider
//! ```
//!
//! A group that is not closed by a divider is not emitted.

use quaderno_notion_types::RichText;
use tracing::warn;

use crate::domain::{
    entities::BookEntry,
    records::{Block, Record, record_id},
};

pub fn aggregate(records: &[Record]) -> Vec<BookEntry> {
    let mut books = Vec::new();
    let mut current = BookEntry::default();

    for (position, record) in records.iter().enumerate() {
        let block = match Block::decode(record) {
            Ok(block) => block,
            Err(err) => {
                warn!(
                    target = "quaderno::application::ledger",
                    position,
                    record_id = record_id(record),
                    error = %err,
                    "Skipping reading-now record that failed to decode"
                );
                continue;
            }
        };

        match block {
            Block::Divider => {
                // A leading divider opens the first group without closing one.
                if position != 0 {
                    books.push(std::mem::take(&mut current));
                } else {
                    current = BookEntry::default();
                }
            }
            Block::Heading1(block) => set_first_run(&mut current.title, &block.heading_1.rich_text),
            Block::Heading2(block) => {
                set_first_run(&mut current.author, &block.heading_2.rich_text)
            }
            Block::Heading3(block) => {
                set_first_run(&mut current.progress, &block.heading_3.rich_text)
            }
            Block::Image(block) => {
                if let Some(url) = block.image.url() {
                    current.image_url = url.to_string();
                }
            }
            Block::Paragraph(block) => {
                if let Some(run) = block.paragraph.rich_text.first() {
                    current.comments = run.plain_text.clone();
                }
            }
            Block::BulletedListItem(_) | Block::Code(_) | Block::Unsupported(_) => {}
        }
    }

    books
}

fn set_first_run(field: &mut String, runs: &[RichText]) {
    if let Some(run) = runs.first() {
        *field = run.content().to_string();
    }
}
