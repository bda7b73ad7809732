//! Record-to-HTML rendering.
//!
//! [`render_block`] handles a single record. [`render_document`] drives a
//! whole record sequence, isolating failures to the record that caused them so
//! one malformed block never costs the reader the rest of the page.

mod blocks;
mod document;

use thiserror::Error;

use crate::domain::records::RecordDecodeError;

pub use blocks::render_block;
pub use document::{RenderSummary, render_document};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Decode(#[from] RecordDecodeError),
    #[error("block template failed")]
    Template(#[from] askama::Error),
}
