//! One record in, at most a handful of HTML fragments out.

use std::fmt;

use askama::Template;
use quaderno_notion_types::{RichText, joined_content};

use super::RenderError;
use crate::domain::records::{Block, Record};

#[derive(Template)]
#[template(path = "blocks/paragraph.html")]
struct ParagraphTemplate<'a> {
    content: &'a str,
}

#[derive(Template)]
#[template(path = "blocks/link.html")]
struct LinkTemplate<'a> {
    url: &'a str,
    content: &'a str,
}

#[derive(Template)]
#[template(path = "blocks/heading.html")]
struct HeadingTemplate<'a> {
    level: u8,
    anchor: &'a str,
    content: &'a str,
}

#[derive(Template)]
#[template(path = "blocks/bulleted_list_item.html")]
struct BulletedListItemTemplate<'a> {
    content: &'a str,
}

#[derive(Template)]
#[template(path = "blocks/image.html")]
struct ImageTemplate<'a> {
    url: &'a str,
    caption: &'a str,
}

#[derive(Template)]
#[template(path = "blocks/code.html")]
struct CodeTemplate<'a> {
    language: &'a str,
    content: &'a str,
}

/// Render one record into `sink`, returning how many fragments were written.
///
/// Records outside the understood set, and understood records with nothing to
/// show, write nothing and report zero.
pub fn render_block<W>(record: &Record, sink: &mut W) -> Result<usize, RenderError>
where
    W: fmt::Write + ?Sized,
{
    match Block::decode(record)? {
        Block::Paragraph(block) => render_runs(&block.paragraph.rich_text, sink),
        Block::Heading1(block) => heading(1, &block.id, &block.heading_1.rich_text, sink),
        Block::Heading2(block) => heading(2, &block.id, &block.heading_2.rich_text, sink),
        Block::Heading3(block) => heading(3, &block.id, &block.heading_3.rich_text, sink),
        Block::BulletedListItem(block) => {
            let runs = &block.bulleted_list_item.rich_text;
            if runs.is_empty() {
                return Ok(0);
            }
            let content = joined_content(runs);
            BulletedListItemTemplate { content: &content }.render_into(sink)?;
            Ok(1)
        }
        Block::Image(block) => {
            let Some(url) = block.image.url() else {
                return Ok(0);
            };
            let caption = joined_content(&block.image.caption);
            ImageTemplate {
                url,
                caption: &caption,
            }
            .render_into(sink)?;
            Ok(1)
        }
        Block::Code(block) => {
            if block.code.rich_text.is_empty() {
                return Ok(0);
            }
            let content = joined_content(&block.code.rich_text);
            let language = match block.code.language.as_str() {
                "" => "plain",
                language => language,
            };
            CodeTemplate {
                language,
                content: &content,
            }
            .render_into(sink)?;
            Ok(1)
        }
        Block::Divider | Block::Unsupported(_) => Ok(0),
    }
}

/// Each run is its own fragment; linked runs use the link presentation.
fn render_runs<W>(runs: &[RichText], sink: &mut W) -> Result<usize, RenderError>
where
    W: fmt::Write + ?Sized,
{
    for run in runs {
        match run.link_url() {
            Some(url) => LinkTemplate {
                url,
                content: run.content(),
            }
            .render_into(sink)?,
            None => ParagraphTemplate {
                content: run.content(),
            }
            .render_into(sink)?,
        }
    }
    Ok(runs.len())
}

fn heading<W>(level: u8, id: &str, runs: &[RichText], sink: &mut W) -> Result<usize, RenderError>
where
    W: fmt::Write + ?Sized,
{
    if runs.is_empty() {
        return Ok(0);
    }
    let content = joined_content(runs);
    HeadingTemplate {
        level,
        anchor: id,
        content: &content,
    }
    .render_into(sink)?;
    Ok(1)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn render(record: Record) -> (usize, String) {
        let mut html = String::new();
        let count = render_block(&record, &mut html).expect("render");
        (count, html)
    }

    #[test]
    fn paragraph_runs_render_one_fragment_each() {
        let (count, html) = render(json!({
            "id": "p1",
            "type": "paragraph",
            "paragraph": {"rich_text": [
                {"type": "text", "text": {"content": "Hello"}, "plain_text": "Hello"},
                {"type": "text", "text": {"content": "docs", "link": {"url": "https://docs.rs"}}, "plain_text": "docs"}
            ]}
        }));
        assert_eq!(count, 2);
        assert_eq!(
            html,
            concat!(
                r#"<p class="block-paragraph">Hello</p>"#,
                r#"<p class="block-paragraph"><a class="block-link" href="https://docs.rs" target="_blank" rel="noopener">docs</a></p>"#
            )
        );
    }

    #[test]
    fn heading_levels_follow_the_discriminant() {
        let (count, html) = render(json!({
            "id": "h",
            "type": "heading_2",
            "heading_2": {"rich_text": [
                {"type": "text", "text": {"content": "Part "}, "plain_text": "Part "},
                {"type": "text", "text": {"content": "two"}, "plain_text": "two"}
            ]}
        }));
        assert_eq!(count, 1);
        assert_eq!(html, r#"<h2 id="h" class="block-heading">Part two</h2>"#);
    }

    #[test]
    fn content_is_html_escaped() {
        let (_, html) = render(json!({
            "id": "p",
            "type": "paragraph",
            "paragraph": {"rich_text": [
                {"type": "text", "text": {"content": "<script>"}, "plain_text": "<script>"}
            ]}
        }));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn image_without_url_writes_nothing() {
        let (count, html) = render(json!({
            "id": "i",
            "type": "image",
            "image": {"type": "file", "caption": []}
        }));
        assert_eq!(count, 0);
        assert!(html.is_empty());
    }

    #[test]
    fn code_defaults_language_class() {
        let (count, html) = render(json!({
            "id": "c",
            "type": "code",
            "code": {"rich_text": [
                {"type": "text", "text": {"content": "fn main() {}"}, "plain_text": "fn main() {}"}
            ], "language": ""}
        }));
        assert_eq!(count, 1);
        assert_eq!(
            html,
            r#"<pre class="block-code"><code class="language-plain">fn main() {}</code></pre>"#
        );
    }

    #[test]
    fn unknown_and_divider_records_are_silent() {
        assert_eq!(render(json!({"id": "d", "type": "divider", "divider": {}})), (0, String::new()));
        assert_eq!(
            render(json!({"id": "t", "type": "toggle", "toggle": {}})),
            (0, String::new())
        );
    }

    #[test]
    fn empty_heading_writes_nothing() {
        let (count, html) = render(json!({
            "id": "h",
            "type": "heading_1",
            "heading_1": {"rich_text": []}
        }));
        assert_eq!(count, 0);
        assert!(html.is_empty());
    }
}
