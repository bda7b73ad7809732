use quaderno::{
    application::render::{render_block, render_document},
    domain::records::Record,
};
use serde_json::json;

fn sample_document() -> Vec<Record> {
    vec![
        json!({"id": "h1", "type": "heading_1", "heading_1": {"rich_text": [
            {"type": "text", "text": {"content": "Field notes"}, "plain_text": "Field notes"}
        ]}}),
        json!({"id": "p1", "type": "paragraph", "paragraph": {"rich_text": [
            {"type": "text", "text": {"content": "Read "}, "plain_text": "Read "},
            {"type": "text", "text": {"content": "the guide", "link": {"url": "https://tokio.rs/tokio/tutorial"}}, "plain_text": "the guide"}
        ]}}),
        json!({"id": "b1", "type": "bulleted_list_item", "bulleted_list_item": {"rich_text": [
            {"type": "text", "text": {"content": "first item"}, "plain_text": "first item"}
        ]}}),
        json!({"id": "c1", "type": "code", "code": {"language": "", "caption": [], "rich_text": [
            {"type": "text", "text": {"content": "cargo test"}, "plain_text": "cargo test"}
        ]}}),
        json!({"id": "i1", "type": "image", "image": {"type": "file",
            "caption": [{"type": "text", "text": {"content": "A cover"}, "plain_text": "A cover"}],
            "file": {"url": "/images/i1.png"}}}),
        json!({"id": "d1", "type": "divider", "divider": {}}),
        json!({"id": "x1", "type": "callout", "callout": {"rich_text": []}}),
        json!({"id": "h2", "type": "heading_2", "heading_2": {"rich_text": "not a list"}}),
    ]
}

#[test]
fn sample_document_snapshot() {
    let lines: Vec<String> = sample_document()
        .iter()
        .filter_map(|record| {
            let mut html = String::new();
            render_block(record, &mut html).ok()?;
            (!html.is_empty()).then_some(html)
        })
        .collect();

    insta::assert_snapshot!("sample_document", lines.join("\n"));
}

#[test]
fn sample_document_summary_counts_fragments_and_skips() {
    let mut html = String::new();
    let summary = render_document(&sample_document(), &mut html);

    assert_eq!(summary.fragments, 6);
    assert_eq!(summary.skipped, 1);
}
