//! Markdown tables embedded in trading payloads.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

use novas_parts::RenderNode;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkdownTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl MarkdownTable {
    pub fn last_row(&self) -> Option<&[String]> {
        self.rows.last().map(Vec::as_slice)
    }

    pub fn into_node(self) -> RenderNode {
        RenderNode::Table {
            headers: self.headers,
            rows: self.rows,
        }
    }
}

/// Parses the first table in `markdown`; `None` when there is none.
pub fn parse_markdown_table(markdown: &str) -> Option<MarkdownTable> {
    let mut table: Option<MarkdownTable> = None;
    let mut row: Vec<String> = Vec::new();
    let mut cell: Option<String> = None;
    let mut in_head = false;

    for event in Parser::new_ext(markdown, Options::ENABLE_TABLES) {
        match event {
            Event::Start(Tag::Table(_)) => table = Some(MarkdownTable::default()),
            Event::Start(Tag::TableHead) => {
                in_head = true;
                row.clear();
            }
            Event::End(TagEnd::TableHead) => {
                in_head = false;
                if let Some(table) = table.as_mut() {
                    table.headers = std::mem::take(&mut row);
                }
            }
            Event::Start(Tag::TableRow) => row.clear(),
            Event::End(TagEnd::TableRow) if !in_head => {
                if let Some(table) = table.as_mut() {
                    table.rows.push(std::mem::take(&mut row));
                }
            }
            Event::Start(Tag::TableCell) => cell = Some(String::new()),
            Event::End(TagEnd::TableCell) => {
                if let Some(text) = cell.take() {
                    row.push(text.trim().to_string());
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(cell) = cell.as_mut() {
                    cell.push_str(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(cell) = cell.as_mut() {
                    cell.push(' ');
                }
            }
            Event::End(TagEnd::Table) => break,
            _ => {}
        }
    }
    table
}

/// Table node for `markdown`, or the raw markdown when it holds no table.
pub fn table_or_markdown(markdown: &str) -> RenderNode {
    match parse_markdown_table(markdown) {
        Some(table) => table.into_node(),
        None => RenderNode::markdown(markdown),
    }
}
