//! Headless render tree produced by part plugins.
//!
//! Nodes describe structure (sections, tables, collapsible dumps, links) without
//! committing to a presentation layer. [`RenderNode::to_plain_text`] gives a
//! terminal-friendly rendering.

use serde::Serialize;
use serde_json::Value;

use crate::part::ToolState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    #[default]
    Plain,
    Strong,
    Muted,
    Error,
}

/// Tag carried by a [`RenderNode::Block`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum BlockKind {
    /// Neutral wrapper the renderer puts around every visible part.
    Part(usize),
    Section,
    Card,
    Row,
    List,
    Reasoning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "node")]
pub enum RenderNode {
    Text {
        text: String,
        emphasis: Emphasis,
    },
    Markdown {
        source: String,
    },
    Link {
        href: String,
        label: String,
    },
    Image {
        src: String,
        alt: String,
    },
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Collapsible {
        title: String,
        expanded: bool,
        children: Vec<RenderNode>,
    },
    Block {
        kind: BlockKind,
        children: Vec<RenderNode>,
    },
    StateBadge {
        state: ToolState,
        label: String,
    },
    Code {
        language: Option<String>,
        content: String,
    },
    Error {
        message: String,
    },
    Divider,
    Placeholder {
        text: String,
    },
}

impl RenderNode {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            emphasis: Emphasis::Plain,
        }
    }

    pub fn strong(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            emphasis: Emphasis::Strong,
        }
    }

    pub fn muted(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            emphasis: Emphasis::Muted,
        }
    }

    pub fn markdown(source: impl Into<String>) -> Self {
        Self::Markdown {
            source: source.into(),
        }
    }

    pub fn link(href: impl Into<String>, label: impl Into<String>) -> Self {
        Self::Link {
            href: href.into(),
            label: label.into(),
        }
    }

    pub fn image(src: impl Into<String>, alt: impl Into<String>) -> Self {
        Self::Image {
            src: src.into(),
            alt: alt.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn placeholder(text: impl Into<String>) -> Self {
        Self::Placeholder { text: text.into() }
    }

    pub fn block(kind: BlockKind, children: Vec<RenderNode>) -> Self {
        Self::Block { kind, children }
    }

    pub fn section(children: Vec<RenderNode>) -> Self {
        Self::block(BlockKind::Section, children)
    }

    pub fn row(children: Vec<RenderNode>) -> Self {
        Self::block(BlockKind::Row, children)
    }

    pub fn collapsible(title: impl Into<String>, expanded: bool, children: Vec<RenderNode>) -> Self {
        Self::Collapsible {
            title: title.into(),
            expanded,
            children,
        }
    }

    pub fn state_badge(state: ToolState, label: impl Into<String>) -> Self {
        Self::StateBadge {
            state,
            label: label.into(),
        }
    }

    /// Pretty-printed JSON dump.
    pub fn json(value: &Value) -> Self {
        Self::Code {
            language: Some("json".into()),
            content: serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
        }
    }

    /// True when the node would display nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text { text, .. } => text.trim().is_empty(),
            Self::Markdown { source } => source.trim().is_empty(),
            Self::Block { children, .. } => children.iter().all(RenderNode::is_empty),
            _ => false,
        }
    }

    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        self.write_plain(&mut out, 0);
        out
    }

    fn write_plain(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        match self {
            Self::Text { text, emphasis } => {
                let line = match emphasis {
                    Emphasis::Strong => format!("**{text}**"),
                    Emphasis::Error => format!("! {text}"),
                    Emphasis::Plain | Emphasis::Muted => text.clone(),
                };
                push_lines(out, &indent, &line);
            }
            Self::Markdown { source } => push_lines(out, &indent, source),
            Self::Link { href, label } => {
                if label.is_empty() || label == href {
                    push_lines(out, &indent, &format!("<{href}>"));
                } else {
                    push_lines(out, &indent, &format!("[{label}]({href})"));
                }
            }
            Self::Image { src, alt } => push_lines(out, &indent, &format!("![{alt}]({src})")),
            Self::Table { headers, rows } => {
                if !headers.is_empty() {
                    push_lines(out, &indent, &format!("| {} |", headers.join(" | ")));
                    let rule = headers.iter().map(|_| "---").collect::<Vec<_>>().join(" | ");
                    push_lines(out, &indent, &format!("| {rule} |"));
                }
                for row in rows {
                    push_lines(out, &indent, &format!("| {} |", row.join(" | ")));
                }
            }
            Self::Collapsible {
                title,
                expanded,
                children,
            } => {
                let marker = if *expanded { "v" } else { ">" };
                push_lines(out, &indent, &format!("{marker} {title}"));
                for child in children {
                    child.write_plain(out, depth + 1);
                }
            }
            Self::Block { children, .. } => {
                for child in children {
                    child.write_plain(out, depth);
                }
            }
            Self::StateBadge { state, label } => {
                push_lines(out, &indent, &format!("[{state}] {label}"));
            }
            Self::Code { content, .. } => push_lines(out, &indent, content),
            Self::Error { message } => push_lines(out, &indent, &format!("error: {message}")),
            Self::Divider => push_lines(out, &indent, "----"),
            Self::Placeholder { text } => push_lines(out, &indent, &format!("({text})")),
        }
    }
}

fn push_lines(out: &mut String, indent: &str, text: &str) {
    for line in text.lines() {
        out.push_str(indent);
        out.push_str(line);
        out.push('\n');
    }
}
