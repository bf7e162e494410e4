//! Text parts: markdown with `<think>` sections and numbered citations.

use novas_parts::prelude::*;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static CITATION: Lazy<Regex> = Lazy::new(|| compile_regex(r"\[([^\]\[]+)\]"));

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

pub struct TextPlugin;

impl PartPlugin for TextPlugin {
    fn plugin_type(&self) -> &str {
        "text"
    }

    fn display_name(&self) -> &str {
        "Text"
    }

    fn description(&self) -> &str {
        "Renders text content with markdown support"
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Result<RenderOutcome, PluginError> {
        let Some(text) = ctx.part.as_text() else {
            return Ok(RenderOutcome::hide());
        };
        let mut content = text.to_string();
        if ctx.message.is_assistant() {
            content = close_think_tags(&content);
            let sources = ctx.message.source_urls();
            if !sources.is_empty() {
                content = link_citations(&content, &sources);
            }
        }
        Ok(RenderOutcome::show(split_think_sections(&content)))
    }
}

/// Appends a closing tag when a streamed answer is still inside a `<think>` block.
pub fn close_think_tags(text: &str) -> String {
    let opened = text.matches(THINK_OPEN).count();
    let closed = text.matches(THINK_CLOSE).count();
    if opened > closed {
        format!("{text}{}", THINK_CLOSE.repeat(opened - closed))
    } else {
        text.to_string()
    }
}

/// Rewrites `[1]` and `[1, 2]` into markdown links to the matching sources.
///
/// Brackets whose content is not a list of in-range positive numbers are left alone.
pub fn link_citations(text: &str, sources: &[&str]) -> String {
    CITATION
        .replace_all(text, |caps: &Captures<'_>| {
            let whole = &caps[0];
            let numbers: Option<Vec<usize>> = caps[1]
                .split(',')
                .map(|n| n.trim().parse::<usize>().ok().filter(|n| *n > 0 && *n <= sources.len()))
                .collect();
            match numbers {
                Some(numbers) if !numbers.is_empty() => numbers
                    .into_iter()
                    .map(|n| format!("[{n}]({})", sources[n - 1]))
                    .collect::<String>(),
                _ => whole.to_string(),
            }
        })
        .into_owned()
}

fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(err) => panic!("invalid regex pattern `{pattern}`: {err}"),
    }
}

fn split_think_sections(content: &str) -> RenderNode {
    if !content.contains(THINK_OPEN) {
        return RenderNode::markdown(content);
    }
    let mut children = Vec::new();
    let mut rest = content;
    while let Some(start) = rest.find(THINK_OPEN) {
        let before = &rest[..start];
        if !before.trim().is_empty() {
            children.push(RenderNode::markdown(before));
        }
        let after_open = &rest[start + THINK_OPEN.len()..];
        let (thought, remainder) = match after_open.find(THINK_CLOSE) {
            Some(end) => (&after_open[..end], &after_open[end + THINK_CLOSE.len()..]),
            None => (after_open, ""),
        };
        if !thought.trim().is_empty() {
            children.push(RenderNode::collapsible(
                "Thinking",
                false,
                vec![RenderNode::markdown(thought.trim())],
            ));
        }
        rest = remainder;
    }
    if !rest.trim().is_empty() {
        children.push(RenderNode::markdown(rest));
    }
    RenderNode::section(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn render(message: &Message) -> RenderOutcome {
        let ctx = RenderContext::new(&message.parts[0], 0, message);
        TextPlugin.render(&ctx).expect("text renders")
    }

    #[test]
    fn unclosed_think_tag_is_closed_for_assistant() {
        assert_eq!(close_think_tags("<think>hmm"), "<think>hmm</think>");
        assert_eq!(close_think_tags("<think>a</think>b"), "<think>a</think>b");

        let message = Message::new("a", Role::Assistant)
            .with_parts(vec![Part::text("<think>planning\nAnswer soon")]);
        let outcome = render(&message);
        let node = outcome.content.expect("content");
        assert_eq!(
            node,
            RenderNode::section(vec![RenderNode::collapsible(
                "Thinking",
                false,
                vec![RenderNode::markdown("planning\nAnswer soon")]
            )])
        );
    }

    #[test]
    fn citations_link_to_message_sources() {
        let sources = ["https://a.example", "https://b.example"];
        assert_eq!(
            link_citations("See [1, 2] and [3] or [note].", &sources),
            "See [1](https://a.example)[2](https://b.example) and [3] or [note]."
        );

        let message = Message::new("a", Role::Assistant).with_parts(vec![
            Part::text("Fact [1]."),
            Part::from(json!({"type": "source-url", "sourceId": "s", "url": "https://a.example"})),
        ]);
        let outcome = render(&message);
        assert_eq!(
            outcome.content,
            Some(RenderNode::markdown("Fact [1](https://a.example)."))
        );
    }

    #[test]
    fn cached_row_relinks_when_a_source_arrives() {
        let mut registry = PluginRegistry::new();
        registry.register("text", std::sync::Arc::new(TextPlugin));
        let renderer = PartRenderer::new(std::sync::Arc::new(registry));
        let mut cache = novas_parts::PartRenderCache::new();

        let mut message = Message::new("a", Role::Assistant).with_parts(vec![Part::text("Fact [1].")]);
        let first = cache.render_message(&renderer, &message, None);
        assert_eq!(first[0].node.as_ref().map(RenderNode::to_plain_text).as_deref(), Some("Fact [1].\n"));

        message
            .parts
            .push(Part::from(json!({"type": "source-url", "sourceId": "s", "url": "https://a.example"})));
        let second = cache.render_message(&renderer, &message, None);
        let text = second[0].node.as_ref().map(RenderNode::to_plain_text).unwrap_or_default();
        assert!(text.contains("[1](https://a.example)"), "{text}");

        cache.render_message(&renderer, &message, None);
        assert_eq!(cache.hits(), 2);
    }

    #[test]
    fn user_text_skips_citation_linking() {
        let message = Message::user_text("u", "<think> [1]");
        let outcome = render(&message);
        assert!(outcome.is_visible());
        assert_eq!(
            outcome.content,
            Some(RenderNode::section(vec![RenderNode::collapsible(
                "Thinking",
                false,
                vec![RenderNode::markdown("[1]")]
            )]))
        );
    }

    #[test]
    fn empty_text_is_not_visible() {
        let message = Message::new("a", Role::Assistant).with_parts(vec![Part::text("")]);
        assert!(!render(&message).is_visible());
    }
}
