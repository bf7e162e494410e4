use novas_parts::prelude::*;
use serde_json::Value;

use crate::common::{StateLabels, expect_tool, host_name, str_field, tool_card, tool_error};

const LABELS: StateLabels = StateLabels {
    streaming: "Starting fetch...",
    input_available: "Fetching...",
    output_available: "Fetched",
    output_error: "Fetch failed",
    other: "Fetch",
};

pub struct WebPageFetchPlugin;

impl PartPlugin for WebPageFetchPlugin {
    fn plugin_type(&self) -> &str {
        "tool-web_page_fetch"
    }

    fn display_name(&self) -> &str {
        "Web Page Fetch"
    }

    fn description(&self) -> &str {
        "Renders fetched web pages"
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Result<RenderOutcome, PluginError> {
        let tool = expect_tool(ctx, self.plugin_type())?;
        let mut details = Vec::new();
        if let Some(input) = &tool.input
            && let Some(url) = str_field(input, &["url"])
        {
            let label = str_field(input, &["title"])
                .map(str::to_owned)
                .unwrap_or_else(|| host_name(url));
            details.push(RenderNode::link(url, label));
        }
        match tool.state {
            ToolState::OutputAvailable => details.push(render_page(tool.output.as_ref())),
            ToolState::OutputError => details.push(tool_error(tool)),
            _ => {}
        }
        Ok(RenderOutcome::show(tool_card("Web Page Fetch", tool, &LABELS, details)))
    }
}

fn render_page(output: Option<&Value>) -> RenderNode {
    match output.and_then(|o| str_field(o, &["text_content"])) {
        Some(text) => RenderNode::collapsible("Content", false, vec![RenderNode::markdown(text)]),
        None => RenderNode::placeholder("No content"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shows_link_and_collapsed_content() {
        let message = Message::new("a", Role::Assistant).with_parts(vec![Part::from(json!({
            "type": "tool-web_search-web_page_fetch",
            "toolCallId": "f1",
            "state": "output-available",
            "input": {"url": "https://example.org/post", "title": "A post"},
            "output": {"text_content": "Body text"}
        }))]);
        let ctx = RenderContext::new(&message.parts[0], 0, &message);
        let text = WebPageFetchPlugin.render(&ctx).expect("renders").content.expect("content").to_plain_text();
        assert!(text.contains("[A post](https://example.org/post)"));
        assert!(text.contains("> Content\n  Body text"));
    }
}
