use novas_parts::prelude::*;
use serde_json::Value;

use crate::common::{StateLabels, expect_tool, host_name, labelled, str_field, tool_card, tool_error};

const LABELS: StateLabels = StateLabels {
    streaming: "Starting search...",
    input_available: "Searching...",
    output_available: "Search completed",
    output_error: "Search failed",
    other: "Search",
};

/// `tool-web_search` results: numbered titles, hosts and snippets.
pub struct WebSearchPlugin;

impl PartPlugin for WebSearchPlugin {
    fn plugin_type(&self) -> &str {
        "tool-web_search"
    }

    fn display_name(&self) -> &str {
        "Web Search"
    }

    fn description(&self) -> &str {
        "Renders web search tool calls and their results"
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Result<RenderOutcome, PluginError> {
        let tool = expect_tool(ctx, self.plugin_type())?;
        let mut details = Vec::new();
        if let Some(query) = tool.input.as_ref().and_then(|i| str_field(i, &["query"])) {
            details.push(labelled("Search", format!("\"{query}\"")));
        }
        match tool.state {
            ToolState::OutputAvailable => details.push(render_results(tool.output.as_ref())),
            ToolState::OutputError => details.push(tool_error(tool)),
            _ => {}
        }
        Ok(RenderOutcome::show(tool_card("Web Search", tool, &LABELS, details)))
    }
}

fn render_results(output: Option<&Value>) -> RenderNode {
    let Some(results) = output.and_then(|o| o.get("results")).and_then(Value::as_array) else {
        return RenderNode::placeholder("No search results");
    };
    if results.is_empty() {
        return RenderNode::placeholder("No search results");
    }
    let items = results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let title = str_field(result, &["title"]).unwrap_or("Untitled");
            let mut children = vec![RenderNode::strong(format!("{}. {title}", i + 1))];
            if let Some(url) = str_field(result, &["url"]) {
                children.push(RenderNode::link(url, host_name(url)));
            }
            if let Some(content) = str_field(result, &["content"]) {
                children.push(RenderNode::muted(content));
            }
            RenderNode::section(children)
        })
        .collect();
    RenderNode::collapsible(format!("Results ({})", results.len()), true, items)
}
