use novas_parts::prelude::*;
use serde_json::Value;

use super::{TradingTool, date_only, render_trading, strip_html, symbol_label};
use crate::common::{StateLabels, scalar_field, str_field};

const TOOL: TradingTool = TradingTool {
    key: "tool-trading-retrieve_company_news",
    title: "Company News",
    labels: StateLabels {
        streaming: "Fetching company news...",
        input_available: "Company info received",
        output_available: "News data ready",
        output_error: "Failed to fetch news",
        other: "Ready",
    },
    noun: "news",
    failure: "Failed to retrieve company news",
};

pub struct CompanyNewsPlugin;

impl PartPlugin for CompanyNewsPlugin {
    fn plugin_type(&self) -> &str {
        TOOL.key
    }

    fn display_name(&self) -> &str {
        "Trading Company News"
    }

    fn description(&self) -> &str {
        "Renders company news retrieved by the trading tools"
    }

    fn can_handle(&self, part_type: &str) -> bool {
        part_type == TOOL.key
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Result<RenderOutcome, PluginError> {
        render_trading(ctx, &TOOL, render_news)
    }
}

fn render_news(payload: &Value) -> Vec<RenderNode> {
    let mut heading = Vec::new();
    if let Some(company) = str_field(payload, &["company_name"]) {
        heading.push(RenderNode::strong(company));
    }
    if let Some(symbol) = symbol_label(payload) {
        heading.push(RenderNode::muted(symbol));
    }
    if let Some(count) = scalar_field(payload, &["num_results"]) {
        heading.push(RenderNode::muted(format!("{count} articles")));
    }
    let mut nodes = vec![RenderNode::row(heading)];

    let items: Vec<RenderNode> = payload
        .get("news")
        .and_then(Value::as_array)
        .map(|news| news.iter().map(render_item).collect())
        .unwrap_or_default();
    if items.is_empty() {
        nodes.push(RenderNode::placeholder("No news found"));
    } else {
        nodes.push(RenderNode::block(BlockKind::List, items));
    }
    nodes
}

fn render_item(item: &Value) -> RenderNode {
    let title = strip_html(str_field(item, &["title"]).unwrap_or("Untitled"));
    let mut children = vec![match str_field(item, &["url"]) {
        Some(url) => RenderNode::link(url, title),
        None => RenderNode::strong(title),
    }];
    let meta: Vec<&str> = [
        str_field(item, &["publish_date"]).map(date_only),
        str_field(item, &["source"]),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !meta.is_empty() {
        children.push(RenderNode::muted(meta.join(" · ")));
    }
    if let Some(snippet) = str_field(item, &["snippet"]) {
        children.push(RenderNode::text(strip_html(snippet)));
    }
    if let Some(content) = str_field(item, &["content_markdown"]) {
        children.push(RenderNode::collapsible("Full article", false, vec![RenderNode::markdown(content)]));
    }
    RenderNode::section(children)
}
