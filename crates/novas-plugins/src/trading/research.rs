use novas_parts::prelude::*;
use serde_json::Value;

use super::{TradingTool, date_only, render_trading, strip_html, symbol_label};
use crate::common::{StateLabels, scalar_field, str_field};

const TOOL: TradingTool = TradingTool {
    key: "tool-trading-retrieve_company_research_report",
    title: "Research Reports",
    labels: StateLabels {
        streaming: "Fetching research reports...",
        input_available: "Company info received",
        output_available: "Reports data ready",
        output_error: "Failed to fetch reports",
        other: "Ready",
    },
    noun: "research report",
    failure: "Failed to retrieve research reports",
};

pub struct ResearchReportPlugin;

impl PartPlugin for ResearchReportPlugin {
    fn plugin_type(&self) -> &str {
        TOOL.key
    }

    fn display_name(&self) -> &str {
        "Trading Company Research Report"
    }

    fn description(&self) -> &str {
        "Renders analyst research reports retrieved by the trading tools"
    }

    fn can_handle(&self, part_type: &str) -> bool {
        part_type == TOOL.key
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Result<RenderOutcome, PluginError> {
        render_trading(ctx, &TOOL, render_reports)
    }
}

fn render_reports(payload: &Value) -> Vec<RenderNode> {
    let mut heading = Vec::new();
    if let Some(symbol) = symbol_label(payload) {
        heading.push(RenderNode::strong(symbol));
    }
    if let (Some(start), Some(end)) = (
        str_field(payload, &["start_date"]),
        str_field(payload, &["end_date"]),
    ) {
        heading.push(RenderNode::muted(format!(
            "Research reports ({} ~ {})",
            date_only(start),
            date_only(end)
        )));
    }
    if let Some(count) = scalar_field(payload, &["num_results"]) {
        heading.push(RenderNode::muted(format!("{count} reports")));
    }
    let mut nodes = vec![RenderNode::row(heading)];

    let items: Vec<RenderNode> = payload
        .get("reports")
        .and_then(Value::as_array)
        .map(|reports| reports.iter().map(render_report).collect())
        .unwrap_or_default();
    if items.is_empty() {
        nodes.push(RenderNode::placeholder("No research reports found"));
    } else {
        nodes.push(RenderNode::block(BlockKind::List, items));
    }
    nodes
}

fn render_report(report: &Value) -> RenderNode {
    let title = strip_html(str_field(report, &["title"]).unwrap_or("Untitled report"));
    let mut header = vec![match str_field(report, &["url"]) {
        Some(url) => RenderNode::link(url, title),
        None => RenderNode::strong(title),
    }];
    if let Some(rating) = str_field(report, &["rating"]) {
        header.push(RenderNode::muted(format!("Rating: {rating}")));
    }
    let meta: Vec<&str> = [
        str_field(report, &["publish_date"]).map(date_only),
        str_field(report, &["organization"]),
        str_field(report, &["researcher"]),
        str_field(report, &["industry"]),
    ]
    .into_iter()
    .flatten()
    .collect();

    let mut children = vec![RenderNode::row(header)];
    if !meta.is_empty() {
        children.push(RenderNode::muted(meta.join(" · ")));
    }
    if let Some(content) = str_field(report, &["content_markdown"]) {
        children.push(RenderNode::collapsible(
            "Report content",
            false,
            vec![RenderNode::markdown(strip_external_images(content))],
        ));
    }
    RenderNode::section(children)
}

/// Drops `![alt](http...)` images so report bodies never pull remote content.
fn strip_external_images(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut rest = markdown;
    while let Some(start) = rest.find("![") {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];
        let image_end = candidate
            .find("](")
            .and_then(|open| candidate[open..].find(')').map(|close| (open, open + close)));
        match image_end {
            Some((open, close)) if is_remote(&candidate[open + 2..close]) => {
                rest = &candidate[close + 1..];
            }
            _ => {
                out.push_str("![");
                rest = &candidate[2..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_remote(src: &str) -> bool {
    let src = src.trim();
    src.starts_with("http://") || src.starts_with("https://")
}
