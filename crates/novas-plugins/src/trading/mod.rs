//! Plugins for the `tool-trading-*` market data tools.
//!
//! Every trading tool returns an MCP text payload whose JSON carries a
//! `success` flag; [`render_trading`] handles decoding, failures and the shared
//! card layout so each plugin only shapes its own payload.

mod financial;
mod historical;
mod indicators;
mod news;
mod research;
pub mod table;

pub use financial::{FinancialReportKind, FinancialReportPlugin};
pub use historical::{HistoricalDataPlugin, Kline, parse_klines, parse_number_with_unit};
pub use indicators::IndicatorsReportPlugin;
pub use news::CompanyNewsPlugin;
pub use research::ResearchReportPlugin;

use novas_parts::prelude::*;
use serde_json::Value;
use tracing::debug;

use crate::common::{StateLabels, expect_tool, labelled, mcp_payload, payload_failure, str_field, tool_card, tool_error};

/// Static description of one trading plugin.
pub(crate) struct TradingTool {
    pub key: &'static str,
    pub title: &'static str,
    pub labels: StateLabels,
    /// Noun used in placeholders, e.g. "news" in "No news data available".
    pub noun: &'static str,
    pub failure: &'static str,
}

pub(crate) fn render_trading(
    ctx: &RenderContext<'_>,
    meta: &TradingTool,
    body: impl FnOnce(&Value) -> Vec<RenderNode>,
) -> Result<RenderOutcome, PluginError> {
    let tool = expect_tool(ctx, meta.key)?;
    let mut details = Vec::new();
    if let Some(symbol) = tool.input.as_ref().and_then(symbol_label) {
        details.push(labelled("Symbol", symbol));
    }
    match tool.state {
        ToolState::OutputAvailable => {
            let node = match mcp_payload(tool.output.as_ref()) {
                Ok(None) => RenderNode::placeholder(format!("No {} data available", meta.noun)),
                Ok(Some(payload)) => payload_failure(&payload, meta.failure)
                    .unwrap_or_else(|| RenderNode::section(body(&payload))),
                Err(reason) => {
                    debug!(part_type = meta.key, %reason, "trading payload could not be decoded");
                    RenderNode::block(
                        BlockKind::Error,
                        vec![RenderNode::error(format!("Invalid {} data format", meta.noun))],
                    )
                }
            };
            details.push(node);
        }
        ToolState::OutputError => details.push(tool_error(tool)),
        _ => {}
    }
    Ok(RenderOutcome::show(tool_card(meta.title, tool, &meta.labels, details)))
}

/// `SH.600519` style label from a payload or tool input.
pub(crate) fn symbol_label(value: &Value) -> Option<String> {
    let symbol = str_field(value, &["symbol"])?;
    Some(match str_field(value, &["market_code"]) {
        Some(market) => format!("{market}.{symbol}"),
        None => symbol.to_string(),
    })
}

/// Date part of a `YYYY-MM-DD hh:mm:ss` timestamp.
pub(crate) fn date_only(raw: &str) -> &str {
    raw.split([' ', 'T']).next().unwrap_or(raw)
}

/// Removes HTML tags and entities from titles scraped from news sites.
pub(crate) fn strip_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_tag = false;
    let mut in_entity = false;
    for c in raw.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            '&' if !in_tag => in_entity = true,
            ';' if in_entity => {
                in_entity = false;
                out.push(' ');
            }
            _ if in_tag || in_entity => {}
            _ => out.push(c),
        }
    }
    out.trim().to_string()
}
