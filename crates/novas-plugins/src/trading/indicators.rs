use novas_parts::prelude::*;
use serde_json::Value;

use super::table::{parse_markdown_table, table_or_markdown};
use super::{TradingTool, render_trading};
use crate::common::{StateLabels, str_field};

const TOOL: TradingTool = TradingTool {
    key: "tool-trading-retrieve_stockstats_indicators_report",
    title: "Technical Indicators",
    labels: StateLabels {
        streaming: "Fetching technical indicators...",
        input_available: "Parameters received",
        output_available: "Indicators data ready",
        output_error: "Failed to fetch indicators",
        other: "Ready",
    },
    noun: "technical indicators",
    failure: "Failed to retrieve technical indicators",
};

pub struct IndicatorsReportPlugin;

impl PartPlugin for IndicatorsReportPlugin {
    fn plugin_type(&self) -> &str {
        TOOL.key
    }

    fn display_name(&self) -> &str {
        "Trading Stockstats Indicators Report"
    }

    fn description(&self) -> &str {
        "Renders technical indicator reports with their latest values"
    }

    fn can_handle(&self, part_type: &str) -> bool {
        part_type == TOOL.key
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Result<RenderOutcome, PluginError> {
        render_trading(ctx, &TOOL, render_indicators)
    }
}

fn display_name(indicator: &str) -> String {
    let known = match indicator {
        "close_50_sma" => "50-day SMA",
        "close_200_sma" => "200-day SMA",
        "close_10_ema" => "10-day EMA",
        "macd" => "MACD",
        "macds" => "MACD Signal",
        "macdh" => "MACD Histogram",
        "rsi" => "RSI",
        "boll" => "Bollinger Middle Band",
        "boll_ub" => "Bollinger Upper Band",
        "boll_lb" => "Bollinger Lower Band",
        "atr" => "ATR",
        "vwma" => "VWMA",
        "mfi" => "Money Flow Index",
        "ema" => "EMA",
        "sma" => "SMA",
        "kdj" => "KDJ",
        "cci" => "CCI",
        "obv" => "OBV",
        other => return other.to_uppercase(),
    };
    known.to_string()
}

fn category(indicator: &str) -> &'static str {
    let name = indicator.to_lowercase();
    if ["sma", "ema", "vwma"].iter().any(|k| name.contains(k)) {
        "trend"
    } else if name.contains("macd") {
        "momentum"
    } else if name.contains("rsi") || name.contains("mfi") {
        "oscillator"
    } else if name.contains("boll") || name.contains("atr") {
        "volatility"
    } else {
        "technical"
    }
}

/// Latest (date, value) from an indicator table: the last row's first two cells.
pub(crate) fn latest_reading(markdown: &str) -> (String, String) {
    let na = || "N/A".to_string();
    let Some(table) = parse_markdown_table(markdown) else {
        return (na(), na());
    };
    let Some(row) = table.last_row() else {
        return (na(), na());
    };
    let date = row.first().filter(|d| !d.is_empty()).cloned().unwrap_or_else(na);
    let value = row
        .get(1)
        .and_then(|v| v.parse::<f64>().ok())
        .map(|v| format!("{v:.2}"))
        .unwrap_or_else(na);
    (date, value)
}

fn render_indicators(payload: &Value) -> Vec<RenderNode> {
    let reports = payload.get("reports").and_then(Value::as_array);
    let Some(reports) = reports.filter(|r| !r.is_empty()) else {
        return vec![RenderNode::placeholder("No technical indicators data available")];
    };

    let mut overview = Vec::with_capacity(reports.len());
    let mut details = Vec::with_capacity(reports.len());
    for report in reports {
        let name = str_field(report, &["indicator_name"]).unwrap_or("unknown");
        let table = str_field(report, &["indicator_report_markdown_table"]).unwrap_or_default();
        let (date, value) = latest_reading(table);
        overview.push(vec![display_name(name), category(name).to_string(), value, date]);

        let mut children = Vec::new();
        if let Some(description) = str_field(report, &["indicator_description"]) {
            children.push(RenderNode::muted(description));
        }
        if !table.is_empty() {
            children.push(table_or_markdown(table));
        }
        details.push(RenderNode::collapsible(display_name(name), false, children));
    }

    let mut nodes = vec![RenderNode::Table {
        headers: ["Indicator", "Category", "Latest", "Date"].map(String::from).to_vec(),
        rows: overview,
    }];
    nodes.extend(details);
    nodes
}
