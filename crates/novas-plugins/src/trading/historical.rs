use novas_parts::prelude::*;
use serde_json::Value;

use super::table::parse_markdown_table;
use super::{TradingTool, date_only, render_trading, symbol_label};
use crate::common::{StateLabels, str_field};

const TOOL: TradingTool = TradingTool {
    key: "tool-trading-retrieve_stock_historical_data",
    title: "Stock Historical Data",
    labels: StateLabels {
        streaming: "Fetching historical data...",
        input_available: "Parameters received",
        output_available: "Historical data ready",
        output_error: "Failed to fetch historical data",
        other: "Ready",
    },
    noun: "historical",
    failure: "Failed to retrieve historical data",
};

const MAX_KLINE_ROWS: usize = 20;

/// One candle parsed from the K-line table.
#[derive(Debug, Clone, PartialEq)]
pub struct Kline {
    pub date: String,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub change_percent: f64,
}

pub struct HistoricalDataPlugin;

impl PartPlugin for HistoricalDataPlugin {
    fn plugin_type(&self) -> &str {
        TOOL.key
    }

    fn display_name(&self) -> &str {
        "Trading Stock Historical Data"
    }

    fn description(&self) -> &str {
        "Summarizes K-line data retrieved by the trading tools"
    }

    fn can_handle(&self, part_type: &str) -> bool {
        part_type == TOOL.key
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Result<RenderOutcome, PluginError> {
        render_trading(ctx, &TOOL, render_history)
    }
}

/// Parses values such as `1.2万`, `3亿` or `12,345.6`; unparseable input is `0`.
pub fn parse_number_with_unit(raw: &str) -> f64 {
    let clean = raw.trim();
    let (number, scale) = if clean.contains('万') {
        (clean.replace('万', ""), 1e4)
    } else if clean.contains('亿') {
        (clean.replace('亿', ""), 1e8)
    } else {
        (clean.replace(',', ""), 1.0)
    };
    number.trim().parse::<f64>().map(|n| n * scale).unwrap_or(0.0)
}

fn interval_label(interval: &str) -> &str {
    match interval {
        "daily" => "Daily",
        "weekly" => "Weekly",
        "monthly" => "Monthly",
        "1m" => "1 minute",
        "5m" => "5 minutes",
        "15m" => "15 minutes",
        "30m" => "30 minutes",
        "60m" => "1 hour",
        "4h" => "4 hours",
        other => other,
    }
}

/// Candles from the K-line table: column 1 is the date, 3..=6 open/close/high/low,
/// 10 the change percentage. Column 0 is the row index.
pub fn parse_klines(markdown: &str) -> Vec<Kline> {
    let Some(table) = parse_markdown_table(markdown) else {
        return Vec::new();
    };
    table
        .rows
        .iter()
        .filter(|cells| cells.len() >= 7)
        .map(|cells| Kline {
            date: cells[1].clone(),
            open: parse_number_with_unit(&cells[3]),
            close: parse_number_with_unit(&cells[4]),
            high: parse_number_with_unit(&cells[5]),
            low: parse_number_with_unit(&cells[6]),
            change_percent: cells
                .get(10)
                .and_then(|c| c.trim_end_matches('%').trim().parse::<f64>().ok())
                .unwrap_or(0.0),
        })
        .take(MAX_KLINE_ROWS)
        .collect()
}

fn render_history(payload: &Value) -> Vec<RenderNode> {
    let mut heading = Vec::new();
    if let Some(symbol) = symbol_label(payload) {
        heading.push(RenderNode::strong(symbol));
    }
    if let Some(interval) = str_field(payload, &["interval"]) {
        heading.push(RenderNode::muted(interval_label(interval).to_string()));
    }
    if let (Some(start), Some(end)) = (
        str_field(payload, &["start_date"]),
        str_field(payload, &["end_date"]),
    ) {
        heading.push(RenderNode::muted(format!("{} ~ {}", date_only(start), date_only(end))));
    }
    let mut nodes = vec![RenderNode::row(heading)];

    let klines = str_field(payload, &["kline_markdown_table"])
        .map(parse_klines)
        .unwrap_or_default();
    let (Some(first), Some(last)) = (klines.first(), klines.last()) else {
        nodes.push(RenderNode::placeholder("No historical data available"));
        return nodes;
    };

    let high = klines.iter().map(|k| k.high).fold(f64::MIN, f64::max);
    let low = klines.iter().map(|k| k.low).fold(f64::MAX, f64::min);
    nodes.push(RenderNode::row(vec![
        RenderNode::strong(format!("Last close {:.2}", last.close)),
        RenderNode::muted(format!("{:+.2}%", last.change_percent)),
        RenderNode::muted(format!("Range {low:.2} - {high:.2}")),
        RenderNode::muted(format!("{} candles from {}", klines.len(), first.date)),
    ]));
    nodes.push(RenderNode::collapsible(
        "K-line data",
        false,
        vec![RenderNode::Table {
            headers: ["Date", "Open", "Close", "High", "Low", "Change %"]
                .map(String::from)
                .to_vec(),
            rows: klines
                .iter()
                .map(|k| {
                    vec![
                        k.date.clone(),
                        format!("{:.2}", k.open),
                        format!("{:.2}", k.close),
                        format!("{:.2}", k.high),
                        format!("{:.2}", k.low),
                        format!("{:+.2}", k.change_percent),
                    ]
                })
                .collect(),
        }],
    ));
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TABLE: &str = "|    | date | code | open | close | high | low | volume | amount | amplitude | change |\n\
|---|---|---|---|---|---|---|---|---|---|---|\n\
| 0 | 2025-01-02 | 600519 | 1,500.0 | 1,510.5 | 1,520.0 | 1,490.0 | 3.2万 | 4.8亿 | 2.0 | 0.70% |\n\
| 1 | 2025-01-03 | 600519 | 1,510.0 | 1,495.0 | 1,515.0 | 1,480.0 | 2.9万 | 4.3亿 | 2.3 | -1.03% |\n";

    #[test]
    fn numbers_with_units() {
        assert_eq!(parse_number_with_unit("1.5万"), 15_000.0);
        assert_eq!(parse_number_with_unit("2亿"), 200_000_000.0);
        assert_eq!(parse_number_with_unit("12,345.5"), 12_345.5);
        assert_eq!(parse_number_with_unit("n/a"), 0.0);
    }

    #[test]
    fn klines_follow_column_positions() {
        let klines = parse_klines(TABLE);
        assert_eq!(klines.len(), 2);
        assert_eq!(klines[0].date, "2025-01-02");
        assert_eq!(klines[0].close, 1510.5);
        assert_eq!(klines[1].change_percent, -1.03);
    }

    #[test]
    fn summary_reports_last_close_and_range() {
        let payload = json!({
            "success": true,
            "market_code": "SH",
            "symbol": "600519",
            "interval": "daily",
            "start_date": "2025-01-01",
            "end_date": "2025-01-03",
            "kline_markdown_table": TABLE
        });
        let text = RenderNode::section(render_history(&payload)).to_plain_text();
        assert!(text.contains("**SH.600519**\nDaily\n2025-01-01 ~ 2025-01-03"));
        assert!(text.contains("**Last close 1495.00**\n-1.03%\nRange 1480.00 - 1520.00"));
        assert!(text.contains("2 candles from 2025-01-02"));
    }
}
