use novas_parts::prelude::*;
use serde_json::Value;

use super::table::table_or_markdown;
use super::{TradingTool, render_trading, symbol_label};
use crate::common::{StateLabels, scalar_field, str_field};

/// The four financial statement tools share one payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinancialReportKind {
    AnalysisIndicators,
    BalanceSheet,
    CashFlowStatement,
    IncomeStatement,
}

impl FinancialReportKind {
    pub const ALL: [FinancialReportKind; 4] = [
        Self::AnalysisIndicators,
        Self::BalanceSheet,
        Self::CashFlowStatement,
        Self::IncomeStatement,
    ];

    fn tool(self) -> &'static TradingTool {
        match self {
            Self::AnalysisIndicators => &ANALYSIS,
            Self::BalanceSheet => &BALANCE_SHEET,
            Self::CashFlowStatement => &CASH_FLOW,
            Self::IncomeStatement => &INCOME,
        }
    }

    pub fn part_type(self) -> &'static str {
        self.tool().key
    }
}

const ANALYSIS: TradingTool = TradingTool {
    key: "tool-trading-retrieve_financial_analysis_indicators",
    title: "Financial Analysis",
    labels: StateLabels {
        streaming: "Fetching financial analysis...",
        input_available: "Parameters received",
        output_available: "Analysis data ready",
        output_error: "Failed to fetch analysis",
        other: "Ready",
    },
    noun: "financial",
    failure: "Failed to retrieve financial analysis",
};

const BALANCE_SHEET: TradingTool = TradingTool {
    key: "tool-trading-retrieve_financial_balance_sheet",
    title: "Balance Sheet",
    labels: StateLabels {
        streaming: "Fetching balance sheet...",
        input_available: "Parameters received",
        output_available: "Balance sheet data ready",
        output_error: "Failed to fetch balance sheet",
        other: "Ready",
    },
    noun: "balance sheet",
    failure: "Failed to retrieve balance sheet",
};

const CASH_FLOW: TradingTool = TradingTool {
    key: "tool-trading-retrieve_financial_cash_flow_statement",
    title: "Cash Flow Statement",
    labels: StateLabels {
        streaming: "Fetching cash flow statement...",
        input_available: "Parameters received",
        output_available: "Cash flow data ready",
        output_error: "Failed to fetch cash flow statement",
        other: "Ready",
    },
    noun: "cash flow",
    failure: "Failed to retrieve cash flow statement",
};

const INCOME: TradingTool = TradingTool {
    key: "tool-trading-retrieve_financial_income_statement",
    title: "Income Statement",
    labels: StateLabels {
        streaming: "Fetching income statement...",
        input_available: "Parameters received",
        output_available: "Income statement data ready",
        output_error: "Failed to fetch income statement",
        other: "Ready",
    },
    noun: "income statement",
    failure: "Failed to retrieve income statement",
};

pub struct FinancialReportPlugin {
    kind: FinancialReportKind,
}

impl FinancialReportPlugin {
    pub fn new(kind: FinancialReportKind) -> Self {
        Self { kind }
    }
}

impl PartPlugin for FinancialReportPlugin {
    fn plugin_type(&self) -> &str {
        self.kind.tool().key
    }

    fn display_name(&self) -> &str {
        self.kind.tool().title
    }

    fn description(&self) -> &str {
        "Renders financial statements retrieved by the trading tools"
    }

    fn can_handle(&self, part_type: &str) -> bool {
        part_type == self.kind.tool().key
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Result<RenderOutcome, PluginError> {
        render_trading(ctx, self.kind.tool(), render_reports)
    }
}

fn render_reports(payload: &Value) -> Vec<RenderNode> {
    let mut heading = Vec::new();
    if let Some(symbol) = symbol_label(payload) {
        heading.push(RenderNode::strong(symbol));
    }
    if let Some(period) = str_field(payload, &["report_date_type"]) {
        heading.push(RenderNode::muted(match period {
            "annual" => "Annual reports",
            _ => "Quarterly reports",
        }));
    }
    if let Some(years) = scalar_field(payload, &["look_back_years"]) {
        heading.push(RenderNode::muted(format!("{years} years")));
    }
    let mut nodes = vec![RenderNode::row(heading)];

    let reports = payload.get("reports").and_then(Value::as_array);
    match reports.filter(|r| !r.is_empty()) {
        Some(reports) => {
            for (index, report) in reports.iter().enumerate() {
                let name = str_field(report, &["name"]).unwrap_or("Report");
                let body = str_field(report, &["report_markdown_table"])
                    .map(table_or_markdown)
                    .unwrap_or_else(|| RenderNode::placeholder("Empty report"));
                nodes.push(RenderNode::collapsible(name, index == 0, vec![body]));
            }
        }
        None => nodes.push(RenderNode::placeholder("No reports")),
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn each_kind_has_its_own_key() {
        let keys: Vec<_> = FinancialReportKind::ALL.iter().map(|k| k.part_type()).collect();
        assert_eq!(keys.len(), 4);
        assert!(keys.contains(&"tool-trading-retrieve_financial_cash_flow_statement"));
    }

    #[test]
    fn reports_become_tables() {
        let payload = json!({
            "success": true,
            "market_code": "SZ",
            "symbol": "000001",
            "report_date_type": "annual",
            "look_back_years": 3,
            "reports": [{"name": "2024", "report_markdown_table": "| item | value |\n|---|---|\n| assets | 1亿 |\n"}]
        });
        let message = Message::new("a", Role::Assistant).with_parts(vec![Part::from(json!({
            "type": "tool-trading-retrieve_financial_balance_sheet",
            "toolCallId": "b1",
            "state": "output-available",
            "output": [{"type": "text", "text": payload.to_string()}]
        }))]);
        let ctx = RenderContext::new(&message.parts[0], 0, &message);
        let plugin = FinancialReportPlugin::new(FinancialReportKind::BalanceSheet);
        let text = plugin.render(&ctx).expect("renders").content.expect("content").to_plain_text();
        assert!(text.contains("Balance sheet data ready"));
        assert!(text.contains("**SZ.000001**\nAnnual reports\n3 years"));
        assert!(text.contains("v 2024\n  | item | value |"));
        assert!(text.contains("| assets | 1亿 |"));
    }

    #[test]
    fn invalid_payload_names_the_statement() {
        let message = Message::new("a", Role::Assistant).with_parts(vec![Part::from(json!({
            "type": "tool-trading-retrieve_financial_income_statement",
            "toolCallId": "i1",
            "state": "output-available",
            "output": [{"type": "text", "text": "{oops"}]
        }))]);
        let ctx = RenderContext::new(&message.parts[0], 0, &message);
        let plugin = FinancialReportPlugin::new(FinancialReportKind::IncomeStatement);
        let text = plugin.render(&ctx).expect("renders").content.expect("content").to_plain_text();
        assert!(text.contains("Invalid income statement data format"));
    }
}
