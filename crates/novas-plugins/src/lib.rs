//! Built-in part plugins. Use with [`default_registry`] or [`default_renderer`].
//!
//! ```
//! use novas_parts::{Message, Part, Role};
//!
//! let renderer = novas_plugins::default_renderer();
//! let message = Message::new("m1", Role::Assistant).with_parts(vec![Part::text("Hello")]);
//! let slots = renderer.render_message(&message);
//! assert!(slots[0].is_visible());
//! ```

mod common;
mod data;
mod file;
mod image_search;
mod reasoning;
mod search_and_fetch;
mod source;
mod step;
mod text;
mod tool_default;
pub mod trading;
mod weather;
mod web_page_fetch;
mod web_search;

use std::sync::Arc;

pub use common::{StateLabels, title_case_tool_name};
pub use data::DataPlugin;
pub use file::FilePlugin;
pub use image_search::ImageSearchPlugin;
pub use reasoning::ReasoningPlugin;
pub use search_and_fetch::SearchAndFetchPlugin;
pub use source::SourcePlugin;
pub use step::StepStartPlugin;
pub use text::{TextPlugin, close_think_tags, link_citations};
pub use tool_default::DefaultToolPlugin;
pub use weather::WeatherPlugin;
pub use web_page_fetch::WebPageFetchPlugin;
pub use web_search::WebSearchPlugin;

use novas_parts::{PartRenderer, PluginRegistry};
use trading::{
    CompanyNewsPlugin, FinancialReportKind, FinancialReportPlugin, HistoricalDataPlugin,
    IndicatorsReportPlugin, ResearchReportPlugin,
};

/// Create a registry with every built-in plugin and the `tool-*` / `data-*` fallbacks.
pub fn default_registry() -> PluginRegistry {
    let mut r = PluginRegistry::new();
    r.register("text", Arc::new(TextPlugin));
    r.register("reasoning", Arc::new(ReasoningPlugin));
    r.register_many(["source-url", "source-document"], Arc::new(SourcePlugin));
    r.register("file", Arc::new(FilePlugin));
    r.register("step-start", Arc::new(StepStartPlugin));

    r.register("tool-image_search", Arc::new(ImageSearchPlugin));
    r.register_many(["tool-weather", "tool-get_weather"], Arc::new(WeatherPlugin));
    r.register_many(
        ["tool-web_search-web_page_fetch", "tool-web_page_fetch"],
        Arc::new(WebPageFetchPlugin),
    );
    r.register_many(
        ["tool-web_search-web_search", "tool-web_search"],
        Arc::new(WebSearchPlugin),
    );
    r.register_many(
        ["tool-web_search-search_and_fetch", "tool-web_search_and_fetch"],
        Arc::new(SearchAndFetchPlugin),
    );

    r.register("tool-trading-retrieve_company_news", Arc::new(CompanyNewsPlugin));
    for kind in FinancialReportKind::ALL {
        r.register(kind.part_type(), Arc::new(FinancialReportPlugin::new(kind)));
    }
    r.register(
        "tool-trading-retrieve_stock_historical_data",
        Arc::new(HistoricalDataPlugin),
    );
    r.register(
        "tool-trading-retrieve_company_research_report",
        Arc::new(ResearchReportPlugin),
    );
    r.register(
        "tool-trading-retrieve_stockstats_indicators_report",
        Arc::new(IndicatorsReportPlugin),
    );

    r.set_tool_fallback(Arc::new(DefaultToolPlugin));
    r.set_data_fallback(Arc::new(DataPlugin));
    r
}

/// A [`PartRenderer`] over [`default_registry`].
pub fn default_renderer() -> PartRenderer {
    PartRenderer::new(Arc::new(default_registry()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use novas_parts::{Message, Part, Role};
    use serde_json::json;

    fn assistant(parts: Vec<serde_json::Value>) -> Message {
        Message::new("a1", Role::Assistant).with_parts(parts.into_iter().map(Part::from).collect())
    }

    #[test]
    fn catalog_keys_resolve_to_their_plugins() {
        let registry = default_registry();
        let cases = [
            ("text", "text"),
            ("source-document", "source-url"),
            ("tool-get_weather", "tool-weather"),
            ("tool-web_search-web_search", "tool-web_search"),
            ("tool-web_search-search_and_fetch", "tool-web_search_and_fetch"),
            (
                "tool-trading-retrieve_financial_balance_sheet",
                "tool-trading-retrieve_financial_balance_sheet",
            ),
            (
                "tool-trading-retrieve_stockstats_indicators_report",
                "tool-trading-retrieve_stockstats_indicators_report",
            ),
        ];
        for (key, plugin) in cases {
            let resolved = registry.resolve(key).map(|p| p.plugin_type().to_string());
            assert_eq!(resolved.as_deref(), Some(plugin), "{key}");
        }
        assert_eq!(registry.len(), 23);
    }

    #[test]
    fn unregistered_types_use_fallbacks() {
        let registry = default_registry();
        let plugin_of = |key: &str| registry.resolve(key).map(|p| p.plugin_type().to_string());
        assert_eq!(plugin_of("tool-nonexistent-xyz").as_deref(), Some("tool"));
        assert_eq!(plugin_of("data-blob").as_deref(), Some("data"));
        assert_eq!(plugin_of("totally-unknown"), None);
    }

    #[test]
    fn tool_card_follows_the_call_lifecycle() {
        let renderer = default_renderer();
        let states = [
            ("input-streaming", "Processing..."),
            ("input-available", "Input received"),
            ("output-available", "Completed"),
        ];
        for (state, label) in states {
            let message = assistant(vec![json!({
                "type": "tool-nonexistent-xyz",
                "toolCallId": "c1",
                "state": state,
                "input": {"q": "x"},
                "output": {"answer": 42},
            })]);
            let text = renderer.render_message(&message)[0]
                .node
                .as_ref()
                .expect("tool card")
                .to_plain_text();
            assert!(text.starts_with("**Nonexistent Xyz**\n"), "{text}");
            assert!(text.contains(&format!("[{state}] {label}")), "{text}");
            assert_eq!(text.contains("> Output"), state == "output-available");
        }
    }

    #[test]
    fn mystery_part_falls_through_to_default_renderer() {
        let renderer = default_renderer();
        let message = assistant(vec![
            json!({"type": "text", "text": "before"}),
            json!({"type": "mystery-part", "foo": 1}),
        ]);
        let slots = renderer.render_message(&message);
        assert_eq!(slots[1].plugin.as_deref(), Some("default"));
        let text = slots[1].node.as_ref().expect("visible").to_plain_text();
        assert!(text.contains("Unknown Part Type: mystery-part"));
    }

    #[test]
    fn search_and_fetch_is_suppressed_but_siblings_render() {
        let renderer = default_renderer();
        let message = assistant(vec![
            json!({"type": "tool-web_search_and_fetch", "toolCallId": "s", "state": "output-available", "output": {}}),
            json!({"type": "tool-web_search", "toolCallId": "w", "state": "input-available", "input": {"query": "rust"}}),
        ]);
        let visible: Vec<bool> = renderer
            .render_message(&message)
            .iter()
            .map(|slot| slot.is_visible())
            .collect();
        assert_eq!(visible, vec![false, true]);
    }
}
