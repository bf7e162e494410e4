use novas_parts::prelude::*;

/// Combined search-and-fetch calls render nothing; their results arrive as sibling parts.
pub struct SearchAndFetchPlugin;

impl PartPlugin for SearchAndFetchPlugin {
    fn plugin_type(&self) -> &str {
        "tool-web_search_and_fetch"
    }

    fn display_name(&self) -> &str {
        "Web Search And Fetch"
    }

    fn description(&self) -> &str {
        "Hides composite search-and-fetch tool calls"
    }

    fn render(&self, _ctx: &RenderContext<'_>) -> Result<RenderOutcome, PluginError> {
        Ok(RenderOutcome::hide())
    }
}
