use novas_parts::prelude::*;

use crate::common::{StateLabels, expect_tool, title_case_tool_name, tool_card, tool_error};

const LABELS: StateLabels = StateLabels {
    streaming: "Processing...",
    input_available: "Input received",
    output_available: "Completed",
    output_error: "Error occurred",
    other: "Unknown state",
};

/// Generic renderer for tool calls without a dedicated plugin.
pub struct DefaultToolPlugin;

impl PartPlugin for DefaultToolPlugin {
    fn plugin_type(&self) -> &str {
        "tool"
    }

    fn display_name(&self) -> &str {
        "Tool Call"
    }

    fn description(&self) -> &str {
        "Renders any tool call with its input, output and errors"
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Result<RenderOutcome, PluginError> {
        let tool = expect_tool(ctx, self.plugin_type())?;
        let mut details = Vec::new();
        if let Some(input) = &tool.input {
            details.push(RenderNode::collapsible("Input", false, vec![RenderNode::json(input)]));
        }
        match tool.state {
            ToolState::OutputAvailable => {
                if let Some(output) = &tool.output {
                    details.push(RenderNode::collapsible("Output", false, vec![RenderNode::json(output)]));
                }
            }
            ToolState::OutputError => details.push(tool_error(tool)),
            _ => {}
        }
        Ok(RenderOutcome::show(tool_card(
            title_case_tool_name(&tool.type_name),
            tool,
            &LABELS,
            details,
        )))
    }
}
