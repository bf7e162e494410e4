use novas_parts::prelude::*;

/// Divider between model steps.
pub struct StepStartPlugin;

impl PartPlugin for StepStartPlugin {
    fn plugin_type(&self) -> &str {
        "step-start"
    }

    fn display_name(&self) -> &str {
        "Step Start"
    }

    fn description(&self) -> &str {
        "Renders step start markers"
    }

    fn render(&self, _ctx: &RenderContext<'_>) -> Result<RenderOutcome, PluginError> {
        Ok(RenderOutcome::show(RenderNode::Divider))
    }
}
