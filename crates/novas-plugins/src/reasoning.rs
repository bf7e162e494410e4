use novas_parts::prelude::*;
use novas_parts::TextState;

pub struct ReasoningPlugin;

impl PartPlugin for ReasoningPlugin {
    fn plugin_type(&self) -> &str {
        "reasoning"
    }

    fn display_name(&self) -> &str {
        "Reasoning"
    }

    fn description(&self) -> &str {
        "Renders model reasoning in a collapsible block"
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Result<RenderOutcome, PluginError> {
        let Part::Reasoning(reasoning) = ctx.part else {
            return Ok(RenderOutcome::hide());
        };
        if reasoning.text.trim().is_empty() {
            return Ok(RenderOutcome::hide());
        }
        let streaming = reasoning.state == Some(TextState::Streaming);
        let title = if streaming { "Thinking..." } else { "Reasoning" };
        Ok(RenderOutcome::show(RenderNode::block(
            BlockKind::Reasoning,
            vec![RenderNode::collapsible(
                title,
                streaming,
                vec![RenderNode::markdown(reasoning.text.clone())],
            )],
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn streaming_reasoning_is_expanded() {
        let message = Message::new("a", Role::Assistant).with_parts(vec![Part::from(
            json!({"type": "reasoning", "text": "step one", "state": "streaming"}),
        )]);
        let ctx = RenderContext::new(&message.parts[0], 0, &message);
        let outcome = ReasoningPlugin.render(&ctx).expect("renders");
        assert_eq!(
            outcome.content.map(|n| n.to_plain_text()),
            Some("v Thinking...\n  step one\n".to_string())
        );
    }

    #[test]
    fn blank_reasoning_is_hidden() {
        let message = Message::new("a", Role::Assistant)
            .with_parts(vec![Part::from(json!({"type": "reasoning", "text": " "}))]);
        let ctx = RenderContext::new(&message.parts[0], 0, &message);
        assert!(!ReasoningPlugin.render(&ctx).expect("renders").should_render);
    }
}
