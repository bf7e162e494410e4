use novas_parts::prelude::*;

use crate::common::labelled;

/// Fallback for `data-*` parts.
pub struct DataPlugin;

impl PartPlugin for DataPlugin {
    fn plugin_type(&self) -> &str {
        "data"
    }

    fn display_name(&self) -> &str {
        "Data"
    }

    fn description(&self) -> &str {
        "Renders application data parts as a collapsible dump"
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Result<RenderOutcome, PluginError> {
        let (name, id, data) = match ctx.part {
            Part::Data(data) => (data.name().to_string(), data.id.clone(), data.data.clone()),
            // A malformed data part still deserves a look at its raw content.
            other => (
                other
                    .type_name()
                    .strip_prefix("data-")
                    .unwrap_or(other.type_name())
                    .to_string(),
                None,
                other.to_value(),
            ),
        };
        let mut children = vec![RenderNode::strong(format!("Data ({name})"))];
        if let Some(id) = id {
            children.push(labelled("ID", id));
        }
        children.push(RenderNode::collapsible("Data", false, vec![RenderNode::json(&data)]));
        Ok(RenderOutcome::show(RenderNode::block(BlockKind::Card, children)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shows_name_id_and_dump() {
        let message = Message::new("a", Role::Assistant).with_parts(vec![Part::from(
            json!({"type": "data-blob", "id": "b1", "data": {"size": 3}}),
        )]);
        let ctx = RenderContext::new(&message.parts[0], 0, &message);
        let text = DataPlugin.render(&ctx).expect("renders").content.expect("content").to_plain_text();
        assert!(text.starts_with("**Data (blob)**\n**ID:**\nb1\n> Data\n"));
        assert!(text.contains("\"size\": 3"));
    }
}
