use novas_parts::prelude::*;
use serde_json::Value;

use crate::common::{StateLabels, expect_tool, labelled, str_field, tool_card, tool_error};

const LABELS: StateLabels = StateLabels {
    streaming: "Searching images...",
    input_available: "Query received",
    output_available: "Images found",
    output_error: "Search failed",
    other: "Ready",
};

const MAX_IMAGES: usize = 9;

pub struct ImageSearchPlugin;

impl PartPlugin for ImageSearchPlugin {
    fn plugin_type(&self) -> &str {
        "tool-image_search"
    }

    fn display_name(&self) -> &str {
        "Image Search"
    }

    fn description(&self) -> &str {
        "Renders image search results as a gallery"
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Result<RenderOutcome, PluginError> {
        let tool = expect_tool(ctx, self.plugin_type())?;
        let mut details = Vec::new();
        if let Some(query) = tool.input.as_ref().and_then(|i| str_field(i, &["query"])) {
            details.push(labelled("Query", query));
        }
        match tool.state {
            ToolState::OutputAvailable => details.push(render_gallery(tool.output.as_ref())),
            ToolState::OutputError => details.push(tool_error(tool)),
            _ => {}
        }
        Ok(RenderOutcome::show(tool_card("Image Search", tool, &LABELS, details)))
    }
}

fn render_gallery(output: Option<&Value>) -> RenderNode {
    let images: Vec<RenderNode> = output
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let src = str_field(item, &["img_src", "thumbnail_url", "url"])?;
                    let title = str_field(item, &["title"]).unwrap_or("Image");
                    let mut children = vec![RenderNode::image(src, title)];
                    if let Some(source) = str_field(item, &["source_url"]) {
                        children.push(RenderNode::link(source, title));
                    }
                    Some(RenderNode::section(children))
                })
                .take(MAX_IMAGES)
                .collect()
        })
        .unwrap_or_default();
    if images.is_empty() {
        return RenderNode::placeholder("No images found");
    }
    RenderNode::block(BlockKind::List, images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(output: Value) -> String {
        let message = Message::new("a", Role::Assistant).with_parts(vec![Part::from(json!({
            "type": "tool-image_search",
            "toolCallId": "i1",
            "state": "output-available",
            "output": output
        }))]);
        let ctx = RenderContext::new(&message.parts[0], 0, &message);
        ImageSearchPlugin.render(&ctx).expect("renders").content.expect("content").to_plain_text()
    }

    #[test]
    fn gallery_is_capped_at_nine_images() {
        let items: Vec<Value> = (0..12)
            .map(|i| json!({"thumbnail_url": format!("https://img.example/{i}.jpg"), "title": format!("t{i}")}))
            .collect();
        let text = render(Value::Array(items));
        assert_eq!(text.matches("![").count(), 9);
        assert!(text.contains("![t0](https://img.example/0.jpg)"));
    }

    #[test]
    fn non_array_output_shows_placeholder() {
        assert!(render(json!({"unexpected": true})).contains("(No images found)"));
    }
}
