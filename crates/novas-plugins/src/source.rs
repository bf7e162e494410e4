use novas_parts::prelude::*;

use crate::common::host_name;

/// Handles both `source-url` and `source-document` parts.
pub struct SourcePlugin;

impl PartPlugin for SourcePlugin {
    fn plugin_type(&self) -> &str {
        "source-url"
    }

    fn display_name(&self) -> &str {
        "Source"
    }

    fn description(&self) -> &str {
        "Renders cited web pages and documents"
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Result<RenderOutcome, PluginError> {
        let node = match ctx.part {
            Part::SourceUrl(source) => {
                let label = source
                    .title
                    .clone()
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| host_name(&source.url));
                RenderNode::row(vec![
                    RenderNode::muted("Source"),
                    RenderNode::link(source.url.clone(), label),
                ])
            }
            Part::SourceDocument(doc) => {
                let mut children = vec![RenderNode::muted("Document"), RenderNode::text(doc.title.clone())];
                let detail = doc.filename.as_deref().unwrap_or(&doc.media_type);
                children.push(RenderNode::muted(format!("({detail})")));
                RenderNode::row(children)
            }
            _ => return Ok(RenderOutcome::hide()),
        };
        Ok(RenderOutcome::show(node))
    }
}
