use novas_parts::prelude::*;

pub struct FilePlugin;

impl PartPlugin for FilePlugin {
    fn plugin_type(&self) -> &str {
        "file"
    }

    fn display_name(&self) -> &str {
        "File"
    }

    fn description(&self) -> &str {
        "Renders attached files, inlining images"
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Result<RenderOutcome, PluginError> {
        let Part::File(file) = ctx.part else {
            return Ok(RenderOutcome::hide());
        };
        let name = file.filename.as_deref().unwrap_or("File");
        let mut children = Vec::new();
        if file.media_type.starts_with("image/") {
            children.push(RenderNode::image(file.url.clone(), name));
        }
        children.push(RenderNode::row(vec![
            RenderNode::link(file.url.clone(), name),
            RenderNode::muted(file.media_type.clone()),
        ]));
        Ok(RenderOutcome::show(RenderNode::block(BlockKind::Card, children)))
    }
}
