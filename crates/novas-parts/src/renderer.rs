//! Dispatch of parts to plugins.
//!
//! [`PartRenderer::render`] resolves a plugin, invokes it and normalizes the
//! outcome into a [`RenderedPart`]: either a visible node wrapped in a
//! [`BlockKind::Part`] container, or a suppressed slot. Plugin errors stay in
//! their own slot.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::PluginError;
use crate::message::Message;
use crate::node::{BlockKind, RenderNode};
use crate::part::Part;
use crate::plugin::{PartPlugin, RenderContext, RenderOutcome};
use crate::registry::{PluginRegistry, SharedPlugin};

/// Result of rendering one part slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedPart {
    pub part_index: usize,
    pub part_type: String,
    /// Plugin that produced the slot; `None` when a previous plugin skipped it.
    pub plugin: Option<String>,
    /// Visible content, already wrapped; `None` when suppressed.
    pub node: Option<RenderNode>,
    #[serde(skip)]
    pub skip_next: usize,
}

impl RenderedPart {
    pub fn is_visible(&self) -> bool {
        self.node.is_some()
    }

    fn suppressed(part_index: usize, part_type: &str, plugin: Option<String>) -> Self {
        Self {
            part_index,
            part_type: part_type.to_string(),
            plugin,
            node: None,
            skip_next: 0,
        }
    }
}

/// Renders parts through a shared [`PluginRegistry`].
#[derive(Clone)]
pub struct PartRenderer {
    registry: Arc<PluginRegistry>,
    fallback: SharedPlugin,
}

impl PartRenderer {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self {
            registry,
            fallback: Arc::new(DefaultPartPlugin),
        }
    }

    /// Replace the renderer used when nothing in the registry resolves.
    pub fn with_fallback(mut self, fallback: SharedPlugin) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn render(&self, part: &Part, part_index: usize, message: &Message) -> RenderedPart {
        let part_type = part.type_name();
        let plugin = self.registry.resolve(part_type).unwrap_or(&self.fallback);
        let ctx = RenderContext::new(part, part_index, message);
        let plugin_name = plugin.plugin_type().to_string();

        match plugin.render(&ctx) {
            Ok(outcome) => {
                let skip_next = outcome.skip_next;
                let visible = outcome.is_visible();
                let RenderOutcome { content, .. } = outcome;
                match content.filter(|_| visible) {
                    Some(content) => RenderedPart {
                        part_index,
                        part_type: part_type.to_string(),
                        plugin: Some(plugin_name),
                        node: Some(RenderNode::block(BlockKind::Part(part_index), vec![content])),
                        skip_next,
                    },
                    None => {
                        debug!(part_type, part_index, plugin = %plugin_name, "part suppressed");
                        RenderedPart {
                            skip_next,
                            ..RenderedPart::suppressed(part_index, part_type, Some(plugin_name))
                        }
                    }
                }
            }
            Err(err) => {
                warn!(part_type, part_index, plugin = %plugin_name, message_id = %message.id, error = %err, "part plugin failed");
                RenderedPart {
                    part_index,
                    part_type: part_type.to_string(),
                    plugin: Some(plugin_name),
                    node: Some(RenderNode::block(
                        BlockKind::Part(part_index),
                        vec![render_failure(part_type, &err)],
                    )),
                    skip_next: 0,
                }
            }
        }
    }

    /// Render every part of a message in order, honouring `skip_next` requests.
    /// Always returns one slot per part.
    pub fn render_message(&self, message: &Message) -> Vec<RenderedPart> {
        let mut slots = Vec::with_capacity(message.parts.len());
        let mut skip = 0usize;
        for (index, part) in message.parts.iter().enumerate() {
            if skip > 0 {
                skip -= 1;
                slots.push(RenderedPart::suppressed(index, part.type_name(), None));
                continue;
            }
            let slot = self.render(part, index, message);
            skip = slot.skip_next;
            slots.push(slot);
        }
        slots
    }
}

fn render_failure(part_type: &str, err: &PluginError) -> RenderNode {
    RenderNode::block(
        BlockKind::Error,
        vec![
            RenderNode::strong(format!("Failed to render {part_type}")),
            RenderNode::error(err.message()),
        ],
    )
}

/// Renderer of last resort: shows the raw type and a dump of the part.
pub struct DefaultPartPlugin;

impl PartPlugin for DefaultPartPlugin {
    fn plugin_type(&self) -> &str {
        "default"
    }

    fn display_name(&self) -> &str {
        "Unknown Part"
    }

    fn description(&self) -> &str {
        "Shows the raw type and content of parts no plugin handles"
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Result<RenderOutcome, PluginError> {
        let type_name = ctx.part.type_name();
        let label = if type_name.is_empty() { "(untyped)" } else { type_name };
        Ok(RenderOutcome::show(RenderNode::block(
            BlockKind::Card,
            vec![
                RenderNode::muted(format!("Unknown Part Type: {label}")),
                RenderNode::collapsible("Content", false, vec![RenderNode::json(&ctx.part.to_value())]),
            ],
        )))
    }
}
