use crate::error::PluginError;
use crate::message::Message;
use crate::node::RenderNode;
use crate::part::Part;

/// Everything a plugin sees when rendering one part.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub part: &'a Part,
    pub part_index: usize,
    pub message: &'a Message,
}

impl<'a> RenderContext<'a> {
    pub fn new(part: &'a Part, part_index: usize, message: &'a Message) -> Self {
        Self {
            part,
            part_index,
            message,
        }
    }
}

/// What a plugin decided for a part.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderOutcome {
    pub should_render: bool,
    pub content: Option<RenderNode>,
    /// Number of following parts this plugin already accounted for.
    pub skip_next: usize,
}

impl RenderOutcome {
    pub fn show(content: RenderNode) -> Self {
        Self {
            should_render: true,
            content: Some(content),
            skip_next: 0,
        }
    }

    pub fn hide() -> Self {
        Self::default()
    }

    pub fn skipping(mut self, count: usize) -> Self {
        self.skip_next = count;
        self
    }

    /// Whether the outcome produces visible output.
    pub fn is_visible(&self) -> bool {
        self.should_render && self.content.as_ref().is_some_and(|node| !node.is_empty())
    }
}

/// A renderer for one or more part types.
///
/// Plugins are registered under explicit keys in a
/// [`PluginRegistry`](crate::registry::PluginRegistry); `can_handle` and
/// `priority` only take part in resolution when no key matches exactly.
pub trait PartPlugin: Send + Sync {
    /// Canonical part type this plugin was written for.
    fn plugin_type(&self) -> &str;

    fn display_name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Predicate used for types without an exact registration.
    fn can_handle(&self, _part_type: &str) -> bool {
        false
    }

    /// Higher wins among predicate matches.
    fn priority(&self) -> i32 {
        0
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Result<RenderOutcome, PluginError>;
}
