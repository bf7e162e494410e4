pub use crate::error::PluginError;
pub use crate::message::{Message, Role};
pub use crate::node::{BlockKind, RenderNode};
pub use crate::part::{Part, ToolPart, ToolState};
pub use crate::plugin::{PartPlugin, RenderContext, RenderOutcome};
pub use crate::registry::{PluginRegistry, SharedPlugin};
pub use crate::renderer::{PartRenderer, RenderedPart};
