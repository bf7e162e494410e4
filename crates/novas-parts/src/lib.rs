//! Message part model and headless rendering pipeline for the novas chat client.
//!
//! Parts stream in as JSON, are parsed into [`Part`] (never failing), and are
//! rendered one by one through a [`PartRenderer`], which resolves a plugin from
//! a [`PluginRegistry`] and turns the plugin's answer into a [`RenderNode`]
//! tree. [`PartRenderCache`] keeps unchanged rows from being re-rendered while
//! a message is still streaming.
//!
//! ```
//! use std::sync::Arc;
//!
//! use novas_parts::prelude::*;
//!
//! let renderer = PartRenderer::new(Arc::new(PluginRegistry::new()));
//! let message = Message::new("m1", Role::Assistant)
//!     .with_parts(vec![Part::from(serde_json::json!({"type": "mystery-part", "foo": 1}))]);
//! let slots = renderer.render_message(&message);
//! assert!(slots[0].is_visible());
//! ```

/// Row-level render memoization.
pub mod cache;
/// Structural part equality used to skip re-renders.
pub mod equality;
/// Plugin error type.
pub mod error;
/// Messages, roles and chat summaries.
pub mod message;
/// Render tree produced by plugins.
pub mod node;
/// Process-wide logging setup.
pub mod observability;
/// Wire part model.
pub mod part;
/// Plugin contract and render context.
pub mod plugin;
/// Common imports for plugin authors.
pub mod prelude;
/// Plugin registry with predicate and prefix fallbacks.
pub mod registry;
/// Part dispatch and failure isolation.
pub mod renderer;

pub use cache::PartRenderCache;
pub use equality::{PartRow, parts_equal, rows_equal};
pub use error::PluginError;
pub use message::{Chat, ChatFile, Message, MessageMetadata, Role};
pub use node::{BlockKind, Emphasis, RenderNode};
pub use part::{
    DataPart, FilePart, Part, PartKind, ReasoningPart, SourceDocumentPart, SourceUrlPart,
    TextPart, TextState, ToolPart, ToolState, UnknownPart,
};
pub use plugin::{PartPlugin, RenderContext, RenderOutcome};
pub use registry::{PluginRegistry, SharedPlugin};
pub use renderer::{DefaultPartPlugin, PartRenderer, RenderedPart};
