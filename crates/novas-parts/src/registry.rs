use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::part::{DATA_PREFIX, TOOL_PREFIX};
use crate::plugin::PartPlugin;

/// Shared handle to a registered plugin.
pub type SharedPlugin = Arc<dyn PartPlugin>;

struct Entry {
    plugin: SharedPlugin,
    seq: u64,
}

/// Registry: part type key -> plugin, plus designated fallbacks for `tool-*` and `data-*` types.
///
/// Build it once at startup and share it behind an `Arc`; resolution only reads.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Entry>,
    next_seq: u64,
    tool_fallback: Option<SharedPlugin>,
    data_fallback: Option<SharedPlugin>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin under `part_type`. Last write wins; an overwritten key keeps its
    /// original registration position for tie-breaking.
    pub fn register(&mut self, part_type: impl Into<String>, plugin: SharedPlugin) {
        let part_type = part_type.into();
        match self.plugins.get_mut(&part_type) {
            Some(entry) => entry.plugin = plugin,
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.plugins.insert(part_type, Entry { plugin, seq });
            }
        }
    }

    /// Register the same plugin under several keys.
    pub fn register_many<'a>(&mut self, part_types: impl IntoIterator<Item = &'a str>, plugin: SharedPlugin) {
        for part_type in part_types {
            self.register(part_type, plugin.clone());
        }
    }

    pub fn set_tool_fallback(&mut self, plugin: SharedPlugin) {
        self.tool_fallback = Some(plugin);
    }

    pub fn set_data_fallback(&mut self, plugin: SharedPlugin) {
        self.data_fallback = Some(plugin);
    }

    pub fn unregister(&mut self, part_type: &str) -> Option<SharedPlugin> {
        self.plugins.remove(part_type).map(|entry| entry.plugin)
    }

    /// Resolve the plugin for a part type:
    /// exact key, then the highest-priority `can_handle` match (earliest registration
    /// on ties), then the `tool-`/`data-` fallbacks. `None` means the caller should use
    /// its absolute default renderer.
    pub fn resolve(&self, part_type: &str) -> Option<&SharedPlugin> {
        if let Some(entry) = self.plugins.get(part_type) {
            debug!(part_type, plugin = entry.plugin.plugin_type(), "resolved part plugin by key");
            return Some(&entry.plugin);
        }

        let candidate = self
            .plugins
            .values()
            .filter(|entry| entry.plugin.can_handle(part_type))
            .max_by(|a, b| {
                a.plugin
                    .priority()
                    .cmp(&b.plugin.priority())
                    .then_with(|| b.seq.cmp(&a.seq))
            });
        if let Some(entry) = candidate {
            debug!(part_type, plugin = entry.plugin.plugin_type(), "resolved part plugin by predicate");
            return Some(&entry.plugin);
        }

        let fallback = if part_type.starts_with(TOOL_PREFIX) {
            self.tool_fallback.as_ref()
        } else if part_type.starts_with(DATA_PREFIX) {
            self.data_fallback.as_ref()
        } else {
            None
        };
        if fallback.is_some() {
            debug!(part_type, "resolved part plugin by prefix fallback");
        }
        fallback
    }

    pub fn can_handle(&self, part_type: &str) -> bool {
        self.resolve(part_type).is_some()
    }

    /// Registered keys and plugins in registration order.
    pub fn list_all(&self) -> Vec<(&str, &SharedPlugin)> {
        let mut entries: Vec<_> = self.plugins.iter().collect();
        entries.sort_by_key(|(_, entry)| entry.seq);
        entries
            .into_iter()
            .map(|(key, entry)| (key.as_str(), &entry.plugin))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PluginError;
    use crate::node::RenderNode;
    use crate::plugin::{RenderContext, RenderOutcome};

    struct Named {
        name: &'static str,
        prefix: Option<&'static str>,
        priority: i32,
    }

    impl Named {
        fn exact(name: &'static str) -> SharedPlugin {
            Arc::new(Self {
                name,
                prefix: None,
                priority: 0,
            })
        }

        fn matching(name: &'static str, prefix: &'static str, priority: i32) -> SharedPlugin {
            Arc::new(Self {
                name,
                prefix: Some(prefix),
                priority,
            })
        }
    }

    impl PartPlugin for Named {
        fn plugin_type(&self) -> &str {
            self.name
        }

        fn display_name(&self) -> &str {
            self.name
        }

        fn can_handle(&self, part_type: &str) -> bool {
            self.prefix.is_some_and(|p| part_type.starts_with(p))
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn render(&self, _ctx: &RenderContext<'_>) -> Result<RenderOutcome, PluginError> {
            Ok(RenderOutcome::show(RenderNode::text(self.name)))
        }
    }

    fn resolved_name(registry: &PluginRegistry, part_type: &str) -> Option<String> {
        registry
            .resolve(part_type)
            .map(|plugin| plugin.plugin_type().to_string())
    }

    #[test]
    fn exact_key_beats_any_predicate() {
        let mut registry = PluginRegistry::new();
        registry.register("tool-weather", Named::exact("weather"));
        registry.register("greedy", Named::matching("greedy", "tool-", 100));
        assert_eq!(resolved_name(&registry, "tool-weather").as_deref(), Some("weather"));
        assert_eq!(resolved_name(&registry, "tool-other").as_deref(), Some("greedy"));
    }

    #[test]
    fn predicate_ties_go_to_earliest_registration() {
        let mut registry = PluginRegistry::new();
        registry.register("first", Named::matching("first", "x-", 1));
        registry.register("second", Named::matching("second", "x-", 1));
        registry.register("low", Named::matching("low", "x-", 0));
        for _ in 0..5 {
            assert_eq!(resolved_name(&registry, "x-thing").as_deref(), Some("first"));
        }

        registry.register("first", Named::matching("first-v2", "x-", 1));
        assert_eq!(resolved_name(&registry, "x-thing").as_deref(), Some("first-v2"));
    }

    #[test]
    fn prefix_fallbacks_and_unknown_types() {
        let mut registry = PluginRegistry::new();
        registry.set_tool_fallback(Named::exact("tool-fallback"));
        registry.set_data_fallback(Named::exact("data-fallback"));
        assert_eq!(
            resolved_name(&registry, "tool-nonexistent-xyz").as_deref(),
            Some("tool-fallback")
        );
        assert_eq!(resolved_name(&registry, "data-blob").as_deref(), Some("data-fallback"));
        assert!(registry.resolve("totally-unknown").is_none());
        assert!(!registry.can_handle("totally-unknown"));
    }

    #[test]
    fn last_write_wins_and_unregister() {
        let mut registry = PluginRegistry::new();
        registry.register("text", Named::exact("a"));
        registry.register("reasoning", Named::exact("r"));
        registry.register("text", Named::exact("b"));
        assert_eq!(resolved_name(&registry, "text").as_deref(), Some("b"));
        let keys: Vec<_> = registry.list_all().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["text", "reasoning"]);

        assert!(registry.unregister("text").is_some());
        assert!(registry.resolve("text").is_none());
        assert_eq!(registry.len(), 1);
    }
}
