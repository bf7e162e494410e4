use std::collections::HashMap;

use tracing::trace;

use crate::equality::{PartRow, rows_equal};
use crate::message::Message;
use crate::renderer::{PartRenderer, RenderedPart};

struct CachedRow {
    row: PartRow,
    rendered: RenderedPart,
}

/// Row-level memo keyed by (message id, part index).
///
/// While a message streams, most of its parts are unchanged between updates;
/// the cache re-invokes a plugin only for rows whose [`PartRow`] changed.
#[derive(Default)]
pub struct PartRenderCache {
    rows: HashMap<(String, usize), CachedRow>,
    hits: u64,
    misses: u64,
}

impl PartRenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render_row(
        &mut self,
        renderer: &PartRenderer,
        message: &Message,
        part_index: usize,
        class_name: Option<&str>,
    ) -> Option<RenderedPart> {
        let part = message.parts.get(part_index)?;
        let row = PartRow {
            part: part.clone(),
            part_index,
            class_name: class_name.map(str::to_owned),
            sources: message.source_urls().into_iter().map(str::to_owned).collect(),
        };
        let key = (message.id.clone(), part_index);
        if let Some(cached) = self.rows.get(&key)
            && rows_equal(&cached.row, &row)
        {
            self.hits += 1;
            trace!(message_id = %message.id, part_index, "part render cache hit");
            return Some(cached.rendered.clone());
        }

        self.misses += 1;
        let rendered = renderer.render(part, part_index, message);
        self.rows.insert(
            key,
            CachedRow {
                row,
                rendered: rendered.clone(),
            },
        );
        Some(rendered)
    }

    /// Cached equivalent of [`PartRenderer::render_message`].
    pub fn render_message(
        &mut self,
        renderer: &PartRenderer,
        message: &Message,
        class_name: Option<&str>,
    ) -> Vec<RenderedPart> {
        let mut slots = Vec::with_capacity(message.parts.len());
        let mut skip = 0usize;
        for index in 0..message.parts.len() {
            if skip > 0 {
                skip -= 1;
                slots.push(RenderedPart {
                    part_index: index,
                    part_type: message.parts[index].type_name().to_string(),
                    plugin: None,
                    node: None,
                    skip_next: 0,
                });
                continue;
            }
            if let Some(slot) = self.render_row(renderer, message, index, class_name) {
                skip = slot.skip_next;
                slots.push(slot);
            }
        }
        // Parts beyond the current length belong to a truncated message.
        self.rows
            .retain(|(id, index), _| id != &message.id || *index < message.parts.len());
        slots
    }

    /// Drop every cached row of a message (after a rewrite removes it).
    pub fn evict_message(&mut self, message_id: &str) {
        self.rows.retain(|(id, _), _| id != message_id);
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
