use serde_json::{Map, Value};

use crate::part::Part;

/// Structural equality deciding whether a part needs to be re-rendered.
///
/// Object key order never matters. For unknown parts a `null` field is treated
/// the same as an absent one.
pub fn parts_equal(prev: &Part, next: &Part) -> bool {
    if prev.type_name() != next.type_name() {
        return false;
    }
    match (prev, next) {
        (Part::Text(a), Part::Text(b)) => a.text == b.text && a.state == b.state,
        (Part::Reasoning(a), Part::Reasoning(b)) => a.text == b.text && a.state == b.state,
        (Part::Tool(a), Part::Tool(b)) => {
            a.state == b.state
                && a.input == b.input
                && a.output == b.output
                && a.error_text == b.error_text
        }
        (Part::Data(a), Part::Data(b)) => a.id == b.id && a.data == b.data,
        (Part::SourceUrl(a), Part::SourceUrl(b)) => {
            a.source_id == b.source_id && a.url == b.url && a.title == b.title
        }
        (Part::SourceDocument(a), Part::SourceDocument(b)) => {
            a.source_id == b.source_id && a.title == b.title
        }
        (Part::File(a), Part::File(b)) => {
            a.media_type == b.media_type && a.filename == b.filename && a.url == b.url
        }
        (Part::StepStart, Part::StepStart) => true,
        (Part::Unknown(a), Part::Unknown(b)) => match (a.fields(), b.fields()) {
            (Some(a), Some(b)) => shallow_fields_equal(a, b),
            _ => a.raw == b.raw,
        },
        // Same type string but different parse outcome (one side malformed).
        _ => false,
    }
}

fn shallow_fields_equal(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    let present = |map: &Map<String, Value>| map.values().filter(|v| !v.is_null()).count();
    if present(a) != present(b) {
        return false;
    }
    a.iter()
        .filter(|(_, value)| !value.is_null())
        .all(|(key, value)| b.get(key).is_some_and(|other| value == other))
}

/// Inputs of one rendered row; a row is re-rendered only when these change.
#[derive(Debug, Clone, PartialEq)]
pub struct PartRow {
    pub part: Part,
    pub part_index: usize,
    pub class_name: Option<String>,
    /// `source-url` targets of the owning message, in order. Text parts link
    /// their `[n]` citations against these.
    pub sources: Vec<String>,
}

pub fn rows_equal(prev: &PartRow, next: &PartRow) -> bool {
    prev.part_index == next.part_index
        && prev.class_name == next.class_name
        && prev.sources == next.sources
        && parts_equal(&prev.part, &next.part)
}
