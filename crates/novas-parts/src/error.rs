/// Failure raised by a part plugin while shaping its part.
///
/// The renderer contains these to the failing part's slot; siblings keep rendering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PluginError {
    /// Tool output did not have the shape the plugin understands.
    #[error("invalid output for {plugin}: {message}")]
    InvalidOutput { plugin: String, message: String },
    /// A field the plugin cannot render without was absent.
    #[error("{plugin} is missing required field `{field}`")]
    MissingField { plugin: String, field: String },
    #[error("{0}")]
    Other(String),
}

impl PluginError {
    pub fn invalid_output(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOutput {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    pub fn missing_field(plugin: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            plugin: plugin.into(),
            field: field.into(),
        }
    }

    /// Human-readable message without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            Self::InvalidOutput { message, .. } => message.clone(),
            Self::MissingField { field, .. } => format!("missing field `{field}`"),
            Self::Other(message) => message.clone(),
        }
    }
}
