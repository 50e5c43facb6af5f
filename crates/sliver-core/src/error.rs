//! Error types for Sliver Core.

use thiserror::Error;

/// Result type alias for Sliver operations.
pub type Result<T> = std::result::Result<T, SliverError>;

/// Main error type for the Sliver framework.
#[derive(Debug, Error)]
pub enum SliverError {
    /// Template parsing failed.
    #[error("Template parse error in '{template}': {message}")]
    TemplateParse { template: String, message: String },

    /// None of the candidate template names could be resolved.
    #[error("No template found among: {}", .0.join(", "))]
    TemplateNotFound(Vec<String>),

    /// Block not defined in the resolved template.
    #[error("Block '{block}' not found in template '{template}'")]
    BlockNotFound { block: String, template: String },

    /// Templates extend each other in a loop.
    #[error("Template inheritance cycle: {}", .0.join(" -> "))]
    ExtendsCycle(Vec<String>),

    /// Template rendering failed.
    #[error("Render error: {0}")]
    Render(String),

    /// Context data could not be converted into a mapping.
    #[error("Context error: {0}")]
    Context(String),

    /// Inbound request could not be interpreted.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Inbound request body exceeded the size limit.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO operation failed.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl SliverError {
    pub(crate) fn parse(template: &str, message: impl Into<String>) -> Self {
        Self::TemplateParse {
            template: template.to_string(),
            message: message.into(),
        }
    }

    /// Whether the error means the requested template or block does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TemplateNotFound(_) | Self::BlockNotFound { .. })
    }
}
