//! Error types for conduit-mapping

use crate::cast::CastType;

/// Result type for mapping operations
pub type Result<T> = std::result::Result<T, MappingError>;

/// Errors raised while compiling or applying a mapping
///
/// Absent input fields are never an error on their own; only malformed
/// definitions, non-object input, `required` outputs and failed casts are.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MappingError {
    /// An expression could not be parsed
    #[error("Invalid expression for '{key}': {message}")]
    Parse { key: String, message: String },

    /// The mapping definition itself is malformed
    #[error("Invalid mapping definition: {0}")]
    InvalidDefinition(String),

    /// The input is not a JSON object
    #[error("Mapping input must be a JSON object, got {found}")]
    InvalidInput { found: &'static str },

    /// A required output resolved from absent data
    #[error("Required field '{key}' resolved to no value")]
    MissingRequired { key: String },

    /// An output value could not be cast to the declared type
    #[error("Cannot cast '{key}' to {target}: {message}")]
    Cast {
        key: String,
        target: CastType,
        message: String,
    },
}
