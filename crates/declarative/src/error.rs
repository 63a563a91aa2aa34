//! Error types for the declarative crate

use thiserror::Error;

/// Errors that can occur while building or synthesizing a resource graph
#[derive(Error, Debug)]
pub enum Error {
    /// Two resources were declared with the same logical id
    #[error("duplicate logical id: {0}")]
    DuplicateId(String),

    /// Two outputs were declared with the same name
    #[error("duplicate output: {0}")]
    DuplicateOutput(String),

    /// A property references a logical id that is not declared
    #[error("{from} references undeclared resource {to}")]
    DanglingReference { from: String, to: String },

    /// References form a cycle
    #[error("dependency cycle involving {0}")]
    Cycle(String),

    /// A declaration carries a literal the provider would reject
    #[error("invalid property on {resource}: {message}")]
    InvalidProperty { resource: String, message: String },

    /// Template could not be serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A previously written template could not be read back
    #[error("invalid template: {0}")]
    TemplateParse(String),
}

impl Error {
    /// Shorthand for [`Error::InvalidProperty`]
    pub fn invalid(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidProperty {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Returns true if the error comes from a single declaration rather than the graph shape
    pub fn is_declaration_error(&self) -> bool {
        matches!(self, Error::InvalidProperty { .. })
    }
}

/// Result type for declarative operations
pub type Result<T> = std::result::Result<T, Error>;
