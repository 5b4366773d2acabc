//! Error types for lake-core

/// Result type for lake-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving identifiers, building actions or
/// talking to the content store
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed document or release identifier
    #[error("Invalid identifier '{id}': {reason}")]
    InvalidIdentifier { id: String, reason: String },

    /// Request that cannot be carried out as asked, such as versioning a version
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Missing or contradictory fields
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Date input that could not be resolved to a timestamp
    #[error("Could not parse date '{input}'")]
    DateParse { input: String },

    /// The store declined the submitted transaction
    #[error("Action rejected by content store: {description}")]
    ActionRejected { description: String },

    /// Network or protocol failure reaching the store
    #[error("Transport error: {0}")]
    Transport(String),

    /// Referenced document or release does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_id(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidIdentifier {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidIdentifier { .. } => "InvalidIdentifier",
            Error::InvalidOperation(_) => "InvalidOperation",
            Error::Validation(_) => "ValidationError",
            Error::DateParse { .. } => "DateParseError",
            Error::ActionRejected { .. } => "ActionRejected",
            Error::Transport(_) => "TransportError",
            Error::NotFound(_) => "NotFound",
            Error::Json(_) => "JsonError",
        }
    }
}
