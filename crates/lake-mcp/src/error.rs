//! Error types for the MCP server

use thiserror::Error;

/// Result type alias for MCP operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during MCP server operations
#[derive(Debug, Error)]
pub enum Error {
    /// Error from document, release or dispatch logic
    #[error(transparent)]
    Core(#[from] lake_core::Error),

    /// Error configuring or constructing the store client
    #[error(transparent)]
    Store(#[from] lake_store::Error),

    /// Error during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unknown tool requested
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Invalid argument provided
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A tool was called before `get_initial_context`
    #[error("initial context not loaded: call get_initial_context before using other tools")]
    ContextNotLoaded,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Machine-readable error kind reported to MCP clients
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Core(e) => e.kind(),
            Error::Store(_) => "StoreError",
            Error::Json(_) => "JsonError",
            Error::UnknownTool(_) => "UnknownTool",
            Error::InvalidArgument(_) => "InvalidArgument",
            Error::ContextNotLoaded => "ContextNotLoaded",
            Error::Io(_) => "IoError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_keep_their_kind() {
        let err = Error::from(lake_core::Error::ActionRejected {
            description: "conflict".to_string(),
        });
        assert_eq!(err.kind(), "ActionRejected");
        assert!(err.to_string().contains("conflict"));
    }

    #[test]
    fn session_gate_has_its_own_kind() {
        assert_eq!(Error::ContextNotLoaded.kind(), "ContextNotLoaded");
        assert_eq!(Error::UnknownTool("x".to_string()).kind(), "UnknownTool");
    }
}
