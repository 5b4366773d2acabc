//! Error types for lake-store

use std::path::PathBuf;

/// Result type for lake-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring or talking to the content store
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or malformed connection settings
    #[error("Invalid store configuration: {0}")]
    Config(String),

    /// Configuration file not found at expected path
    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Request could not be sent or its body could not be read
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status
    #[error("Store responded with {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not have the expected shape
    #[error("Unexpected response: {0}")]
    Response(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<Error> for lake_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Json(e) => lake_core::Error::Json(e),
            other => lake_core::Error::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_becomes_transport() {
        let err = Error::Status {
            status: 502,
            body: "bad gateway".to_string(),
        };
        let core: lake_core::Error = err.into();
        assert_eq!(core.kind(), "TransportError");
        assert!(core.to_string().contains("502"));
    }

    #[test]
    fn config_not_found_displays_path() {
        let err = Error::ConfigNotFound {
            path: PathBuf::from("/etc/lake/config.toml"),
        };
        assert!(err.to_string().contains("/etc/lake/config.toml"));
    }
}
