//! Domain-level error types for pg-archive-setup.
//!
//! All errors are typed with `thiserror`. Every variant except
//! `UnparsableAnswer` aborts the run when it reaches `main`.

use std::path::PathBuf;
use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// Cannot reach or authenticate to the server.
    #[error("Unable to connect to database: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// The server does not know the requested parameter.
    #[error("PostgreSQL setting not found: {name}")]
    SettingNotFound { name: String },

    /// Reading a parameter failed.
    #[error("Can't get PostgreSQL setting {name}: {message}")]
    Query {
        name: String,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Writing a parameter (or reloading the configuration) failed.
    #[error("Can't set PostgreSQL setting {name} to '{value}': {message}")]
    Apply {
        name: String,
        value: String,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// A directory of the archive layout could not be created.
    #[error("Can not create directory: {}", path.display())]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required executable is not on the search path.
    #[error("Required tool not found: {tool}")]
    ToolUnavailable {
        tool: String,
        #[source]
        source: Option<which::Error>,
    },

    /// An external tool ran but did not succeed.
    #[error("{tool} failed: {status}")]
    ToolFailed { tool: String, status: String },

    /// Confirmation input matched neither an affirmative nor a negative token.
    #[error("Answer can not be parsed: {answer}")]
    UnparsableAnswer { answer: String },

    /// JSON rendering failed.
    #[error("JSON error: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create a connection error from a driver error.
    pub fn connection(err: sqlx::Error) -> Self {
        Self::Connection {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a read error for `name` from a driver error.
    pub fn query(name: impl Into<String>, err: sqlx::Error) -> Self {
        Self::Query {
            name: name.into(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a write error for `name = value` from a driver error.
    pub fn apply(name: impl Into<String>, value: impl Into<String>, err: sqlx::Error) -> Self {
        Self::Apply {
            name: name.into(),
            value: value.into(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a JSON error.
    pub fn json_parse(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_error_names_path() {
        let err = AppError::DirectoryCreate {
            path: PathBuf::from("/srv/archive/wal"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_eq!(err.to_string(), "Can not create directory: /srv/archive/wal");
    }

    #[test]
    fn test_unparsable_answer_message() {
        let err = AppError::UnparsableAnswer {
            answer: "maybe".into(),
        };
        assert_eq!(err.to_string(), "Answer can not be parsed: maybe");
    }
}
