//! Crate-wide error type.
//!
//! The `Display` text of every variant is the message shown to the user, so
//! callers can surface `err.to_string()` directly.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Please upload a face image.")]
    MissingImage,

    #[error("Please enter symptom details.")]
    MissingSymptoms,

    #[error("Please enter your email")]
    MissingEmail,

    #[error("Please enter your password")]
    MissingPassword,

    #[error("Unsupported {field} file '{file_name}': expected {expected}")]
    UnsupportedMedia {
        field: &'static str,
        file_name: String,
        expected: &'static str,
    },

    /// Another run of the same workflow is still pending
    #[error("{0} is already in progress")]
    Busy(&'static str),

    #[error("No results found. Please run an analysis.")]
    NoResults,

    /// The service answered with a non-success status
    #[error("{message}")]
    Request { status: u16, message: String },

    /// No response at all (connection refused, DNS, timeout)
    #[error("{0}")]
    Transport(String),

    #[error("{step} request failed: {message}")]
    Explain { step: &'static str, message: String },

    #[error("{0}")]
    Export(String),

    #[error("Failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Transport(format!("Request timed out: {}", err))
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

impl ClientError {
    /// Validation failures are caught before any network activity.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ClientError::MissingImage
                | ClientError::MissingSymptoms
                | ClientError::MissingEmail
                | ClientError::MissingPassword
                | ClientError::UnsupportedMedia { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert_eq!(ClientError::MissingImage.to_string(), "Please upload a face image.");
        assert_eq!(
            ClientError::MissingSymptoms.to_string(),
            "Please enter symptom details."
        );
        assert!(ClientError::MissingImage.is_validation());
        assert!(!ClientError::Transport("down".into()).is_validation());
    }

    #[test]
    fn test_request_error_shows_body() {
        let err = ClientError::Request {
            status: 422,
            message: "image too small".to_string(),
        };
        assert_eq!(err.to_string(), "image too small");
    }
}
