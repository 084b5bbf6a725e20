//! Error types for gateway operations.

use thiserror::Error;

/// Errors returned by a [`ChatGateway`](crate::ChatGateway).
#[derive(Debug, Error)]
pub enum BrainError {
    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request could not be delivered (connect failure, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The endpoint answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The endpoint answered but the body was not usable.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Any other failure while producing a completion.
    #[error("processing failed: {0}")]
    ProcessingFailed(String),
}

impl BrainError {
    /// Whether the failure came from the transport rather than the model.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BrainError::Api {
            status: 503,
            message: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "API error (503): overloaded");
    }

    #[test]
    fn test_transient_classification() {
        assert!(BrainError::Network("timeout".into()).is_transient());
        assert!(BrainError::Api {
            status: 429,
            message: String::new()
        }
        .is_transient());
        assert!(!BrainError::Api {
            status: 400,
            message: String::new()
        }
        .is_transient());
        assert!(!BrainError::InvalidResponse("no choices".into()).is_transient());
    }
}
