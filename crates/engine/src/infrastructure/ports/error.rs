//! Error types for external and persistence ports.

use thiserror::Error;

/// Failure talking to an LLM provider.
#[derive(Debug, Error, Clone)]
pub enum LlmError {
    /// Transport-level failure (network, HTTP status, connection)
    #[error("LLM request failed: {0}")]
    RequestFailed(String),

    /// The provider answered but the payload was unusable
    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),

    /// The configured deadline elapsed
    #[error("LLM request timed out after {0}s")]
    Timeout(u64),
}

impl LlmError {
    /// Whether a retry could plausibly succeed. Auth and bad-request
    /// failures are final; everything else is treated as transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RequestFailed(msg) => {
                !msg.contains("401") && !msg.contains("403") && !msg.contains("400")
            }
            LlmError::InvalidResponse(_) => true,
            LlmError::Timeout(_) => true,
        }
    }
}

/// Failure inside the persistence gateway.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database error in {context}: {message}")]
    Database { context: String, message: String },

    #[error("Serialization error in {context}: {message}")]
    Serialization { context: String, message: String },

    #[error("Record not found: {entity} {key}")]
    NotFound { entity: &'static str, key: String },
}

impl RepoError {
    pub fn database(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Database {
            context: context.to_string(),
            message: err.to_string(),
        }
    }

    pub fn serialization(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Serialization {
            context: context.to_string(),
            message: err.to_string(),
        }
    }

    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_are_not_retryable() {
        assert!(!LlmError::RequestFailed("401 Unauthorized".into()).is_retryable());
        assert!(LlmError::RequestFailed("connection reset".into()).is_retryable());
        assert!(LlmError::Timeout(120).is_retryable());
    }
}
