//! Store Error Types

use thiserror::Error;

/// Errors raised by the host block store or while decoding its answers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid arguments for {op}: {message}")]
    InvalidArguments { op: &'static str, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Create a generic backend error
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        Self::Backend(msg.into())
    }

    /// Create a deserialization error
    pub fn deserialization<S: Into<String>>(msg: S) -> Self {
        Self::Deserialization(msg.into())
    }

    /// Create an invalid-arguments error for `op`
    pub fn invalid_arguments<S: Into<String>>(op: &'static str, msg: S) -> Self {
        Self::InvalidArguments {
            op,
            message: msg.into(),
        }
    }

    /// Check if the error is transient
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            Self::Deserialization(err.to_string())
        } else {
            Self::Serialization(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(StoreError::Unavailable("host busy".into()).is_retryable());
        assert!(!StoreError::invalid_arguments("get-block", "expected an id").is_retryable());
        assert!(!StoreError::backend("boom").is_retryable());
        assert!(!StoreError::deserialization("bad").is_retryable());
    }

    #[test]
    fn test_from_serde_error() {
        let err = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        assert!(matches!(StoreError::from(err), StoreError::Deserialization(_)));
    }
}
