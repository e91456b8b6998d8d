//! Crate-level error type
//!
//! Relationship discovery itself is best-effort and never fails; these errors
//! cover the few operations that report a failure to the caller.

use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by kinship operations
#[derive(Debug, Error)]
pub enum KinshipError {
    /// A relationship category name that is not one of the known sixteen
    #[error("Unknown relationship category: {0}")]
    UnknownCategory(String),

    /// Host store failure on a path that does not degrade
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A block dump could not be decoded
    #[error("Invalid block dump: {0}")]
    Dump(String),
}

/// Specialized Result type for kinship operations
pub type Result<T> = std::result::Result<T, KinshipError>;

impl KinshipError {
    /// Create a dump decoding error
    pub fn dump(msg: impl Into<String>) -> Self {
        Self::Dump(msg.into())
    }
}

impl From<serde_json::Error> for KinshipError {
    fn from(err: serde_json::Error) -> Self {
        Self::Dump(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = KinshipError::UnknownCategory("nope".into());
        assert_eq!(err.to_string(), "Unknown relationship category: nope");

        let err: KinshipError = StoreError::backend("down").into();
        assert!(err.to_string().starts_with("Store error"));

        let err: KinshipError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, KinshipError::Dump(_)));
    }
}
