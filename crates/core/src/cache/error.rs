use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A key argument had a shape the operation cannot use.
    #[error("Invalid key type: {0}")]
    InvalidKeyType(String),
    #[error("Cache connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Store command failed: {0}")]
    StoreCommand(String),
    /// The addressed key (or hash field) does not exist in the store.
    #[error("Key not found: {0}")]
    NotFound(String),
}

impl CacheError {
    /// Returns true if this error reports a missing key.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_key_type_display() {
        let error = CacheError::InvalidKeyType("empty key".to_string());
        assert_eq!(error.to_string(), "Invalid key type: empty key");
    }

    #[test]
    fn test_connection_failed_display() {
        let error = CacheError::ConnectionFailed("timeout".to_string());
        assert_eq!(error.to_string(), "Cache connection failed: timeout");
    }

    #[test]
    fn test_store_command_display() {
        let error = CacheError::StoreCommand("WRONGTYPE".to_string());
        assert_eq!(error.to_string(), "Store command failed: WRONGTYPE");
    }

    #[test]
    fn test_not_found_display() {
        let error = CacheError::NotFound("user:1".to_string());
        assert_eq!(error.to_string(), "Key not found: user:1");
        assert!(error.is_not_found());
        assert!(!CacheError::StoreCommand("x".to_string()).is_not_found());
    }
}
