//! Live chart error types

use thiserror::Error;

use crate::store::StoreError;

/// Errors raised while adding readings or driving a chart session
#[derive(Error, Debug)]
pub enum LiveError {
    /// The store rejected the write or the live query
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Reading failed validation before it was written
    #[error("Invalid reading: {0}")]
    InvalidReading(String),
}

/// Result type alias for live chart operations
pub type LiveResult<T> = Result<T, LiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LiveError::InvalidReading("temperature 120 out of range".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid reading: temperature 120 out of range"
        );

        let err: LiveError = StoreError::Closed.into();
        assert_eq!(err.to_string(), "Store error: Store is closed");
    }
}
