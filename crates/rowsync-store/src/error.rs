//! Store error types.

use thiserror::Error;

/// Error raised by a [`crate::Store`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated by an insert or update.
    ///
    /// This is the one error kind the reconciliation engine catches
    /// per row; everything else aborts the invocation.
    #[error("constraint violation: {message}")]
    ConstraintViolation { message: String },

    /// The named table does not exist in the backend.
    #[error("table not found: {table}")]
    TableNotFound { table: String },

    /// The backend cannot evaluate the given filter.
    #[error("unsupported filter: {detail}")]
    UnsupportedFilter { detail: String },

    /// The backend configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Any other backend failure.
    #[error("store backend error: {message}")]
    Backend {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StoreError {
    /// Check whether this is a uniqueness-constraint violation.
    #[must_use]
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, StoreError::ConstraintViolation { .. })
    }

    /// Create a constraint-violation error.
    pub fn constraint_violation(message: impl Into<String>) -> Self {
        StoreError::ConstraintViolation {
            message: message.into(),
        }
    }

    /// Create an invalid-configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        StoreError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend {
            message: message.into(),
            source: None,
        }
    }

    /// Create a backend error with source.
    pub fn backend_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        StoreError::Backend {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_violation_is_distinguishable() {
        let err = StoreError::constraint_violation("duplicate key");
        assert!(err.is_constraint_violation());
        assert!(!StoreError::backend("boom").is_constraint_violation());
        assert!(!StoreError::TableNotFound {
            table: "users".to_string()
        }
        .is_constraint_violation());
    }

    #[test]
    fn test_display() {
        let err = StoreError::constraint_violation("duplicate key value");
        assert_eq!(err.to_string(), "constraint violation: duplicate key value");
    }
}
